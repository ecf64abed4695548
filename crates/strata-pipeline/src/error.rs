use strata_llm::LlmError;

use crate::discovery::DiscoveryError;
use crate::stage::Stage;

/// Failure of a pluggable collaborator (analyzer, enricher, vectorizer, index).
///
/// Per-item and per-batch occurrences are recovered inside the stage; only
/// initialization and persistence failures surface as [`PipelineError`].
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected {expected} results, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("expected vectors of dimension {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index error: {0}")]
    Index(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("stage '{stage}' requires '{field}' from the '{requires}' stage output")]
    MissingPrerequisite {
        stage: Stage,
        requires: Stage,
        field: &'static str,
    },

    #[error("stage '{stage}' received invalid input: {reason}")]
    InvalidPrerequisite { stage: Stage, reason: String },

    #[error("stage '{stage}' collaborator failed: {source}")]
    Collaborator {
        stage: Stage,
        #[source]
        source: CollaboratorError,
    },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn collaborator(stage: Stage) -> impl FnOnce(CollaboratorError) -> Self {
        move |source| Self::Collaborator { stage, source }
    }

    /// Stage the error was raised in, if it is stage-scoped.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::MissingPrerequisite { stage, .. }
            | Self::InvalidPrerequisite { stage, .. }
            | Self::Collaborator { stage, .. } => Some(*stage),
            Self::Discovery(_) => Some(Stage::Parsing),
            Self::Write { .. } => Some(Stage::Indexing),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
