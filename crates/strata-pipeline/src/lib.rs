//! Staged semantic indexing: parse, link, enrich, embed and index the
//! constructs of a polyglot repository.
//!
//! [`PipelineOrchestrator`] runs five stages over a [`StageResults`] mapping.
//! Each stage moves the item collection out of its predecessor's output,
//! adds one layer, and isolates per-file, per-item and per-batch failures.

pub mod analyzer;
pub mod config;
pub mod discovery;
pub mod enricher;
pub mod error;
pub mod index;
pub mod orchestrator;
pub mod progress;
pub mod stage;
mod stages;
pub mod vectorizer;

use std::future::Future;
use std::pin::Pin;

pub use analyzer::{DependencyAnalyzer, DependencyGraph, SymbolAnalyzer};
pub use config::Config;
pub use discovery::FileDiscovery;
pub use enricher::{Enrichment, LlmEnricher, SemanticEnricher};
pub use error::{CollaboratorError, PipelineError, Result};
pub use index::{FlatIndex, FlatIndexBuilder, IndexBuilder, IndexEntry};
pub use orchestrator::{Collaborators, PipelineOrchestrator, StageSettings};
pub use progress::{ProgressEvent, ProgressTx};
pub use stage::{Stage, StageOutput, StageResults};
pub use vectorizer::{LlmVectorizer, Vectorizer};

/// Boxed future returned by the dyn-compatible collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
