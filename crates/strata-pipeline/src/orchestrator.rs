//! Sequencing of the five pipeline stages over one shared results mapping.

use std::time::Duration;

use strata_llm::LlmProvider;
use strata_parse::{ParserDispatcher, ParserOptions};

use crate::analyzer::{DependencyAnalyzer, SymbolAnalyzer};
use crate::config::Config;
use crate::discovery::FileDiscovery;
use crate::enricher::{LlmEnricher, SemanticEnricher};
use crate::error::Result;
use crate::index::{FlatIndexBuilder, IndexBuilder};
use crate::progress::ProgressTx;
use crate::stage::{Stage, StageOutput, StageResults};
use crate::vectorizer::{LlmVectorizer, Vectorizer};

/// Batch sizes and inter-batch delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSettings {
    pub enrichment_batch_size: usize,
    pub enrichment_delay: Duration,
    pub vectorization_batch_size: usize,
    pub vectorization_delay: Duration,
    pub index_batch_size: usize,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            enrichment_batch_size: 5,
            enrichment_delay: Duration::from_millis(1000),
            vectorization_batch_size: 10,
            vectorization_delay: Duration::ZERO,
            index_batch_size: 100,
        }
    }
}

impl From<&Config> for StageSettings {
    fn from(config: &Config) -> Self {
        Self {
            enrichment_batch_size: config.enrichment.batch_size,
            enrichment_delay: Duration::from_millis(config.enrichment.delay_ms),
            vectorization_batch_size: config.vectorization.batch_size,
            vectorization_delay: Duration::from_millis(config.vectorization.delay_ms),
            index_batch_size: config.index.batch_size,
        }
    }
}

/// The pluggable services the stages delegate to.
pub struct Collaborators {
    pub analyzer: Box<dyn DependencyAnalyzer>,
    pub enricher: Box<dyn SemanticEnricher>,
    pub vectorizer: Box<dyn Vectorizer>,
    pub index: Box<dyn IndexBuilder>,
}

impl Collaborators {
    /// Default collaborators: symbol analysis plus LLM enrichment and
    /// embeddings from `provider`, saved to the configured flat index.
    #[must_use]
    pub fn from_config<P>(config: &Config, provider: P) -> Self
    where
        P: LlmProvider + Clone + 'static,
    {
        Self {
            analyzer: Box::new(SymbolAnalyzer::new()),
            enricher: Box::new(LlmEnricher::new(
                provider.clone(),
                config.enrichment.max_code_chars,
            )),
            vectorizer: Box::new(LlmVectorizer::new(provider, config.vectorization.dimension)),
            index: Box::new(FlatIndexBuilder::new(config.index_path())),
        }
    }
}

pub struct PipelineOrchestrator {
    pub(crate) discovery: FileDiscovery,
    pub(crate) dispatcher: ParserDispatcher,
    pub(crate) collaborators: Collaborators,
    pub(crate) settings: StageSettings,
    pub(crate) progress: Option<ProgressTx>,
}

impl PipelineOrchestrator {
    #[must_use]
    pub fn new(
        discovery: FileDiscovery,
        dispatcher: ParserDispatcher,
        collaborators: Collaborators,
        settings: StageSettings,
    ) -> Self {
        Self {
            discovery,
            dispatcher,
            collaborators,
            settings,
            progress: None,
        }
    }

    /// Orchestrator wired entirely from `config`.
    #[must_use]
    pub fn from_config<P>(config: &Config, provider: P) -> Self
    where
        P: LlmProvider + Clone + 'static,
    {
        let discovery = FileDiscovery::new(&config.project.root)
            .with_files(config.project.files.iter().cloned())
            .with_exclude(config.project.exclude.iter().cloned())
            .with_patterns(config.project.include.clone())
            .with_ignores(config.project.ignore.clone());
        let dispatcher = ParserDispatcher::new(ParserOptions {
            ast: config.parsing.ast,
        });
        Self::new(
            discovery,
            dispatcher,
            Collaborators::from_config(config, provider),
            StageSettings::from(config),
        )
    }

    #[must_use]
    pub fn with_progress(mut self, tx: ProgressTx) -> Self {
        self.progress = Some(tx);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &StageSettings {
        &self.settings
    }

    /// Run one stage against `results` and store its output there.
    ///
    /// # Errors
    ///
    /// Returns a stage-named [`PipelineError`](crate::PipelineError) when a
    /// prerequisite output is missing or invalid, or when a collaborator
    /// needed by the whole stage fails. Per-file, per-item and per-batch
    /// failures are recovered.
    pub async fn run_stage(&self, stage: Stage, results: &mut StageResults) -> Result<()> {
        let output = match stage {
            Stage::Parsing => StageOutput::Parsing(self.parse()?),
            Stage::Dependencies => {
                let items = results.take_items(stage, Stage::Parsing)?;
                StageOutput::Dependencies(self.link(items))
            }
            Stage::Enrichment => {
                let items = results.take_items(stage, Stage::Dependencies)?;
                StageOutput::Enrichment(self.enrich(items).await)
            }
            Stage::Vectorization => StageOutput::Vectorization(self.vectorize(results).await?),
            Stage::Indexing => StageOutput::Indexing(self.build_index(results).await?),
        };
        tracing::info!(stage = %stage, stats = %output.stats_json(), "stage finished");
        results.insert(output);
        Ok(())
    }

    /// Run every stage in order.
    ///
    /// # Errors
    ///
    /// Returns the first stage error; later stages do not run.
    pub async fn run(&self) -> Result<StageResults> {
        let mut results = StageResults::new();
        for stage in Stage::ALL {
            self.run_stage(stage, &mut results).await?;
        }
        Ok(results)
    }
}
