//! Stage identities and the typed outputs threaded between them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_parse::AiItem;

use crate::analyzer::DependencyGraph;
use crate::error::PipelineError;
use crate::index::IndexEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Parsing,
    Dependencies,
    Enrichment,
    Vectorization,
    Indexing,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Self; 5] = [
        Self::Parsing,
        Self::Dependencies,
        Self::Enrichment,
        Self::Vectorization,
        Self::Indexing,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parsing => "parsing",
            Self::Dependencies => "dependencies",
            Self::Enrichment => "enrichment",
            Self::Vectorization => "vectorization",
            Self::Indexing => "indexing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsingStats {
    pub files_discovered: usize,
    pub files_parsed: usize,
    pub files_failed: usize,
    pub items_extracted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyStats {
    pub items: usize,
    pub items_with_deps: usize,
    pub edges: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentStats {
    pub items: usize,
    pub batches: usize,
    pub failed_batches: usize,
    /// Items that ended up with sentinel text.
    pub degraded_items: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorizationStats {
    pub items: usize,
    pub dimension: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub zero_vectors: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingStats {
    pub vectors: usize,
    pub batches: usize,
}

#[derive(Debug, Clone)]
pub struct ParsingOutput {
    pub items: Option<Vec<AiItem>>,
    pub files: Vec<PathBuf>,
    pub stats: ParsingStats,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DependenciesOutput {
    pub items: Option<Vec<AiItem>>,
    pub graph: DependencyGraph,
    pub stats: DependencyStats,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct EnrichmentOutput {
    pub items: Option<Vec<AiItem>>,
    pub stats: EnrichmentStats,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VectorizationOutput {
    pub items: Option<Vec<AiItem>>,
    pub dimension: usize,
    pub stats: VectorizationStats,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct IndexingOutput {
    pub index_path: PathBuf,
    pub entries_path: PathBuf,
    pub entries: Vec<IndexEntry>,
    pub stats: IndexingStats,
    pub timestamp: DateTime<Utc>,
}

/// Output of one stage, as stored in [`StageResults`].
#[derive(Debug, Clone)]
pub enum StageOutput {
    Parsing(ParsingOutput),
    Dependencies(DependenciesOutput),
    Enrichment(EnrichmentOutput),
    Vectorization(VectorizationOutput),
    Indexing(IndexingOutput),
}

impl StageOutput {
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Parsing(_) => Stage::Parsing,
            Self::Dependencies(_) => Stage::Dependencies,
            Self::Enrichment(_) => Stage::Enrichment,
            Self::Vectorization(_) => Stage::Vectorization,
            Self::Indexing(_) => Stage::Indexing,
        }
    }

    /// Items still held by this output. `None` once moved on, and always for indexing.
    #[must_use]
    pub fn items(&self) -> Option<&[AiItem]> {
        match self {
            Self::Parsing(o) => o.items.as_deref(),
            Self::Dependencies(o) => o.items.as_deref(),
            Self::Enrichment(o) => o.items.as_deref(),
            Self::Vectorization(o) => o.items.as_deref(),
            Self::Indexing(_) => None,
        }
    }

    fn items_slot(&mut self) -> Option<&mut Option<Vec<AiItem>>> {
        match self {
            Self::Parsing(o) => Some(&mut o.items),
            Self::Dependencies(o) => Some(&mut o.items),
            Self::Enrichment(o) => Some(&mut o.items),
            Self::Vectorization(o) => Some(&mut o.items),
            Self::Indexing(_) => None,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Parsing(o) => o.timestamp,
            Self::Dependencies(o) => o.timestamp,
            Self::Enrichment(o) => o.timestamp,
            Self::Vectorization(o) => o.timestamp,
            Self::Indexing(o) => o.timestamp,
        }
    }

    /// Stage statistics as a JSON object, for logging and the CLI.
    #[must_use]
    pub fn stats_json(&self) -> serde_json::Value {
        let value = match self {
            Self::Parsing(o) => serde_json::to_value(o.stats),
            Self::Dependencies(o) => serde_json::to_value(o.stats),
            Self::Enrichment(o) => serde_json::to_value(o.stats),
            Self::Vectorization(o) => serde_json::to_value(o.stats),
            Self::Indexing(o) => serde_json::to_value(o.stats),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

/// Stage name to stage output, filled in as the pipeline advances.
#[derive(Debug, Clone, Default)]
pub struct StageResults {
    outputs: BTreeMap<Stage, StageOutput>,
}

impl StageResults {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `output` under its stage, replacing a previous run of that stage.
    pub fn insert(&mut self, output: StageOutput) {
        self.outputs.insert(output.stage(), output);
    }

    #[must_use]
    pub fn get(&self, stage: Stage) -> Option<&StageOutput> {
        self.outputs.get(&stage)
    }

    #[must_use]
    pub fn contains(&self, stage: Stage) -> bool {
        self.outputs.contains_key(&stage)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, &StageOutput)> {
        self.outputs.iter().map(|(stage, output)| (*stage, output))
    }

    /// Move the item collection out of the `from` output for use by `stage`.
    ///
    /// The rest of the `from` output (graph, stats, timestamp) stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingPrerequisite`] if `from` has not run or
    /// no longer holds its items.
    pub fn take_items(&mut self, stage: Stage, from: Stage) -> Result<Vec<AiItem>, PipelineError> {
        self.outputs
            .get_mut(&from)
            .and_then(StageOutput::items_slot)
            .and_then(Option::take)
            .ok_or(PipelineError::MissingPrerequisite {
                stage,
                requires: from,
                field: "items",
            })
    }

    /// Borrow the item collection of the `from` output for use by `stage`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingPrerequisite`] if `from` has not run or
    /// no longer holds its items.
    pub fn items(&self, stage: Stage, from: Stage) -> Result<&[AiItem], PipelineError> {
        self.get(from)
            .and_then(StageOutput::items)
            .ok_or(PipelineError::MissingPrerequisite {
                stage,
                requires: from,
                field: "items",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsing_output(items: Option<Vec<AiItem>>) -> StageOutput {
        StageOutput::Parsing(ParsingOutput {
            items,
            files: Vec::new(),
            stats: ParsingStats::default(),
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn stage_names_follow_execution_order() {
        let names: Vec<_> = Stage::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            names,
            ["parsing", "dependencies", "enrichment", "vectorization", "indexing"]
        );
        assert!(Stage::ALL.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn take_items_moves_collection_and_keeps_output() {
        let mut results = StageResults::new();
        results.insert(parsing_output(Some(Vec::new())));

        let items = results.take_items(Stage::Dependencies, Stage::Parsing).unwrap();
        assert!(items.is_empty());
        assert!(results.contains(Stage::Parsing));
        assert!(results.get(Stage::Parsing).unwrap().items().is_none());

        let err = results
            .take_items(Stage::Dependencies, Stage::Parsing)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingPrerequisite {
                stage: Stage::Dependencies,
                requires: Stage::Parsing,
                field: "items"
            }
        ));
    }

    #[test]
    fn missing_stage_is_reported() {
        let results = StageResults::new();
        let err = results.items(Stage::Indexing, Stage::Vectorization).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingPrerequisite {
                requires: Stage::Vectorization,
                ..
            }
        ));
    }

    #[test]
    fn insert_replaces_previous_run() {
        let mut results = StageResults::new();
        results.insert(parsing_output(None));
        results.insert(parsing_output(Some(Vec::new())));
        assert_eq!(results.len(), 1);
        assert!(results.items(Stage::Dependencies, Stage::Parsing).is_ok());
    }

    #[test]
    fn stats_serialize_camel_case() {
        let output = StageOutput::Parsing(ParsingOutput {
            items: None,
            files: Vec::new(),
            stats: ParsingStats {
                files_discovered: 3,
                files_parsed: 2,
                files_failed: 1,
                items_extracted: 7,
            },
            timestamp: Utc::now(),
        });
        let stats = output.stats_json();
        assert_eq!(stats["filesDiscovered"], 3);
        assert_eq!(stats["itemsExtracted"], 7);
    }
}
