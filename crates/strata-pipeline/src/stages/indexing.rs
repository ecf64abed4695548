use chrono::Utc;

use crate::error::{PipelineError, Result};
use crate::index::{IndexEntry, entries_path};
use crate::orchestrator::PipelineOrchestrator;
use crate::progress::ProgressReporter;
use crate::stage::{IndexingOutput, IndexingStats, Stage, StageOutput, StageResults};
use crate::stages::batches;

impl PipelineOrchestrator {
    /// Load every vector into the index with contiguous ordinals, persist it,
    /// and write the ordinal side-table next to it.
    pub(crate) async fn build_index(&self, results: &StageResults) -> Result<IndexingOutput> {
        const STAGE: Stage = Stage::Indexing;
        let items = results.items(STAGE, Stage::Vectorization)?;
        let Some(StageOutput::Vectorization(vectorization)) = results.get(Stage::Vectorization) else {
            return Err(PipelineError::MissingPrerequisite {
                stage: STAGE,
                requires: Stage::Vectorization,
                field: "dimension",
            });
        };
        let dimension = vectorization.dimension;

        for item in items {
            match &item.vector {
                None => {
                    return Err(PipelineError::InvalidPrerequisite {
                        stage: STAGE,
                        reason: format!("item {} has no vector", item.id),
                    });
                }
                Some(v) if v.len() != dimension => {
                    return Err(PipelineError::InvalidPrerequisite {
                        stage: STAGE,
                        reason: format!(
                            "item {} has a vector of dimension {}, expected {dimension}",
                            item.id,
                            v.len()
                        ),
                    });
                }
                Some(_) => {}
            }
        }

        let size = self.settings.index_batch_size;
        tracing::info!(vectors = items.len(), batch_size = size, dimension, "indexing stage started");
        let mut progress = ProgressReporter::new(self.progress.as_ref(), STAGE, items.len());
        progress.report(0, format!("indexing {} vectors", items.len()));

        let index = &self.collaborators.index;
        let fail = PipelineError::collaborator;
        index.initialize(dimension).await.map_err(fail(STAGE))?;

        let mut stats = IndexingStats::default();
        for range in batches(items.len(), size) {
            let vectors: Vec<Vec<f32>> = items[range.clone()]
                .iter()
                .filter_map(|item| item.vector.clone())
                .collect();
            index.add_vectors(&vectors, range.start).await.map_err(fail(STAGE))?;
            stats.batches += 1;
            stats.vectors += vectors.len();
            progress.report(range.end, format!("added {} vectors", range.end));
        }
        index.optimize().await.map_err(fail(STAGE))?;
        let index_path = index.save().await.map_err(fail(STAGE))?;

        let entries: Vec<IndexEntry> = items
            .iter()
            .enumerate()
            .map(|(ordinal, item)| IndexEntry::new(ordinal, item))
            .collect();
        let entries_path = entries_path(&index_path);
        let body = serde_json::to_vec_pretty(&entries)
            .map_err(|e| fail(STAGE)(e.into()))?;
        tokio::fs::write(&entries_path, body)
            .await
            .map_err(|source| PipelineError::Write {
                path: entries_path.clone(),
                source,
            })?;
        tracing::info!(index = %index_path.display(), entries = %entries_path.display(), "index saved");
        progress.finish(format!("saved {}", index_path.display()));

        Ok(IndexingOutput {
            index_path,
            entries_path,
            entries,
            stats,
            timestamp: Utc::now(),
        })
    }
}
