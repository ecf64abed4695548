use chrono::Utc;
use strata_parse::AiItem;

use crate::error::{PipelineError, Result};
use crate::orchestrator::PipelineOrchestrator;
use crate::progress::ProgressReporter;
use crate::stage::{Stage, StageResults, VectorizationOutput, VectorizationStats};
use crate::stages::{batches, pace};

impl PipelineOrchestrator {
    /// Embed every item. Failed or malformed batches get zero vectors so the
    /// vector count always equals the item count.
    pub(crate) async fn vectorize(&self, results: &mut StageResults) -> Result<VectorizationOutput> {
        const STAGE: Stage = Stage::Vectorization;
        results.items(STAGE, Stage::Enrichment)?;
        let dimension = self
            .collaborators
            .vectorizer
            .initialize()
            .await
            .map_err(PipelineError::collaborator(STAGE))?;
        let mut items = results.take_items(STAGE, Stage::Enrichment)?;

        let size = self.settings.vectorization_batch_size;
        tracing::info!(items = items.len(), batch_size = size, dimension, "vectorization stage started");
        let mut progress = ProgressReporter::new(self.progress.as_ref(), STAGE, items.len());
        progress.report(0, format!("embedding {} items", items.len()));

        let texts: Vec<String> = items.iter().map(embedding_text).collect();
        let mut stats = VectorizationStats {
            items: items.len(),
            dimension,
            ..VectorizationStats::default()
        };
        for (batch, range) in batches(items.len(), size).enumerate() {
            pace(batch, self.settings.vectorization_delay).await;
            stats.batches += 1;

            let expected = range.len();
            let vectors = match self
                .collaborators
                .vectorizer
                .create_embeddings(&texts[range.clone()])
                .await
            {
                Ok(vectors)
                    if vectors.len() == expected && vectors.iter().all(|v| v.len() == dimension) =>
                {
                    Some(vectors)
                }
                Ok(vectors) => {
                    tracing::warn!(
                        batch,
                        expected,
                        actual = vectors.len(),
                        dimension,
                        "embedding batch has the wrong shape, using zero vectors"
                    );
                    None
                }
                Err(e) => {
                    tracing::warn!(batch, items = expected, "embedding batch failed, using zero vectors: {e}");
                    None
                }
            };
            let vectors = vectors.unwrap_or_else(|| {
                stats.failed_batches += 1;
                stats.zero_vectors += expected;
                vec![vec![0.0; dimension]; expected]
            });
            for (item, vector) in items[range.clone()].iter_mut().zip(vectors) {
                item.vector = Some(vector);
            }
            progress.report(range.end, format!("batch {}", batch + 1));
        }
        progress.finish(format!("{} zero vectors", stats.zero_vectors));

        Ok(VectorizationOutput {
            items: Some(items),
            dimension,
            stats,
            timestamp: Utc::now(),
        })
    }
}

/// `id`, description and code joined by newlines, trimmed.
pub(crate) fn embedding_text(item: &AiItem) -> String {
    let text = format!(
        "{}\n{}\n{}",
        item.id,
        item.l2_desc.as_deref().unwrap_or_default(),
        item.l0_code
    );
    text.trim().to_owned()
}
