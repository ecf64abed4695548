use chrono::Utc;
use strata_parse::AiItem;

use crate::enricher::Enrichment;
use crate::orchestrator::PipelineOrchestrator;
use crate::progress::ProgressReporter;
use crate::stage::{EnrichmentOutput, EnrichmentStats, Stage};
use crate::stages::{batches, pace};

impl PipelineOrchestrator {
    /// Attach L2 text batch by batch. Every item leaves with all three L2 fields set.
    pub(crate) async fn enrich(&self, mut items: Vec<AiItem>) -> EnrichmentOutput {
        let size = self.settings.enrichment_batch_size;
        tracing::info!(items = items.len(), batch_size = size, "enrichment stage started");
        let mut progress = ProgressReporter::new(self.progress.as_ref(), Stage::Enrichment, items.len());
        progress.report(0, format!("enriching {} items", items.len()));

        let mut stats = EnrichmentStats {
            items: items.len(),
            ..EnrichmentStats::default()
        };
        for (batch, range) in batches(items.len(), size).enumerate() {
            pace(batch, self.settings.enrichment_delay).await;
            stats.batches += 1;

            let result = self.collaborators.enricher.enrich_batch(&items[range.clone()]).await;
            let slice = &mut items[range.clone()];
            match result {
                Ok(enrichments) => {
                    if enrichments.len() != slice.len() {
                        tracing::warn!(
                            batch,
                            expected = slice.len(),
                            actual = enrichments.len(),
                            "enrichment response length mismatch"
                        );
                    }
                    let mut enrichments = enrichments.into_iter();
                    for item in slice.iter_mut() {
                        let enrichment = enrichments
                            .next()
                            .unwrap_or_else(|| Enrichment::failed("missing from batch response"));
                        apply(item, enrichment);
                    }
                }
                Err(e) => {
                    tracing::warn!(batch, items = slice.len(), "enrichment batch failed: {e}");
                    stats.failed_batches += 1;
                    let sentinel = Enrichment::failed(&e);
                    for item in slice.iter_mut() {
                        fill_missing(item, &sentinel);
                    }
                }
            }
            progress.report(range.end, format!("batch {}", batch + 1));
        }

        stats.degraded_items = items
            .iter()
            .filter(|i| i.l2_desc.as_deref().is_some_and(is_sentinel))
            .count();
        progress.finish(format!("{} items degraded", stats.degraded_items));

        EnrichmentOutput {
            items: Some(items),
            stats,
            timestamp: Utc::now(),
        }
    }
}

fn apply(item: &mut AiItem, enrichment: Enrichment) {
    item.l2_desc = Some(enrichment.description);
    item.l2_summary = Some(enrichment.summary);
    item.l2_tags = Some(enrichment.tags);
}

fn fill_missing(item: &mut AiItem, sentinel: &Enrichment) {
    item.l2_desc.get_or_insert_with(|| sentinel.description.clone());
    item.l2_summary.get_or_insert_with(|| sentinel.summary.clone());
    item.l2_tags.get_or_insert_with(Vec::new);
}

fn is_sentinel(text: &str) -> bool {
    text.starts_with(crate::enricher::ENRICHMENT_FAILED)
}
