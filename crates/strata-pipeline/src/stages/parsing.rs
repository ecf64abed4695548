use chrono::Utc;
use strata_parse::relative_path;

use crate::error::Result;
use crate::orchestrator::PipelineOrchestrator;
use crate::progress::ProgressReporter;
use crate::stage::{ParsingOutput, ParsingStats, Stage};

impl PipelineOrchestrator {
    /// Discover and parse files one at a time. Unreadable or unsupported files
    /// are logged and skipped.
    pub(crate) fn parse(&self) -> Result<ParsingOutput> {
        let root = self.discovery.canonical_root()?;
        let files = self.discovery.resolve()?;
        tracing::info!(root = %root.display(), files = files.len(), "parsing stage started");

        let mut progress = ProgressReporter::new(self.progress.as_ref(), Stage::Parsing, files.len());
        progress.report(0, format!("parsing {} files", files.len()));

        let mut stats = ParsingStats {
            files_discovered: files.len(),
            ..ParsingStats::default()
        };
        let mut items = Vec::new();
        for (i, path) in files.iter().enumerate() {
            let rel = relative_path(path, &root);
            match self.dispatcher.parse_file(path, &root) {
                Ok(found) => {
                    tracing::debug!(file = %rel, items = found.len(), "parsed file");
                    stats.files_parsed += 1;
                    items.extend(found);
                }
                Err(e) => {
                    tracing::warn!(file = %rel, "skipping file: {e}");
                    stats.files_failed += 1;
                }
            }
            progress.report(i + 1, rel);
        }
        stats.items_extracted = items.len();
        progress.finish(format!("extracted {} items", items.len()));

        Ok(ParsingOutput {
            items: Some(items),
            files,
            stats,
            timestamp: Utc::now(),
        })
    }
}
