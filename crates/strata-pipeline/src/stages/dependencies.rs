use chrono::Utc;
use strata_parse::AiItem;

use crate::orchestrator::PipelineOrchestrator;
use crate::progress::ProgressReporter;
use crate::stage::{DependenciesOutput, DependencyStats, Stage};

impl PipelineOrchestrator {
    /// Fill every item's L1 layer, then build the graph over the whole set.
    pub(crate) fn link(&self, mut items: Vec<AiItem>) -> DependenciesOutput {
        tracing::info!(items = items.len(), "dependency stage started");
        let analyzer = &self.collaborators.analyzer;
        let mut progress = ProgressReporter::new(self.progress.as_ref(), Stage::Dependencies, items.len());
        progress.report(0, format!("analyzing {} items", items.len()));

        analyzer.prepare(&items);
        let mut stats = DependencyStats {
            items: items.len(),
            ..DependencyStats::default()
        };
        let mut resolved = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let deps = analyzer.analyze_dependencies(item, &items).unwrap_or_else(|e| {
                tracing::warn!(item = %item.id, "dependency analysis failed: {e}");
                stats.failures += 1;
                Vec::new()
            });
            resolved.push(deps);
            progress.report(i + 1, item.id.as_str());
        }
        for (item, deps) in items.iter_mut().zip(resolved) {
            item.l1_deps = deps;
        }
        stats.items_with_deps = items.iter().filter(|i| !i.l1_deps.is_empty()).count();

        let graph = analyzer.build_dependency_graph(&items);
        stats.edges = graph.edge_count();
        progress.finish(format!("{} edges", stats.edges));

        DependenciesOutput {
            items: Some(items),
            graph,
            stats,
            timestamp: Utc::now(),
        }
    }
}
