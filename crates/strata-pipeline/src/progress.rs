use serde::Serialize;

use crate::stage::Stage;

/// Advisory progress notification. Delivery is best effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub stage: Stage,
    /// 0..=100, never decreasing within one stage run.
    pub percentage: u8,
    pub message: String,
    pub items_processed: usize,
    pub total_items: usize,
}

pub type ProgressTx = tokio::sync::mpsc::UnboundedSender<ProgressEvent>;

pub(crate) struct ProgressReporter {
    tx: Option<ProgressTx>,
    stage: Stage,
    total: usize,
    last: u8,
}

impl ProgressReporter {
    pub(crate) fn new(tx: Option<&ProgressTx>, stage: Stage, total: usize) -> Self {
        Self {
            tx: tx.cloned(),
            stage,
            total,
            last: 0,
        }
    }

    pub(crate) fn report(&mut self, processed: usize, message: impl Into<String>) {
        let percentage = percentage(processed, self.total).max(self.last);
        self.last = percentage;
        if let Some(ref tx) = self.tx {
            let _ = tx.send(ProgressEvent {
                stage: self.stage,
                percentage,
                message: message.into(),
                items_processed: processed.min(self.total),
                total_items: self.total,
            });
        }
    }

    pub(crate) fn finish(&mut self, message: impl Into<String>) {
        self.last = 100;
        if let Some(ref tx) = self.tx {
            let _ = tx.send(ProgressEvent {
                stage: self.stage,
                percentage: 100,
                message: message.into(),
                items_processed: self.total,
                total_items: self.total,
            });
        }
    }
}

fn percentage(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = processed.min(total).saturating_mul(100) / total;
    u8::try_from(pct).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages_are_monotonic_and_capped() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut reporter = ProgressReporter::new(Some(&tx), Stage::Enrichment, 4);
        reporter.report(0, "start");
        reporter.report(3, "three");
        reporter.report(1, "late");
        reporter.report(10, "overshoot");
        reporter.finish("done");

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push((event.percentage, event.items_processed));
        }
        assert_eq!(seen, [(0, 0), (75, 3), (75, 1), (100, 4), (100, 4)]);
    }

    #[test]
    fn empty_stage_starts_at_zero() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 0), 0);
        assert_eq!(percentage(1, 3), 33);
    }

    #[test]
    fn closed_receiver_is_ignored() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let mut reporter = ProgressReporter::new(Some(&tx), Stage::Parsing, 1);
        reporter.report(1, "no listener");
        reporter.finish("still fine");
    }
}
