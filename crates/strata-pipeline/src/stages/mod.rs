//! Stage bodies, one `impl PipelineOrchestrator` block per stage.

mod dependencies;
mod enrichment;
mod indexing;
mod parsing;
mod vectorization;

use std::ops::Range;
use std::time::Duration;

/// Contiguous `size`-wide ranges covering `0..len`; the last may be shorter.
pub(crate) fn batches(len: usize, size: usize) -> impl Iterator<Item = Range<usize>> {
    let size = size.max(1);
    (0..len)
        .step_by(size)
        .map(move |start| start..(start + size).min(len))
}

/// Sleep before every batch except the first.
pub(crate) async fn pace(batch: usize, delay: Duration) {
    if batch > 0 && !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_cover_the_range() {
        let ranges: Vec<_> = batches(23, 10).collect();
        assert_eq!(ranges, [0..10, 10..20, 20..23]);
        assert_eq!(batches(0, 10).count(), 0);
        assert_eq!(batches(3, 0).count(), 3);
    }
}
