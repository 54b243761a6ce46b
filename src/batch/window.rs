//! Windowed dispatch
//!
//! Work is cut into fixed-size windows. Everything in a window is in flight at
//! once and the window must fully settle before the next one opens.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::ops::Range;

/// Default number of concurrent requests per window
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// Partition `item_count` items into consecutive windows of at most `window_size`
///
/// A window size of zero is treated as one.
pub fn plan_windows(item_count: usize, window_size: usize) -> Vec<Range<usize>> {
    let size = window_size.max(1);
    (0..item_count)
        .step_by(size)
        .map(|start| start..(start + size).min(item_count))
        .collect()
}

/// Drive all futures concurrently and collect outputs in settle order
pub async fn settle_all<I, F>(futures: I) -> Vec<F::Output>
where
    I: IntoIterator<Item = F>,
    F: Future,
{
    let mut in_flight: FuturesUnordered<F> = futures.into_iter().collect();
    let mut settled = Vec::with_capacity(in_flight.len());
    while let Some(output) = in_flight.next().await {
        settled.push(output);
    }
    settled
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_plan_windows() {
        // Exact multiple
        assert_eq!(plan_windows(6, 2), vec![0..2, 2..4, 4..6]);

        // Remainder
        assert_eq!(plan_windows(5, 2), vec![0..2, 2..4, 4..5]);

        // Window larger than item count
        assert_eq!(plan_windows(3, 10), vec![0..3]);
    }

    #[test]
    fn test_plan_windows_edge_cases() {
        assert!(plan_windows(0, 5).is_empty());
        assert_eq!(plan_windows(1, 5), vec![0..1]);
        assert_eq!(plan_windows(3, 0), vec![0..1, 1..2, 2..3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_all_returns_in_completion_order() {
        let delays = [30u64, 10, 20];
        let futures = delays.iter().enumerate().map(|(i, ms)| async move {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            i
        });

        let started = tokio::time::Instant::now();
        let order = settle_all(futures).await;

        assert_eq!(order, vec![1, 2, 0]);
        // Concurrent: total time is the slowest, not the sum
        assert!(started.elapsed() < Duration::from_millis(60));
    }
}
