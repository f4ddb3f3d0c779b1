//! One-shot historical backfill.

use crate::{BlockReconciler, ChainClient, ChainClientError, IndexerConfig, Metrics, WorkerPool};
use ethscan_storage::IndexerStorage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info, warn};

/// Result of a [`BackfillScanner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillSummary {
    /// First number visited.
    pub start: u64,
    /// Head observed when the scan began.
    pub head: u64,
    /// Number of reconciles dispatched.
    pub dispatched: u64,
    /// Numbers whose reconcile failed, in ascending order.
    pub failed: Vec<u64>,
    /// Whether the scan stopped early on cancellation.
    pub cancelled: bool,
}

/// Reconciles every block from the configured start to the startup head.
#[derive(Debug)]
pub struct BackfillScanner<C, S> {
    chain: Arc<C>,
    reconciler: Arc<BlockReconciler<C, S>>,
    config: IndexerConfig,
    cancellation: CancellationToken,
    tasks: TaskTracker,
}

impl<C, S> BackfillScanner<C, S>
where
    C: ChainClient,
    S: IndexerStorage,
{
    /// Creates a scanner dispatching through `reconciler`.
    pub fn new(
        chain: Arc<C>,
        reconciler: Arc<BlockReconciler<C, S>>,
        config: IndexerConfig,
        cancellation: CancellationToken,
    ) -> Self {
        Self { chain, reconciler, config, cancellation, tasks: TaskTracker::new() }
    }

    /// Returns the tracker of dispatched reconciles.
    ///
    /// A cancelled run returns without waiting for them.
    pub const fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }

    /// Runs the backfill once.
    ///
    /// The head is read once; blocks at least `confirmations` below it are
    /// written as stable. At most `scan_workers` reconciles run at a time and
    /// the loop waits while all are busy. Failures are not retried; they are
    /// reported in [`BackfillSummary::failed`].
    pub async fn run(&self) -> Result<BackfillSummary, ChainClientError> {
        let head = self.chain.head_of_chain().await?.number;
        let start = self.config.start_block;
        info!(target: "backfill", start, head, workers = self.config.scan_workers, "Starting backfill");

        let pool = WorkerPool::with_tracker(self.config.scan_workers.max(1), self.tasks.clone());
        let (failed_tx, mut failed_rx) = mpsc::unbounded_channel();
        let mut dispatched = 0;
        let mut cancelled = false;

        for number in start..=head {
            let stable = self.config.is_stable(number, head);
            let reconciler = self.reconciler.clone();
            let failed_tx = failed_tx.clone();
            let task = async move {
                if let Err(err) = reconciler.save_block(number, stable).await {
                    Metrics::record_block_error(Metrics::PATH_BACKFILL);
                    error!(target: "backfill", block_number = number, %err, "Failed to save block");
                    let _ = failed_tx.send(number);
                }
            };

            tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => {
                    cancelled = true;
                    break;
                }
                admitted = pool.spawn(task) => {
                    if admitted.is_none() {
                        break;
                    }
                    dispatched += 1;
                }
            }
        }
        drop(failed_tx);

        if cancelled {
            warn!(target: "backfill", dispatched, "Backfill cancelled before reaching head");
        } else {
            pool.wait().await;
        }

        let mut failed = Vec::new();
        while let Ok(number) = failed_rx.try_recv() {
            failed.push(number);
        }
        failed.sort_unstable();

        info!(
            target: "backfill",
            start,
            head,
            dispatched,
            failed = failed.len(),
            "Backfill finished"
        );
        Ok(BackfillSummary { start, head, dispatched, failed, cancelled })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestChainClient;
    use ethscan_storage::{BlockStorageReader, InMemoryStore};
    use std::time::Duration;

    fn config(start_block: u64, confirmations: u64, scan_workers: usize) -> IndexerConfig {
        IndexerConfig {
            start_block,
            confirmations,
            scan_workers,
            tx_workers: 2,
            max_gap_fill: IndexerConfig::DEFAULT_MAX_GAP_FILL,
        }
    }

    fn scanner(
        chain: &TestChainClient,
        store: &InMemoryStore,
        config: IndexerConfig,
    ) -> BackfillScanner<TestChainClient, InMemoryStore> {
        let chain = Arc::new(chain.clone());
        let reconciler =
            Arc::new(BlockReconciler::new(chain.clone(), Arc::new(store.clone()), &config));
        BackfillScanner::new(chain, reconciler, config, CancellationToken::new())
    }

    #[tokio::test]
    async fn test_stability_split() {
        let chain = TestChainClient::with_blocks(0..=105);
        let store = InMemoryStore::new();

        let summary = scanner(&chain, &store, config(100, 2, 3)).run().await.unwrap();

        assert_eq!(summary.head, 105);
        assert_eq!(summary.dispatched, 6);
        assert!(summary.failed.is_empty());
        let flags: Vec<(u64, bool)> = store.blocks().iter().map(|b| (b.number, b.stable)).collect();
        assert_eq!(
            flags,
            vec![(100, true), (101, true), (102, true), (103, true), (104, false), (105, false)]
        );
    }

    #[tokio::test]
    async fn test_covers_whole_range() {
        let chain = TestChainClient::with_blocks(0..=40);
        let store = InMemoryStore::new();

        let summary = scanner(&chain, &store, config(11, 5, 4)).run().await.unwrap();

        assert_eq!(summary.dispatched, 40 - 11 + 1);
        assert_eq!(store.blocks().len(), 30);
        assert!((11..=40).all(|n| chain.fetch_count(n) == 1));
        assert_eq!(chain.fetch_count(10), 0);
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_workers() {
        let chain = TestChainClient::with_blocks(0..=30);
        chain.set_fetch_delay(Duration::from_millis(10));
        let store = InMemoryStore::new();

        scanner(&chain, &store, config(0, 3, 3)).run().await.unwrap();

        assert!(chain.peak_in_flight() <= 3);
        assert!(chain.peak_in_flight() >= 2);
        assert_eq!(store.blocks().len(), 31);
    }

    #[tokio::test]
    async fn test_start_beyond_head_dispatches_nothing() {
        let chain = TestChainClient::with_blocks(0..=5);
        let store = InMemoryStore::new();

        let summary = scanner(&chain, &store, config(10, 2, 2)).run().await.unwrap();

        assert_eq!(summary.dispatched, 0);
        assert!(store.blocks().is_empty());
    }

    #[tokio::test]
    async fn test_failures_collected() {
        let chain = TestChainClient::with_blocks(0..=9);
        chain.fail_block(3);
        chain.fail_block(7);
        let store = InMemoryStore::new();

        let summary = scanner(&chain, &store, config(0, 1, 2)).run().await.unwrap();

        assert_eq!(summary.failed, vec![3, 7]);
        assert_eq!(summary.dispatched, 10);
        assert!(store.block_by_number(3).await.unwrap().is_none());
        assert_eq!(store.blocks().len(), 8);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let chain = TestChainClient::with_blocks(0..=9);
        let store = InMemoryStore::new();
        let scanner = scanner(&chain, &store, config(0, 1, 2));
        scanner.cancellation.cancel();

        let summary = scanner.run().await.unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.dispatched, 0);
    }
}
