//! Live head following.

use crate::{
    BlockReconciler, ChainClient, HeadStream, HeadSubscriber, IndexerConfig, Metrics,
};
use backon::{ExponentialBuilder, Retryable};
use ethscan_storage::IndexerStorage;
use futures::StreamExt;
use std::{sync::Arc, time::Duration};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info, warn};

/// Follows new heads and reconciles each one as it arrives.
///
/// For every head `h` two independent tasks are spawned: an unstable save of
/// `h` and a promotion of `h - confirmations`. Heads skipped since the last one
/// seen are handled the same way, up to `max_gap_fill` of them.
#[derive(Debug)]
pub struct LiveSubscriber<H, C, S> {
    subscriber: Arc<H>,
    reconciler: Arc<BlockReconciler<C, S>>,
    config: IndexerConfig,
    cancellation: CancellationToken,
    tasks: TaskTracker,
    backoff: ExponentialBuilder,
}

impl<H, C, S> LiveSubscriber<H, C, S>
where
    H: HeadSubscriber,
    C: ChainClient,
    S: IndexerStorage,
{
    /// Creates a subscriber dispatching through `reconciler`.
    pub fn new(
        subscriber: Arc<H>,
        reconciler: Arc<BlockReconciler<C, S>>,
        config: IndexerConfig,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            subscriber,
            reconciler,
            config,
            cancellation,
            tasks: TaskTracker::new(),
            backoff: ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(500))
                .with_max_delay(Duration::from_secs(30))
                .without_max_times(),
        }
    }

    /// Replaces the reconnect backoff policy.
    pub const fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns the tracker of spawned reconcile and promotion tasks.
    pub const fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }

    /// Follows heads until cancelled. In-flight tasks are not awaited.
    pub async fn run(&self) {
        let mut last_seen = None;

        loop {
            let stream = tokio::select! {
                _ = self.cancellation.cancelled() => break,
                stream = self.subscribe() => stream,
            };
            let Some(mut stream) = stream else { break };

            loop {
                tokio::select! {
                    _ = self.cancellation.cancelled() => {
                        info!(target: "subscriber", "Subscriber cancellation requested, stopping...");
                        return;
                    }
                    head = stream.next() => match head {
                        Some(Ok(head)) => {
                            metrics::gauge!(Metrics::CHAIN_HEAD).set(head.number as f64);
                            info!(target: "subscriber", block_number = head.number, "New head received");
                            self.handle_head(head.number, &mut last_seen);
                        }
                        Some(Err(err)) => {
                            error!(target: "subscriber", %err, "Head subscription error");
                        }
                        None => {
                            warn!(target: "subscriber", "Head subscription ended, resubscribing");
                            break;
                        }
                    }
                }
            }
        }
        info!(target: "subscriber", "Subscriber stopped");
    }

    /// Opens a subscription, retrying with backoff. Returns `None` if cancelled.
    async fn subscribe(&self) -> Option<HeadStream> {
        let subscriber = self.subscriber.clone();
        let result = (move || {
            let subscriber = subscriber.clone();
            async move { subscriber.subscribe_new_heads().await }
        })
        .retry(self.backoff)
        .when(|_| !self.cancellation.is_cancelled())
        .notify(|err, delay| {
            warn!(target: "subscriber", %err, ?delay, "Failed to subscribe to new heads, retrying");
        })
        .await;

        match result {
            Ok(stream) => {
                metrics::counter!(Metrics::SUBSCRIPTIONS_TOTAL).increment(1);
                Some(stream)
            }
            Err(err) => {
                error!(target: "subscriber", %err, "Giving up on head subscription");
                None
            }
        }
    }

    fn handle_head(&self, head: u64, last_seen: &mut Option<u64>) {
        let first = match *last_seen {
            Some(last) if head > last.saturating_add(1) => {
                let gap = head - last - 1;
                if gap > self.config.max_gap_fill {
                    let skipped = gap - self.config.max_gap_fill;
                    metrics::counter!(Metrics::HEADS_SKIPPED_TOTAL).increment(skipped);
                    warn!(
                        target: "subscriber",
                        from = last + 1,
                        to = last + skipped,
                        "Head gap exceeds fill bound, run a backfill for the skipped range"
                    );
                    head - self.config.max_gap_fill
                } else {
                    last + 1
                }
            }
            _ => head,
        };

        for number in first..=head {
            self.dispatch(number);
        }
        *last_seen = Some(last_seen.map_or(head, |last| last.max(head)));
    }

    fn dispatch(&self, number: u64) {
        let reconciler = self.reconciler.clone();
        self.tasks.spawn(async move {
            if let Err(err) = reconciler.save_block(number, false).await {
                Metrics::record_block_error(Metrics::PATH_LIVE);
                error!(target: "subscriber", block_number = number, %err, "Failed to save new block");
            }
        });

        let Some(target) = self.config.promotion_target(number) else { return };
        let reconciler = self.reconciler.clone();
        self.tasks.spawn(async move {
            if let Err(err) = reconciler.promote(target).await {
                Metrics::record_block_error(Metrics::PATH_PROMOTE);
                error!(target: "subscriber", block_number = target, %err, "Failed to promote block");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestChainClient, test_block_hash};
    use ethscan_storage::InMemoryStore;

    fn config(confirmations: u64, max_gap_fill: u64) -> IndexerConfig {
        IndexerConfig { start_block: 0, confirmations, scan_workers: 2, tx_workers: 2, max_gap_fill }
    }

    fn subscriber(
        chain: &TestChainClient,
        store: &InMemoryStore,
        config: IndexerConfig,
        cancellation: CancellationToken,
    ) -> LiveSubscriber<TestChainClient, TestChainClient, InMemoryStore> {
        let chain = Arc::new(chain.clone());
        let reconciler =
            Arc::new(BlockReconciler::new(chain.clone(), Arc::new(store.clone()), &config));
        LiveSubscriber::new(chain, reconciler, config, cancellation).with_backoff(
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(1))
                .with_max_delay(Duration::from_millis(5))
                .without_max_times(),
        )
    }

    /// Runs the subscriber until `done` holds or a second passes, then cancels
    /// and drains spawned tasks.
    async fn run_until(
        subscriber: &LiveSubscriber<TestChainClient, TestChainClient, InMemoryStore>,
        cancellation: &CancellationToken,
        done: impl Fn() -> bool,
    ) {
        let watcher = async {
            for _ in 0..200 {
                if done() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            cancellation.cancel();
        };
        tokio::join!(subscriber.run(), watcher);
        subscriber.tasks().close();
        subscriber.tasks().wait().await;
    }

    #[tokio::test]
    async fn test_heads_saved_and_promoted() {
        let chain = TestChainClient::with_blocks(0..=12);
        let store = InMemoryStore::new();
        let cancellation = CancellationToken::new();
        chain.push_subscription(vec![10, 11, 12]);
        let subscriber = subscriber(&chain, &store, config(2, 16), cancellation.clone());

        run_until(&subscriber, &cancellation, || store.blocks().len() >= 5).await;

        let flags: Vec<(u64, bool)> = store.blocks().iter().map(|b| (b.number, b.stable)).collect();
        assert_eq!(flags, vec![(8, true), (9, true), (10, true), (11, false), (12, false)]);
    }

    #[tokio::test]
    async fn test_head_below_depth_skips_promotion() {
        let chain = TestChainClient::with_blocks(0..=1);
        let store = InMemoryStore::new();
        let cancellation = CancellationToken::new();
        chain.push_subscription(vec![1]);
        let subscriber = subscriber(&chain, &store, config(5, 16), cancellation.clone());

        run_until(&subscriber, &cancellation, || !store.blocks().is_empty()).await;

        assert_eq!(store.blocks().len(), 1);
        assert_eq!(chain.fetch_count(0), 0);
    }

    #[tokio::test]
    async fn test_resubscribes_after_stream_ends_and_failures() {
        let chain = TestChainClient::with_blocks(0..=21);
        let store = InMemoryStore::new();
        let cancellation = CancellationToken::new();
        chain.push_subscription(vec![20]);
        chain.push_subscribe_failure();
        chain.push_subscribe_failure();
        chain.push_subscription(vec![21]);
        let subscriber = subscriber(&chain, &store, config(100, 16), cancellation.clone());

        run_until(&subscriber, &cancellation, || store.blocks().len() >= 2).await;

        assert!(chain.subscribe_calls() >= 4);
        let numbers: Vec<u64> = store.blocks().iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![20, 21]);
    }

    #[tokio::test]
    async fn test_stream_error_keeps_subscription() {
        let chain = TestChainClient::with_blocks(0..=31);
        let store = InMemoryStore::new();
        let cancellation = CancellationToken::new();
        chain.push_subscription_items(vec![Some(30), None, Some(31)]);
        let subscriber = subscriber(&chain, &store, config(100, 16), cancellation.clone());

        run_until(&subscriber, &cancellation, || store.blocks().len() >= 2).await;

        let numbers: Vec<u64> = store.blocks().iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![30, 31]);
    }

    #[tokio::test]
    async fn test_gap_fill_bounded() {
        let chain = TestChainClient::with_blocks(0..=20);
        let store = InMemoryStore::new();
        let cancellation = CancellationToken::new();
        chain.push_subscription(vec![10, 20]);
        let subscriber = subscriber(&chain, &store, config(100, 3), cancellation.clone());

        run_until(&subscriber, &cancellation, || store.blocks().len() >= 5).await;

        let numbers: Vec<u64> = store.blocks().iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![10, 17, 18, 19, 20]);
        assert_eq!(chain.fetch_count(16), 0);
    }

    #[tokio::test]
    async fn test_small_gap_filled_completely() {
        let chain = TestChainClient::with_blocks(0..=14);
        let store = InMemoryStore::new();
        let cancellation = CancellationToken::new();
        chain.push_subscription(vec![10, 14, 12]);
        let subscriber = subscriber(&chain, &store, config(100, 8), cancellation.clone());

        run_until(&subscriber, &cancellation, || store.blocks().len() >= 5).await;

        let numbers: Vec<u64> = store.blocks().iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![10, 11, 12, 13, 14]);
        assert_eq!(store.blocks()[0].hash, test_block_hash(10, 0));
    }

    #[tokio::test]
    async fn test_cancellation_stops_idle_subscriber() {
        let chain = TestChainClient::new();
        let store = InMemoryStore::new();
        let cancellation = CancellationToken::new();
        let subscriber = subscriber(&chain, &store, config(2, 8), cancellation.clone());

        cancellation.cancel();
        tokio::time::timeout(Duration::from_secs(1), subscriber.run()).await.unwrap();
    }
}
