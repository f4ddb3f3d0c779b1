use crate::{
    BackfillScanner, BlockReconciler, ChainClient, HeadSubscriber, IndexerConfig, LiveSubscriber,
};
use ethscan_storage::IndexerStorage;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Runs the backfill and the live subscriber side by side until cancelled.
#[derive(Debug)]
pub struct Indexer<C, S> {
    chain: Arc<C>,
    reconciler: Arc<BlockReconciler<C, S>>,
    config: IndexerConfig,
    cancellation: CancellationToken,
}

impl<C, S> Indexer<C, S>
where
    C: ChainClient + HeadSubscriber,
    S: IndexerStorage,
{
    /// Wires the synchronization components over `chain` and `storage`.
    pub fn new(
        chain: Arc<C>,
        storage: Arc<S>,
        config: IndexerConfig,
        cancellation: CancellationToken,
    ) -> Self {
        let reconciler = Arc::new(BlockReconciler::new(chain.clone(), storage, &config));
        Self { chain, reconciler, config, cancellation }
    }

    /// Follows the chain until the cancellation token fires, then waits at most
    /// `drain_timeout` for in-flight work.
    pub async fn run(&self, drain_timeout: Duration) {
        let subscriber = LiveSubscriber::new(
            self.chain.clone(),
            self.reconciler.clone(),
            self.config,
            self.cancellation.clone(),
        );
        let scanner = BackfillScanner::new(
            self.chain.clone(),
            self.reconciler.clone(),
            self.config,
            self.cancellation.clone(),
        );

        let backfill = async {
            match scanner.run().await {
                Ok(summary) if !summary.failed.is_empty() => {
                    warn!(
                        target: "backfill",
                        failed = ?summary.failed,
                        "Backfill left gaps, rerun from the first failed block"
                    );
                }
                Ok(_) => {}
                Err(err) => error!(target: "backfill", %err, "Failed to read chain head"),
            }
        };
        tokio::join!(subscriber.run(), backfill);

        info!(target: "indexer", ?drain_timeout, "Draining in-flight work");
        let drain = async {
            for tasks in [subscriber.tasks(), scanner.tasks()] {
                tasks.close();
                tasks.wait().await;
            }
            self.reconciler.wait_idle().await;
        };
        if tokio::time::timeout(drain_timeout, drain).await.is_err() {
            warn!(target: "indexer", "In-flight work did not finish before the drain timeout");
        }
    }
}
