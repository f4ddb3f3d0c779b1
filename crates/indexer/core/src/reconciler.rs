//! Block reconciliation and stability promotion.

use crate::{
    BlockLeases, ChainBlock, ChainClient, IndexerConfig, IngestError, Metrics, ReconcileError,
    TransactionIngestor, WorkerPool,
};
use derive_more::Display;
use ethscan_storage::IndexerStorage;
use std::{sync::Arc, time::Instant};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// What [`BlockReconciler::save_block`] did with the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ReconcileOutcome {
    /// A row already existed and an unstable observation never replaces it.
    #[display("skipped")]
    Skipped,
    /// No row existed; the fetched block was inserted.
    #[display("inserted")]
    Inserted,
    /// The existing row was deleted and the fetched block inserted.
    #[display("replaced")]
    Replaced,
}

impl ReconcileOutcome {
    /// Returns the metric label for the outcome.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Inserted => "inserted",
            Self::Replaced => "replaced",
        }
    }
}

/// What [`BlockReconciler::promote`] did with the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PromoteOutcome {
    /// The stored row matched the canonical block and was flagged stable.
    #[display("marked")]
    Marked,
    /// The stored row was missing or stale and was rewritten as stable.
    #[display("replaced")]
    Replaced,
}

impl PromoteOutcome {
    /// Returns the metric label for the outcome.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Marked => "marked",
            Self::Replaced => "replaced",
        }
    }
}

/// Decides whether a stored block is kept, inserted or replaced.
///
/// Every operation holds the block number's lease from the first lookup to the
/// last write, so backfill and live paths never interleave on one number.
#[derive(Debug)]
pub struct BlockReconciler<C, S> {
    chain: Arc<C>,
    storage: Arc<S>,
    ingestor: TransactionIngestor<C, S>,
    leases: BlockLeases,
    tx_workers: usize,
    tx_tasks: TaskTracker,
}

impl<C, S> BlockReconciler<C, S>
where
    C: ChainClient,
    S: IndexerStorage,
{
    /// Creates a reconciler over `chain` and `storage`.
    pub fn new(chain: Arc<C>, storage: Arc<S>, config: &IndexerConfig) -> Self {
        Self {
            ingestor: TransactionIngestor::new(chain.clone(), storage.clone()),
            chain,
            storage,
            leases: BlockLeases::default(),
            tx_workers: config.tx_workers.max(1),
            tx_tasks: TaskTracker::new(),
        }
    }

    /// Brings the row for `number` in line with the chain.
    ///
    /// An existing row is left alone when `stable` is false and replaced when it
    /// is true. Returns once every transaction of an inserted block has been
    /// admitted for ingestion; ingestion itself continues in the background.
    pub async fn save_block(
        &self,
        number: u64,
        stable: bool,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let _lease = self.leases.acquire(number).await;
        let started = Instant::now();

        let existing = self.storage.block_by_number(number).await?;
        let outcome = match existing {
            Some(_) if !stable => ReconcileOutcome::Skipped,
            Some(_) => {
                self.storage.delete_block(number).await?;
                let block = self.fetch(number).await?;
                self.store(block, true).await?;
                ReconcileOutcome::Replaced
            }
            None => {
                let block = self.fetch(number).await?;
                self.store(block, stable).await?;
                ReconcileOutcome::Inserted
            }
        };

        Metrics::record_reconcile(outcome, started.elapsed().as_secs_f64());
        debug!(
            target: "reconciler",
            block_number = number,
            stable,
            %outcome,
            "Reconciled block"
        );
        Ok(outcome)
    }

    /// Marks `number` stable, rewriting it first if the stored row is missing or
    /// differs from the canonical block.
    pub async fn promote(&self, number: u64) -> Result<PromoteOutcome, ReconcileError> {
        let _lease = self.leases.acquire(number).await;

        let canonical = self.fetch(number).await?;
        let outcome = match self.storage.block_by_number(number).await? {
            Some(stored) if stored.hash == canonical.hash => {
                self.storage.set_block_stable(number, true).await?;
                PromoteOutcome::Marked
            }
            Some(stored) => {
                info!(
                    target: "reconciler",
                    block_number = number,
                    stored = %stored.hash,
                    canonical = %canonical.hash,
                    "Replacing reorged block"
                );
                self.storage.delete_block(number).await?;
                self.store(canonical, true).await?;
                PromoteOutcome::Replaced
            }
            None => {
                self.store(canonical, true).await?;
                PromoteOutcome::Replaced
            }
        };

        Metrics::record_promotion(outcome);
        debug!(
            target: "reconciler",
            block_number = number,
            %outcome,
            "Promoted block"
        );
        Ok(outcome)
    }

    /// Waits for every transaction and receipt task spawned so far.
    pub async fn wait_idle(&self) {
        self.tx_tasks.close();
        self.tx_tasks.wait().await;
        self.tx_tasks.reopen();
        self.ingestor.wait_for_receipts().await;
    }

    async fn fetch(&self, number: u64) -> Result<ChainBlock, ReconcileError> {
        self.chain.block_by_number(number).await?.ok_or(ReconcileError::BlockNotFound(number))
    }

    async fn store(&self, block: ChainBlock, stable: bool) -> Result<(), ReconcileError> {
        let record = block.to_record(stable);
        self.storage.create_block(record).await?;

        let pool = WorkerPool::with_tracker(self.tx_workers, self.tx_tasks.clone());
        for tx in block.transactions {
            let ingestor = self.ingestor.clone();
            let admitted = pool
                .spawn(async move {
                    let tx_hash = tx.hash;
                    match ingestor.ingest(record.hash, tx).await {
                        Ok(_) => {}
                        Err(IngestError::Storage(err)) if err.is_not_found() => {
                            debug!(
                                target: "ingestor",
                                block_number = record.number,
                                %tx_hash,
                                "Block replaced before its transaction was stored"
                            );
                        }
                        Err(err) => {
                            metrics::counter!(Metrics::TRANSACTION_ERRORS_TOTAL).increment(1);
                            warn!(
                                target: "ingestor",
                                block_number = record.number,
                                %tx_hash,
                                %err,
                                "Failed to ingest transaction"
                            );
                        }
                    }
                })
                .await;
            if admitted.is_none() {
                break;
            }
        }
        Ok(())
    }
}
