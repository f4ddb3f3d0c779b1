use crate::{PromoteOutcome, ReconcileOutcome};

/// Metric names and recording helpers for the synchronization engine.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Identifier for the counter of reconciled blocks, labelled by outcome.
    pub const BLOCKS_RECONCILED_TOTAL: &'static str = "ethscan_blocks_reconciled_total";
    /// Identifier for the counter of failed reconciles, labelled by path.
    pub const BLOCK_ERRORS_TOTAL: &'static str = "ethscan_block_errors_total";
    /// Identifier for the counter of promotions, labelled by outcome.
    pub const BLOCKS_PROMOTED_TOTAL: &'static str = "ethscan_blocks_promoted_total";
    /// Identifier for the counter of stored transactions.
    pub const TRANSACTIONS_STORED_TOTAL: &'static str = "ethscan_transactions_stored_total";
    /// Identifier for the counter of failed transaction ingestions.
    pub const TRANSACTION_ERRORS_TOTAL: &'static str = "ethscan_transaction_errors_total";
    /// Identifier for the counter of stored receipts.
    pub const RECEIPTS_STORED_TOTAL: &'static str = "ethscan_receipts_stored_total";
    /// Identifier for the counter of failed receipt fetches or writes.
    pub const RECEIPT_ERRORS_TOTAL: &'static str = "ethscan_receipt_errors_total";
    /// Identifier for the counter of head subscription (re)connects.
    pub const SUBSCRIPTIONS_TOTAL: &'static str = "ethscan_subscriptions_total";
    /// Identifier for the counter of skipped heads left for an operator backfill.
    pub const HEADS_SKIPPED_TOTAL: &'static str = "ethscan_heads_skipped_total";
    /// Identifier for the gauge of the latest head seen.
    pub const CHAIN_HEAD: &'static str = "ethscan_chain_head";
    /// Identifier for the reconcile latency histogram.
    pub const RECONCILE_DURATION_SECONDS: &'static str = "ethscan_reconcile_duration_seconds";

    /// Label value for the backfill path.
    pub const PATH_BACKFILL: &'static str = "backfill";
    /// Label value for the live path.
    pub const PATH_LIVE: &'static str = "live";
    /// Label value for promotions.
    pub const PATH_PROMOTE: &'static str = "promote";

    /// Describes and zeroes every metric.
    pub fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::BLOCKS_RECONCILED_TOTAL,
            metrics::Unit::Count,
            "Blocks reconciled, by outcome"
        );
        metrics::describe_counter!(
            Self::BLOCK_ERRORS_TOTAL,
            metrics::Unit::Count,
            "Block reconciles or promotions that failed, by path"
        );
        metrics::describe_counter!(
            Self::BLOCKS_PROMOTED_TOTAL,
            metrics::Unit::Count,
            "Blocks promoted to stable, by outcome"
        );
        metrics::describe_counter!(
            Self::TRANSACTIONS_STORED_TOTAL,
            metrics::Unit::Count,
            "Transactions written to storage"
        );
        metrics::describe_counter!(
            Self::TRANSACTION_ERRORS_TOTAL,
            metrics::Unit::Count,
            "Transactions that could not be ingested"
        );
        metrics::describe_counter!(
            Self::RECEIPTS_STORED_TOTAL,
            metrics::Unit::Count,
            "Receipts written together with their logs"
        );
        metrics::describe_counter!(
            Self::RECEIPT_ERRORS_TOTAL,
            metrics::Unit::Count,
            "Receipts that could not be fetched or written"
        );
        metrics::describe_counter!(
            Self::SUBSCRIPTIONS_TOTAL,
            metrics::Unit::Count,
            "Head subscriptions opened"
        );
        metrics::describe_counter!(
            Self::HEADS_SKIPPED_TOTAL,
            metrics::Unit::Count,
            "Heads beyond the gap fill bound that were not reconciled"
        );
        metrics::describe_gauge!(Self::CHAIN_HEAD, "Latest head number received");
        metrics::describe_histogram!(
            Self::RECONCILE_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Latency of a single block reconcile"
        );
    }

    fn zero() {
        for outcome in [ReconcileOutcome::Skipped, ReconcileOutcome::Inserted, ReconcileOutcome::Replaced] {
            metrics::counter!(Self::BLOCKS_RECONCILED_TOTAL, "outcome" => outcome.as_str())
                .increment(0);
        }
        for outcome in [PromoteOutcome::Marked, PromoteOutcome::Replaced] {
            metrics::counter!(Self::BLOCKS_PROMOTED_TOTAL, "outcome" => outcome.as_str())
                .increment(0);
        }
        for path in [Self::PATH_BACKFILL, Self::PATH_LIVE, Self::PATH_PROMOTE] {
            metrics::counter!(Self::BLOCK_ERRORS_TOTAL, "path" => path).increment(0);
        }
        metrics::counter!(Self::TRANSACTIONS_STORED_TOTAL).increment(0);
        metrics::counter!(Self::TRANSACTION_ERRORS_TOTAL).increment(0);
        metrics::counter!(Self::RECEIPTS_STORED_TOTAL).increment(0);
        metrics::counter!(Self::RECEIPT_ERRORS_TOTAL).increment(0);
        metrics::counter!(Self::SUBSCRIPTIONS_TOTAL).increment(0);
        metrics::counter!(Self::HEADS_SKIPPED_TOTAL).increment(0);
        metrics::gauge!(Self::CHAIN_HEAD).set(0.0);
        metrics::histogram!(Self::RECONCILE_DURATION_SECONDS).record(0.0);
    }

    pub(crate) fn record_reconcile(outcome: ReconcileOutcome, seconds: f64) {
        metrics::counter!(Self::BLOCKS_RECONCILED_TOTAL, "outcome" => outcome.as_str())
            .increment(1);
        metrics::histogram!(Self::RECONCILE_DURATION_SECONDS).record(seconds);
    }

    pub(crate) fn record_promotion(outcome: PromoteOutcome) {
        metrics::counter!(Self::BLOCKS_PROMOTED_TOTAL, "outcome" => outcome.as_str())
            .increment(1);
    }

    pub(crate) fn record_block_error(path: &'static str) {
        metrics::counter!(Self::BLOCK_ERRORS_TOTAL, "path" => path).increment(1);
    }
}
