use clap::Args;
use ethscan_core::{ConfigError, IndexerConfig};

/// Synchronization arguments.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SyncArgs {
    /// First block the backfill visits.
    #[arg(id = "sync.from-block", long = "sync.from-block", env = "SYNC_BLOCK_FROM_N")]
    pub from_block: u64,
    /// Blocks that must follow a block before it is treated as final.
    #[arg(id = "sync.confirmations", long = "sync.confirmations", env = "CONFIRMED_BLOCK_NUM")]
    pub confirmations: u64,
    /// Concurrent block reconciles during backfill.
    #[arg(id = "sync.scan-workers", long = "sync.scan-workers", env = "SCAN_WORK_NUM")]
    pub scan_workers: usize,
    /// Concurrent transaction writes per block.
    #[arg(id = "sync.tx-workers", long = "sync.tx-workers", env = "WRITE_TRANSACTION_WORK_NUM")]
    pub tx_workers: usize,
    /// Most skipped heads filled in after a subscription gap.
    #[arg(id = "sync.max-gap-fill", long = "sync.max-gap-fill", env = "SYNC_MAX_GAP_FILL", default_value_t = IndexerConfig::DEFAULT_MAX_GAP_FILL)]
    pub max_gap_fill: u64,
}

impl SyncArgs {
    /// Builds and validates the indexer configuration.
    pub fn config(&self) -> Result<IndexerConfig, ConfigError> {
        let config = IndexerConfig {
            start_block: self.from_block,
            confirmations: self.confirmations,
            scan_workers: self.scan_workers,
            tx_workers: self.tx_workers,
            max_gap_fill: self.max_gap_fill,
        };
        config.validate()?;
        Ok(config)
    }
}
