//! Scan Subcommand

use crate::flags::{ChainArgs, DatabaseArgs, SyncArgs};
use clap::Parser;
use ethscan_core::Indexer;
use ethscan_storage::PostgresStore;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The `scan` Subcommand
///
/// Backfills history from `--sync.from-block` and follows new heads until Ctrl-C.
///
/// # Usage
///
/// ```sh
/// ethscan scan [FLAGS] [OPTIONS]
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Index blocks and transactions into the database")]
pub struct ScanCommand {
    /// Chain endpoints.
    #[command(flatten)]
    pub chain: ChainArgs,
    /// Synchronization settings.
    #[command(flatten)]
    pub sync: SyncArgs,
    /// Database connection.
    #[command(flatten)]
    pub db: DatabaseArgs,
    /// Time allowed for in-flight work after shutdown is requested, in seconds.
    #[arg(id = "shutdown.drain-timeout-secs", long = "shutdown.drain-timeout-secs", env = "SHUTDOWN_DRAIN_TIMEOUT_SECS", default_value_t = 30)]
    pub drain_timeout_secs: u64,
}

impl ScanCommand {
    /// Runs the indexer until `cancellation` fires.
    pub async fn run(self, cancellation: CancellationToken) -> anyhow::Result<()> {
        let config = self.sync.config()?;
        let store = PostgresStore::connect(&self.db.config()).await?;
        store.migrate().await?;

        let chain = Arc::new(self.chain.client());
        info!(
            target: "ethscan",
            rpc_url = %self.chain.rpc_url,
            start_block = config.start_block,
            confirmations = config.confirmations,
            "Starting indexer"
        );

        let storage = Arc::new(store);
        let indexer = Indexer::new(chain, storage.clone(), config, cancellation);
        indexer.run(Duration::from_secs(self.drain_timeout_secs)).await;

        storage.close().await;
        info!(target: "ethscan", "Indexer stopped");
        Ok(())
    }
}
