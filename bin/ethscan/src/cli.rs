//! Contains the ethscan CLI.

use crate::{
    commands::{ScanCommand, ServeCommand, cancel_on_ctrl_c},
    flags::GlobalArgs,
};
use anyhow::Result;
use clap::{Parser, Subcommand};
use ethscan_cli::cli_styles;
use ethscan_core::Metrics;
use tokio_util::sync::CancellationToken;

/// Subcommands for the CLI.
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Indexes the chain into the database.
    Scan(ScanCommand),
    /// Serves the query API.
    Serve(ServeCommand),
}

/// The ethscan CLI.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, styles = cli_styles(), long_about = None)]
pub struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub subcommand: Commands,
    /// Global arguments for the CLI.
    #[command(flatten)]
    pub global: GlobalArgs,
}

impl Cli {
    /// Runs the CLI.
    pub fn run(self) -> Result<()> {
        self.global.log_args.init_tracing_subscriber(None)?;

        let rt = Self::tokio_runtime()?;
        rt.block_on(async move {
            if self.global.metrics.init_metrics()? {
                Metrics::init();
            }

            let cancellation = CancellationToken::new();
            cancel_on_ctrl_c(cancellation.clone());
            match self.subcommand {
                Commands::Scan(scan) => scan.run(cancellation).await,
                Commands::Serve(serve) => serve.run(cancellation).await,
            }
        })
    }

    /// Creates a new default tokio multi-thread [Runtime](tokio::runtime::Runtime) with all
    /// features enabled
    pub fn tokio_runtime() -> Result<tokio::runtime::Runtime, std::io::Error> {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()
    }
}
