//! Global arguments for the CLI.

use clap::Parser;
use ethscan_cli::{LogArgs, MetricsArgs};

/// Arguments accepted by every subcommand.
#[derive(Parser, Default, Clone, Debug)]
pub struct GlobalArgs {
    /// Logging arguments.
    #[command(flatten)]
    pub log_args: LogArgs,
    /// Prometheus arguments.
    #[command(flatten)]
    pub metrics: MetricsArgs,
}
