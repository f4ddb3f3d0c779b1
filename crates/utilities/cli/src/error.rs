//! Error types for CLI utilities.

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tracing_subscriber::util::TryInitError;

/// Errors raised while setting up a binary's ambient stack.
#[derive(Debug, Error)]
pub enum CliError {
    /// A global tracing subscriber was already installed.
    #[error("failed to initialize tracing: {0}")]
    Tracing(#[from] TryInitError),

    /// The Prometheus exporter could not be installed.
    #[error("failed to initialize metrics: {0}")]
    Metrics(#[from] BuildError),
}

/// Result alias for CLI setup.
pub type CliResult<T> = Result<T, CliError>;
