//! Utilities for spinning up a prometheus metrics server.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use tracing::info;

/// Installs the global Prometheus recorder and serves `/metrics` on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_prometheus_server(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    info!(target: "prometheus", %addr, "Serving metrics");
    Ok(())
}
