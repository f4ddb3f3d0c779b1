//! Prometheus exporter flags.

use crate::{CliResult, init_prometheus_server};
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Flags controlling the Prometheus exporter.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct MetricsArgs {
    /// Serve Prometheus metrics.
    #[arg(id = "metrics.enabled", long = "metrics.enabled", default_value_t = false, env = "METRICS_ENABLED")]
    pub enabled: bool,
    /// Address the metrics server listens on.
    #[arg(id = "metrics.addr", long = "metrics.addr", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED), env = "METRICS_ADDR")]
    pub addr: IpAddr,
    /// Port the metrics server listens on.
    #[arg(id = "metrics.port", long = "metrics.port", default_value_t = 9090, env = "METRICS_PORT")]
    pub port: u16,
}

impl Default for MetricsArgs {
    fn default() -> Self {
        Self { enabled: false, addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 9090 }
    }
}

impl MetricsArgs {
    /// Returns the socket the exporter binds.
    pub const fn socket(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }

    /// Starts the exporter if enabled. Returns whether it was started.
    pub fn init_metrics(&self) -> CliResult<bool> {
        if !self.enabled {
            return Ok(false);
        }
        init_prometheus_server(self.socket())?;
        Ok(true)
    }
}
