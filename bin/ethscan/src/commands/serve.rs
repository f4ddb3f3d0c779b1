//! Serve Subcommand

use crate::flags::{ApiArgs, DatabaseArgs};
use clap::Parser;
use ethscan_api::ApiServer;
use ethscan_core::QueryService;
use ethscan_storage::PostgresStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The `serve` Subcommand
///
/// Serves indexed blocks and transactions over HTTP until Ctrl-C.
///
/// # Usage
///
/// ```sh
/// ethscan serve [FLAGS] [OPTIONS]
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Serve the query API")]
pub struct ServeCommand {
    /// Listener settings.
    #[command(flatten)]
    pub api: ApiArgs,
    /// Database connection.
    #[command(flatten)]
    pub db: DatabaseArgs,
}

impl ServeCommand {
    /// Serves the API until `cancellation` fires.
    pub async fn run(self, cancellation: CancellationToken) -> anyhow::Result<()> {
        let store = Arc::new(PostgresStore::connect(&self.db.config()).await?);
        let server = ApiServer::new(self.api.socket(), QueryService::new(store.clone()));
        server.serve(cancellation).await?;
        store.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::net::SocketAddr;

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "ethscan",
            "--metrics.port",
            "9100",
            "serve",
            "--api.host",
            "127.0.0.1",
            "--api.port",
            "3000",
            "--db.host",
            "db",
            "--db.port",
            "5432",
            "--db.user",
            "reader",
            "--db.password",
            "secret",
            "--db.name",
            "ethscan",
            "--db.max-idle-conns",
            "50",
            "--db.max-open-conns",
            "10",
        ])
        .unwrap();
        assert_eq!(cli.global.metrics.port, 9100);
        let Commands::Serve(cmd) = cli.subcommand else {
            panic!("expected the serve subcommand");
        };
        assert_eq!(cmd.api.socket(), "127.0.0.1:3000".parse::<SocketAddr>().unwrap());

        let db = cmd.db.config();
        assert_eq!(db.host, "db");
        assert_eq!(db.port, 5432);
        assert_eq!(db.username, "reader");
        assert_eq!(db.max_connections, 10);
        assert_eq!(db.min_connections, 10);
    }
}
