use crate::router;
use ethscan_core::QueryService;
use ethscan_storage::{BlockStorageReader, TransactionStorageReader};
use std::{io, net::SocketAddr};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Failure to run the API server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying failure.
        source: io::Error,
    },
    /// The server stopped with an I/O error.
    #[error("server error: {0}")]
    Serve(#[from] io::Error),
}

/// HTTP server for the query API.
#[derive(Debug)]
pub struct ApiServer<S> {
    addr: SocketAddr,
    query: QueryService<S>,
}

impl<S> ApiServer<S>
where
    S: BlockStorageReader + TransactionStorageReader + 'static,
{
    /// Creates a server answering on `addr`.
    pub const fn new(addr: SocketAddr, query: QueryService<S>) -> Self {
        Self { addr, query }
    }

    /// Serves requests until `cancellation` fires, then finishes in-flight requests.
    pub async fn serve(self, cancellation: CancellationToken) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServerError::Bind { addr: self.addr, source })?;
        self.serve_on(listener, cancellation).await
    }

    /// Like [`Self::serve`] on an already bound listener.
    pub async fn serve_on(
        self,
        listener: TcpListener,
        cancellation: CancellationToken,
    ) -> Result<(), ServerError> {
        let local = listener.local_addr()?;
        info!(target: "api", addr = %local, "Serving query API");

        axum::serve(listener, router(self.query))
            .with_graceful_shutdown(async move { cancellation.cancelled().await })
            .await?;

        info!(target: "api", "Query API stopped");
        Ok(())
    }
}
