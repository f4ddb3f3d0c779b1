use alloy_primitives::B256;
use alloy_transport::TransportError;
use ethscan_storage::StorageError;
use thiserror::Error;

/// An error returned by a [`ChainClient`](crate::ChainClient) or
/// [`HeadSubscriber`](crate::HeadSubscriber).
#[derive(Debug, Error)]
pub enum ChainClientError {
    /// The RPC transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(&'static str),

    /// The node returned a block without its full transaction bodies.
    #[error("block {0} returned without full transactions")]
    MissingTransactions(u64),

    /// The head subscription reported an error.
    #[error("subscription error: {0}")]
    Subscription(String),

    /// Connecting to the node failed.
    #[error("failed to connect to {url}: {reason}")]
    Connect {
        /// The endpoint that could not be reached.
        url: String,
        /// Why the connection failed.
        reason: String,
    },
}

/// An error raised while reconciling or promoting a block.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Fetching from the chain failed.
    #[error(transparent)]
    Chain(#[from] ChainClientError),

    /// Reading or writing storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The chain has no block at the requested number.
    #[error("block {0} not found on chain")]
    BlockNotFound(u64),
}

/// An error raised while ingesting a single transaction or its receipt.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The sender could not be recovered from the signature.
    #[error("failed to recover signer of {tx_hash}: {reason}")]
    SignerRecovery {
        /// The offending transaction.
        tx_hash: B256,
        /// Why recovery failed.
        reason: String,
    },

    /// Writing to storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Fetching the receipt failed.
    #[error(transparent)]
    Chain(#[from] ChainClientError),
}

/// An error returned by the [`QueryService`](crate::QueryService).
#[derive(Debug, Error)]
pub enum QueryError {
    /// No block is stored under the number.
    #[error("block {0} not exist")]
    BlockNotFound(u64),

    /// No transaction is stored under the hash.
    #[error("transaction {0} not exist")]
    TransactionNotFound(B256),

    /// The requested page size is out of range.
    #[error("limit should be 0~{max}, got {requested}")]
    InvalidLimit {
        /// The rejected limit.
        requested: usize,
        /// The largest accepted limit.
        max: usize,
    },

    /// Reading storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// An invalid [`IndexerConfig`](crate::IndexerConfig).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The backfill worker count is zero.
    #[error("scan workers must be greater than zero")]
    ZeroScanWorkers,

    /// The transaction worker count is zero.
    #[error("transaction workers must be greater than zero")]
    ZeroTransactionWorkers,
}
