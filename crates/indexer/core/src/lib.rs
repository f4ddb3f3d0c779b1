#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod config;
pub use config::IndexerConfig;

mod error;
pub use error::{ChainClientError, ConfigError, IngestError, QueryError, ReconcileError};

mod chain;
pub use chain::{
    AlloyChainClient, AlloyChainClientBuilder, ChainBlock, ChainClient, ChainReceipt,
    ChainTransaction, HeadStream, HeadSubscriber,
};

mod pool;
pub use pool::WorkerPool;

mod lease;
pub use lease::BlockLeases;

mod metrics;
pub use metrics::Metrics;

mod ingestor;
pub use ingestor::TransactionIngestor;

mod reconciler;
pub use reconciler::{BlockReconciler, PromoteOutcome, ReconcileOutcome};

mod scanner;
pub use scanner::{BackfillScanner, BackfillSummary};

mod subscriber;
pub use subscriber::LiveSubscriber;

mod query;
pub use query::QueryService;

mod indexer;
pub use indexer::Indexer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
