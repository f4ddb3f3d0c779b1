#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::StorageError;

mod traits;
pub use traits::{
    BlockStorage, BlockStorageReader, BlockStorageWriter, IndexerStorage, TransactionStorage,
    TransactionStorageReader, TransactionStorageWriter,
};

mod postgres;
pub use postgres::{PostgresConfig, PostgresStore};

#[cfg(any(test, feature = "test-utils"))]
mod memory;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryStore;
