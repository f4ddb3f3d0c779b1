use crate::StorageError;
use alloy_primitives::B256;
use async_trait::async_trait;
use ethscan_primitives::{Block, Transaction, TransactionLog};
use std::fmt::Debug;

/// Read access to persisted blocks.
///
/// Lookups distinguish three outcomes: `Ok(Some(_))` when the entry exists,
/// `Ok(None)` when it does not, and `Err(_)` when the lookup itself failed.
#[async_trait]
pub trait BlockStorageReader: Debug + Send + Sync {
    /// Gets the block stored under `number`.
    async fn block_by_number(&self, number: u64) -> Result<Option<Block>, StorageError>;

    /// Lists up to `limit` blocks, highest number first.
    async fn recent_blocks(&self, limit: usize) -> Result<Vec<Block>, StorageError>;
}

/// Write access to persisted blocks.
#[async_trait]
pub trait BlockStorageWriter: Debug + Send + Sync {
    /// Inserts a new block row.
    ///
    /// # Returns
    /// * `Err(StorageError::Conflict)` if a row already exists for the block number.
    async fn create_block(&self, block: Block) -> Result<(), StorageError>;

    /// Deletes the block stored under `number`.
    ///
    /// Transactions, receipts and logs stored under the deleted block hash are
    /// removed in the same storage transaction. Deleting an absent number is not
    /// an error.
    async fn delete_block(&self, number: u64) -> Result<(), StorageError>;

    /// Updates the stability flag of the block stored under `number`.
    ///
    /// # Returns
    /// * `Err(StorageError::EntryNotFound)` if no row exists for the block number.
    async fn set_block_stable(&self, number: u64, stable: bool) -> Result<(), StorageError>;
}

/// Read access to persisted transactions and their logs.
#[async_trait]
pub trait TransactionStorageReader: Debug + Send + Sync {
    /// Gets the transaction stored under `tx_hash`.
    async fn transaction_by_hash(&self, tx_hash: B256)
    -> Result<Option<Transaction>, StorageError>;

    /// Lists the hashes of the transactions stored under `block_hash`, ordered by
    /// their position in the block.
    async fn tx_hashes_by_block_hash(&self, block_hash: B256) -> Result<Vec<B256>, StorageError>;

    /// Lists the logs stored for `tx_hash`, ordered by log index.
    async fn logs_by_tx_hash(&self, tx_hash: B256) -> Result<Vec<TransactionLog>, StorageError>;
}

/// Write access to persisted transactions and their receipts.
#[async_trait]
pub trait TransactionStorageWriter: Debug + Send + Sync {
    /// Stores a transaction.
    ///
    /// Storing the same transaction hash again rebinds it to the new block hash.
    /// Fails with [`StorageError::EntryNotFound`] if no block with the
    /// transaction's block hash is stored.
    async fn create_transaction(&self, transaction: &Transaction) -> Result<(), StorageError>;

    /// Stores the receipt marker for `tx_hash` together with its logs.
    ///
    /// Both are written in a single storage transaction, replacing any logs
    /// previously stored for `tx_hash`. Fails with
    /// [`StorageError::EntryNotFound`] if the transaction is not stored.
    async fn save_receipt_and_logs(
        &self,
        tx_hash: B256,
        logs: &[TransactionLog],
    ) -> Result<(), StorageError>;
}

/// Combined block storage access.
pub trait BlockStorage: BlockStorageReader + BlockStorageWriter {}

impl<T: BlockStorageReader + BlockStorageWriter> BlockStorage for T {}

/// Combined transaction storage access.
pub trait TransactionStorage: TransactionStorageReader + TransactionStorageWriter {}

impl<T: TransactionStorageReader + TransactionStorageWriter> TransactionStorage for T {}

/// Everything the indexer needs from storage.
pub trait IndexerStorage: BlockStorage + TransactionStorage + 'static {}

impl<T: BlockStorage + TransactionStorage + 'static> IndexerStorage for T {}
