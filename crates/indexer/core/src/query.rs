//! Read access to indexed data.

use crate::QueryError;
use alloy_primitives::B256;
use ethscan_primitives::{Block, BlockWithTransactions, TransactionWithLogs};
use ethscan_storage::{BlockStorageReader, TransactionStorageReader};
use std::sync::Arc;

/// Serves blocks and transactions from storage.
#[derive(Debug)]
pub struct QueryService<S> {
    storage: Arc<S>,
}

impl<S> Clone for QueryService<S> {
    fn clone(&self) -> Self {
        Self { storage: self.storage.clone() }
    }
}

impl<S> QueryService<S>
where
    S: BlockStorageReader + TransactionStorageReader,
{
    /// Page size used when a caller asks for zero blocks.
    pub const DEFAULT_LIMIT: usize = 20;
    /// Largest accepted page size.
    pub const MAX_LIMIT: usize = 100;

    /// Creates a query service over `storage`.
    pub const fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Lists the most recent blocks, highest number first.
    ///
    /// A `limit` of zero means [`Self::DEFAULT_LIMIT`].
    pub async fn list(&self, limit: usize) -> Result<Vec<Block>, QueryError> {
        let limit = match limit {
            0 => Self::DEFAULT_LIMIT,
            limit if limit > Self::MAX_LIMIT => {
                return Err(QueryError::InvalidLimit { requested: limit, max: Self::MAX_LIMIT });
            }
            limit => limit,
        };
        Ok(self.storage.recent_blocks(limit).await?)
    }

    /// Returns the block stored under `number` with its transaction hashes.
    pub async fn block_by_number(&self, number: u64) -> Result<BlockWithTransactions, QueryError> {
        let block =
            self.storage.block_by_number(number).await?.ok_or(QueryError::BlockNotFound(number))?;
        let transactions = self.storage.tx_hashes_by_block_hash(block.hash).await?;
        Ok(BlockWithTransactions { block, transactions })
    }

    /// Returns the transaction stored under `tx_hash` with its logs.
    pub async fn transaction_by_hash(
        &self,
        tx_hash: B256,
    ) -> Result<TransactionWithLogs, QueryError> {
        let transaction = self
            .storage
            .transaction_by_hash(tx_hash)
            .await?
            .ok_or(QueryError::TransactionNotFound(tx_hash))?;
        let logs = self.storage.logs_by_tx_hash(tx_hash).await?;
        Ok(TransactionWithLogs { transaction, logs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;
    use ethscan_primitives::{Transaction, TransactionLog};
    use ethscan_storage::{BlockStorageWriter, InMemoryStore, TransactionStorageWriter};

    async fn seeded(blocks: u64) -> (InMemoryStore, QueryService<InMemoryStore>) {
        let store = InMemoryStore::new();
        for number in 1..=blocks {
            store
                .create_block(Block {
                    number,
                    hash: B256::with_last_byte(number as u8),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        (store.clone(), QueryService::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn test_list_zero_returns_default_page() {
        let (_, service) = seeded(30).await;
        let blocks = service.list(0).await.unwrap();
        assert_eq!(blocks.len(), 20);
        assert_eq!(blocks.first().unwrap().number, 30);
        assert_eq!(blocks.last().unwrap().number, 11);
    }

    #[tokio::test]
    async fn test_list_limits() {
        let (_, service) = seeded(5).await;
        assert_eq!(service.list(3).await.unwrap().len(), 3);
        assert_eq!(service.list(100).await.unwrap().len(), 5);
        assert!(matches!(
            service.list(150).await,
            Err(QueryError::InvalidLimit { requested: 150, max: 100 })
        ));
    }

    #[tokio::test]
    async fn test_absent_block_is_not_found() {
        let (_, service) = seeded(2).await;
        assert!(matches!(service.block_by_number(9).await, Err(QueryError::BlockNotFound(9))));
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_not_found() {
        let (store, service) = seeded(2).await;
        store.set_fail_reads(true);
        assert!(matches!(service.block_by_number(1).await, Err(QueryError::Storage(_))));
    }

    #[tokio::test]
    async fn test_block_with_transactions() {
        let (store, service) = seeded(3).await;
        let block_hash = B256::with_last_byte(2);
        for index in [1u64, 0] {
            store
                .create_transaction(&Transaction {
                    block_hash,
                    tx_hash: B256::repeat_byte(0x10 + index as u8),
                    index,
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let found = service.block_by_number(2).await.unwrap();
        assert_eq!(found.block.number, 2);
        assert_eq!(found.transactions, vec![B256::repeat_byte(0x10), B256::repeat_byte(0x11)]);
    }

    #[tokio::test]
    async fn test_transaction_with_logs() {
        let (store, service) = seeded(1).await;
        let tx_hash = B256::repeat_byte(0xee);
        store
            .create_transaction(&Transaction {
                tx_hash,
                block_hash: B256::with_last_byte(1),
                ..Default::default()
            })
            .await
            .unwrap();
        let log = TransactionLog { tx_hash, log_index: 0, data: Bytes::from_static(b"log") };
        store.save_receipt_and_logs(tx_hash, &[log.clone()]).await.unwrap();

        let found = service.transaction_by_hash(tx_hash).await.unwrap();
        assert_eq!(found.transaction.tx_hash, tx_hash);
        assert_eq!(found.logs, vec![log]);

        assert!(matches!(
            service.transaction_by_hash(B256::ZERO).await,
            Err(QueryError::TransactionNotFound(_))
        ));
    }
}
