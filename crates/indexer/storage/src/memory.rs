//! In-memory storage used by tests across the workspace.

use crate::{
    BlockStorageReader, BlockStorageWriter, StorageError, TransactionStorageReader,
    TransactionStorageWriter,
};
use alloy_primitives::B256;
use async_trait::async_trait;
use ethscan_primitives::{Block, Transaction, TransactionLog};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

#[derive(Debug, Default)]
struct State {
    blocks: BTreeMap<u64, Block>,
    transactions: HashMap<B256, Transaction>,
    receipts: HashSet<B256>,
    logs: BTreeMap<(B256, u64), TransactionLog>,
}

/// Storage backed by in-process maps with the same semantics as
/// [`PostgresStore`](crate::PostgresStore).
///
/// Clones share state. Reads and writes can be made to fail on demand.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent read fail with a database error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent write fail with a database error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns all stored blocks in ascending number order.
    pub fn blocks(&self) -> Vec<Block> {
        self.read().blocks.values().copied().collect()
    }

    /// Returns the number of stored transactions.
    pub fn transaction_count(&self) -> usize {
        self.read().transactions.len()
    }

    /// Returns true if a receipt marker is stored for `tx_hash`.
    pub fn has_receipt(&self, tx_hash: &B256) -> bool {
        self.read().receipts.contains(tx_hash)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_read(&self) -> Result<(), StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl BlockStorageReader for InMemoryStore {
    async fn block_by_number(&self, number: u64) -> Result<Option<Block>, StorageError> {
        self.check_read()?;
        Ok(self.read().blocks.get(&number).copied())
    }

    async fn recent_blocks(&self, limit: usize) -> Result<Vec<Block>, StorageError> {
        self.check_read()?;
        Ok(self.read().blocks.values().rev().take(limit).copied().collect())
    }
}

#[async_trait]
impl BlockStorageWriter for InMemoryStore {
    async fn create_block(&self, block: Block) -> Result<(), StorageError> {
        self.check_write()?;
        let mut state = self.write();
        if state.blocks.contains_key(&block.number) {
            return Err(StorageError::Conflict(format!("block {} already stored", block.number)));
        }
        state.blocks.insert(block.number, block);
        Ok(())
    }

    async fn delete_block(&self, number: u64) -> Result<(), StorageError> {
        self.check_write()?;
        let mut state = self.write();
        let Some(removed) = state.blocks.remove(&number) else {
            return Ok(());
        };

        let orphaned: Vec<B256> = state
            .transactions
            .values()
            .filter(|tx| tx.block_hash == removed.hash)
            .map(|tx| tx.tx_hash)
            .collect();
        for tx_hash in orphaned {
            state.transactions.remove(&tx_hash);
            state.receipts.remove(&tx_hash);
            state.logs.retain(|(hash, _), _| *hash != tx_hash);
        }
        Ok(())
    }

    async fn set_block_stable(&self, number: u64, stable: bool) -> Result<(), StorageError> {
        self.check_write()?;
        match self.write().blocks.get_mut(&number) {
            Some(block) => {
                block.stable = stable;
                Ok(())
            }
            None => Err(StorageError::EntryNotFound(format!("block {number}"))),
        }
    }
}

#[async_trait]
impl TransactionStorageReader for InMemoryStore {
    async fn transaction_by_hash(
        &self,
        tx_hash: B256,
    ) -> Result<Option<Transaction>, StorageError> {
        self.check_read()?;
        Ok(self.read().transactions.get(&tx_hash).cloned())
    }

    async fn tx_hashes_by_block_hash(&self, block_hash: B256) -> Result<Vec<B256>, StorageError> {
        self.check_read()?;
        let state = self.read();
        let mut txs: Vec<&Transaction> =
            state.transactions.values().filter(|tx| tx.block_hash == block_hash).collect();
        txs.sort_by_key(|tx| tx.index);
        Ok(txs.into_iter().map(|tx| tx.tx_hash).collect())
    }

    async fn logs_by_tx_hash(&self, tx_hash: B256) -> Result<Vec<TransactionLog>, StorageError> {
        self.check_read()?;
        Ok(self
            .read()
            .logs
            .range((tx_hash, 0)..=(tx_hash, u64::MAX))
            .map(|(_, log)| log.clone())
            .collect())
    }
}

#[async_trait]
impl TransactionStorageWriter for InMemoryStore {
    async fn create_transaction(&self, transaction: &Transaction) -> Result<(), StorageError> {
        self.check_write()?;
        let mut state = self.write();
        if !state.blocks.values().any(|block| block.hash == transaction.block_hash) {
            return Err(StorageError::EntryNotFound(format!("block {}", transaction.block_hash)));
        }
        state
            .transactions
            .entry(transaction.tx_hash)
            .and_modify(|stored| {
                stored.block_hash = transaction.block_hash;
                stored.index = transaction.index;
            })
            .or_insert_with(|| transaction.clone());
        Ok(())
    }

    async fn save_receipt_and_logs(
        &self,
        tx_hash: B256,
        logs: &[TransactionLog],
    ) -> Result<(), StorageError> {
        self.check_write()?;
        let mut state = self.write();
        if !state.transactions.contains_key(&tx_hash) {
            return Err(StorageError::EntryNotFound(format!("transaction {tx_hash}")));
        }
        state.receipts.insert(tx_hash);
        state.logs.retain(|(hash, _), _| *hash != tx_hash);
        for log in logs {
            state.logs.insert((tx_hash, log.log_index), log.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;

    fn block(number: u64, seed: u8) -> Block {
        Block {
            number,
            hash: B256::repeat_byte(seed),
            parent_hash: B256::repeat_byte(seed.wrapping_sub(1)),
            timestamp: 1_000 + number,
            stable: false,
        }
    }

    fn transaction(block_hash: B256, index: u64, seed: u8) -> Transaction {
        Transaction {
            block_hash,
            tx_hash: B256::repeat_byte(seed),
            index,
            nonce: index,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_block_conflict() {
        let store = InMemoryStore::new();
        store.create_block(block(1, 0x10)).await.unwrap();
        let err = store.create_block(block(1, 0x11)).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        assert_eq!(store.block_by_number(1).await.unwrap().unwrap().hash, B256::repeat_byte(0x10));
    }

    #[tokio::test]
    async fn test_block_lookup_outcomes() {
        let store = InMemoryStore::new();
        store.create_block(block(7, 0x07)).await.unwrap();

        assert!(store.block_by_number(7).await.unwrap().is_some());
        assert!(store.block_by_number(8).await.unwrap().is_none());

        store.set_fail_reads(true);
        assert!(store.block_by_number(7).await.is_err());
    }

    #[tokio::test]
    async fn test_recent_blocks_descending() {
        let store = InMemoryStore::new();
        for n in [3, 1, 5, 2, 4] {
            store.create_block(block(n, n as u8)).await.unwrap();
        }
        let numbers: Vec<u64> =
            store.recent_blocks(3).await.unwrap().iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![5, 4, 3]);
        assert_eq!(store.recent_blocks(100).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_delete_block_cascades() {
        let store = InMemoryStore::new();
        let kept = block(1, 0x01);
        let dropped = block(2, 0x02);
        store.create_block(kept).await.unwrap();
        store.create_block(dropped).await.unwrap();

        let kept_tx = transaction(kept.hash, 0, 0xa0);
        let dropped_tx = transaction(dropped.hash, 0, 0xb0);
        store.create_transaction(&kept_tx).await.unwrap();
        store.create_transaction(&dropped_tx).await.unwrap();
        let log = TransactionLog {
            tx_hash: dropped_tx.tx_hash,
            log_index: 0,
            data: Bytes::from_static(&[1]),
        };
        store.save_receipt_and_logs(dropped_tx.tx_hash, &[log]).await.unwrap();

        store.delete_block(2).await.unwrap();
        store.delete_block(99).await.unwrap();

        assert!(store.block_by_number(2).await.unwrap().is_none());
        assert!(store.transaction_by_hash(dropped_tx.tx_hash).await.unwrap().is_none());
        assert!(!store.has_receipt(&dropped_tx.tx_hash));
        assert!(store.logs_by_tx_hash(dropped_tx.tx_hash).await.unwrap().is_empty());
        assert!(store.transaction_by_hash(kept_tx.tx_hash).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_set_block_stable_missing() {
        let store = InMemoryStore::new();
        let err = store.set_block_stable(3, true).await.unwrap_err();
        assert!(err.is_not_found());

        store.create_block(block(3, 0x03)).await.unwrap();
        store.set_block_stable(3, true).await.unwrap();
        assert!(store.block_by_number(3).await.unwrap().unwrap().stable);
    }

    #[tokio::test]
    async fn test_transaction_rebinds_to_new_block() {
        let store = InMemoryStore::new();
        store.create_block(block(1, 0x01)).await.unwrap();
        store.create_block(block(2, 0x02)).await.unwrap();
        let tx = transaction(B256::repeat_byte(1), 4, 0xcc);
        store.create_transaction(&tx).await.unwrap();

        let moved = Transaction { block_hash: B256::repeat_byte(2), index: 0, ..tx.clone() };
        store.create_transaction(&moved).await.unwrap();

        assert_eq!(store.transaction_count(), 1);
        let stored = store.transaction_by_hash(tx.tx_hash).await.unwrap().unwrap();
        assert_eq!(stored.block_hash, B256::repeat_byte(2));
        assert_eq!(stored.index, 0);
        assert!(store.tx_hashes_by_block_hash(B256::repeat_byte(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tx_hashes_ordered_by_index() {
        let store = InMemoryStore::new();
        store.create_block(block(9, 0x09)).await.unwrap();
        let block_hash = B256::repeat_byte(9);
        for (index, seed) in [(2, 0x32), (0, 0x30), (1, 0x31)] {
            store.create_transaction(&transaction(block_hash, index, seed)).await.unwrap();
        }
        assert_eq!(
            store.tx_hashes_by_block_hash(block_hash).await.unwrap(),
            vec![B256::repeat_byte(0x30), B256::repeat_byte(0x31), B256::repeat_byte(0x32)]
        );
    }

    #[tokio::test]
    async fn test_transaction_requires_stored_block() {
        let store = InMemoryStore::new();
        let tx = transaction(B256::repeat_byte(4), 0, 0xd0);

        let err = store.create_transaction(&tx).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.transaction_count(), 0);

        let log = TransactionLog { tx_hash: tx.tx_hash, log_index: 0, data: Bytes::new() };
        let err = store.save_receipt_and_logs(tx.tx_hash, &[log]).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.has_receipt(&tx.tx_hash));
    }

    #[tokio::test]
    async fn test_receipt_replaces_previous_logs() {
        let store = InMemoryStore::new();
        store.create_block(block(1, 0x01)).await.unwrap();
        let tx = transaction(B256::repeat_byte(1), 0, 0xe0);
        store.create_transaction(&tx).await.unwrap();

        let log = |log_index| TransactionLog {
            tx_hash: tx.tx_hash,
            log_index,
            data: Bytes::from(vec![log_index as u8]),
        };
        store.save_receipt_and_logs(tx.tx_hash, &[log(5), log(6)]).await.unwrap();
        store.save_receipt_and_logs(tx.tx_hash, &[log(0)]).await.unwrap();

        assert_eq!(store.logs_by_tx_hash(tx.tx_hash).await.unwrap(), vec![log(0)]);
    }

    #[tokio::test]
    async fn test_failed_writes_leave_state_untouched() {
        let store = InMemoryStore::new();
        store.set_fail_writes(true);
        assert!(store.create_block(block(1, 1)).await.is_err());
        store.set_fail_writes(false);
        assert!(store.blocks().is_empty());
    }
}
