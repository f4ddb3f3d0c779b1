//! Postgres implementation of the storage traits.

mod rows;
use rows::{BlockRow, LogRow, TransactionRow, hash_key, to_i64, value_key};

use crate::{
    BlockStorageReader, BlockStorageWriter, StorageError, TransactionStorageReader,
    TransactionStorageWriter,
};
use alloy_primitives::B256;
use async_trait::async_trait;
use ethscan_primitives::{Block, Transaction, TransactionLog};
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use std::time::Duration;
use tracing::{debug, error, info};

/// Connection parameters and pool sizing for [`PostgresStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Login user.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Database name.
    pub database: String,
    /// Connections kept open while idle.
    pub min_connections: u32,
    /// Upper bound on open connections.
    pub max_connections: u32,
    /// Maximum lifetime of a pooled connection.
    pub max_lifetime: Duration,
    /// How long to wait for a pooled connection before failing.
    pub acquire_timeout: Duration,
}

impl PostgresConfig {
    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database)
    }
}

/// Block, transaction and receipt storage backed by a Postgres pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool with the given configuration.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .max_lifetime(config.max_lifetime)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options())
            .await
            .inspect_err(|err| {
                error!(
                    target: "storage",
                    host = %config.host,
                    port = config.port,
                    database = %config.database,
                    %err,
                    "Failed to connect to database"
                );
            })?;
        info!(
            target: "storage",
            host = %config.host,
            database = %config.database,
            max_connections = config.max_connections,
            "Connected to database"
        );
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        debug!(target: "storage", "Schema migrations applied");
        Ok(())
    }

    /// Closes the pool, waiting for checked out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl BlockStorageReader for PostgresStore {
    async fn block_by_number(&self, number: u64) -> Result<Option<Block>, StorageError> {
        let row = sqlx::query_as::<_, BlockRow>(
            "SELECT block_num, block_hash, block_time, parent_hash, stable \
             FROM ethscan.blocks WHERE block_num = $1",
        )
        .bind(to_i64(number, "block_num")?)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Block::try_from).transpose()
    }

    async fn recent_blocks(&self, limit: usize) -> Result<Vec<Block>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, BlockRow>(
            "SELECT block_num, block_hash, block_time, parent_hash, stable \
             FROM ethscan.blocks ORDER BY block_num DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Block::try_from).collect()
    }
}

#[async_trait]
impl BlockStorageWriter for PostgresStore {
    async fn create_block(&self, block: Block) -> Result<(), StorageError> {
        let result = sqlx::query(
            "INSERT INTO ethscan.blocks (block_num, block_hash, block_time, parent_hash, stable) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(to_i64(block.number, "block_num")?)
        .bind(hash_key(block.hash))
        .bind(to_i64(block.timestamp, "block_time")?)
        .bind(hash_key(block.parent_hash))
        .bind(block.stable)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StorageError::Conflict(format!("block {} already stored", block.number)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_block(&self, number: u64) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        let removed: Option<String> = sqlx::query_scalar(
            "DELETE FROM ethscan.blocks WHERE block_num = $1 RETURNING block_hash",
        )
        .bind(to_i64(number, "block_num")?)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(block_hash) = removed {
            sqlx::query(
                "DELETE FROM ethscan.transaction_logs WHERE tx_hash IN \
                 (SELECT tx_hash FROM ethscan.transactions WHERE block_hash = $1)",
            )
            .bind(&block_hash)
            .execute(&mut *tx)
            .await?;
            sqlx::query(
                "DELETE FROM ethscan.receipts WHERE tx_hash IN \
                 (SELECT tx_hash FROM ethscan.transactions WHERE block_hash = $1)",
            )
            .bind(&block_hash)
            .execute(&mut *tx)
            .await?;
            let orphaned = sqlx::query("DELETE FROM ethscan.transactions WHERE block_hash = $1")
                .bind(&block_hash)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            debug!(
                target: "storage",
                block_number = number,
                %block_hash,
                orphaned,
                "Deleted block and its transactions"
            );
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_block_stable(&self, number: u64, stable: bool) -> Result<(), StorageError> {
        let updated = sqlx::query("UPDATE ethscan.blocks SET stable = $2 WHERE block_num = $1")
            .bind(to_i64(number, "block_num")?)
            .bind(stable)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(StorageError::EntryNotFound(format!("block {number}")));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionStorageReader for PostgresStore {
    async fn transaction_by_hash(
        &self,
        tx_hash: B256,
    ) -> Result<Option<Transaction>, StorageError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT block_hash, tx_hash, tx_index, tx_from, tx_to, nonce, tx_data, tx_value \
             FROM ethscan.transactions WHERE tx_hash = $1",
        )
        .bind(hash_key(tx_hash))
        .fetch_optional(&self.pool)
        .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn tx_hashes_by_block_hash(&self, block_hash: B256) -> Result<Vec<B256>, StorageError> {
        let hashes: Vec<String> = sqlx::query_scalar(
            "SELECT tx_hash FROM ethscan.transactions WHERE block_hash = $1 ORDER BY tx_index",
        )
        .bind(hash_key(block_hash))
        .fetch_all(&self.pool)
        .await?;
        hashes
            .iter()
            .map(|hash| {
                hash.parse::<B256>().map_err(|err| StorageError::Decode {
                    field: "tx_hash",
                    reason: err.to_string(),
                })
            })
            .collect()
    }

    async fn logs_by_tx_hash(&self, tx_hash: B256) -> Result<Vec<TransactionLog>, StorageError> {
        let rows = sqlx::query_as::<_, LogRow>(
            "SELECT tx_hash, log_index, log_data FROM ethscan.transaction_logs \
             WHERE tx_hash = $1 ORDER BY log_index",
        )
        .bind(hash_key(tx_hash))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TransactionLog::try_from).collect()
    }
}

#[async_trait]
impl TransactionStorageWriter for PostgresStore {
    async fn create_transaction(&self, transaction: &Transaction) -> Result<(), StorageError> {
        // Share-locks the block row so a concurrent cascade delete cannot interleave.
        let stored = sqlx::query(
            "INSERT INTO ethscan.transactions \
             (block_hash, tx_hash, tx_index, tx_from, tx_to, nonce, tx_data, tx_value) \
             SELECT $1, $2, $3, $4, $5, $6, $7, $8 \
             WHERE EXISTS \
             (SELECT 1 FROM ethscan.blocks WHERE block_hash = $1 FOR SHARE) \
             ON CONFLICT (tx_hash) DO UPDATE \
             SET block_hash = EXCLUDED.block_hash, tx_index = EXCLUDED.tx_index",
        )
        .bind(hash_key(transaction.block_hash))
        .bind(hash_key(transaction.tx_hash))
        .bind(to_i64(transaction.index, "tx_index")?)
        .bind(transaction.from.to_string())
        .bind(transaction.to.to_string())
        .bind(to_i64(transaction.nonce, "nonce")?)
        .bind(transaction.data.to_vec())
        .bind(value_key(transaction.value))
        .execute(&self.pool)
        .await?
        .rows_affected();
        if stored == 0 {
            return Err(StorageError::EntryNotFound(format!("block {}", transaction.block_hash)));
        }
        Ok(())
    }

    async fn save_receipt_and_logs(
        &self,
        tx_hash: B256,
        logs: &[TransactionLog],
    ) -> Result<(), StorageError> {
        let tx_key = hash_key(tx_hash);
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM ethscan.transactions WHERE tx_hash = $1 FOR SHARE",
        )
        .bind(&tx_key)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Err(StorageError::EntryNotFound(format!("transaction {tx_hash}")));
        }

        sqlx::query("INSERT INTO ethscan.receipts (tx_hash) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(&tx_key)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM ethscan.transaction_logs WHERE tx_hash = $1")
            .bind(&tx_key)
            .execute(&mut *tx)
            .await?;

        for log in logs {
            sqlx::query(
                "INSERT INTO ethscan.transaction_logs (tx_hash, log_index, log_data) \
                 VALUES ($1, $2, $3)",
            )
            .bind(&tx_key)
            .bind(to_i64(log.log_index, "log_index")?)
            .bind(log.data.to_vec())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
