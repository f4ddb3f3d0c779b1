//! JSON bodies served by the API.

use alloy_primitives::{Address, B256, Bytes};
use ethscan_primitives::{Block, BlockWithTransactions, TransactionLog, TransactionWithLogs};
use serde::Serialize;

/// A block as listed by `GET /blocks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockResponse {
    /// Block number.
    pub block_num: u64,
    /// Block hash.
    pub block_hash: B256,
    /// Unix timestamp in seconds.
    pub block_time: u64,
    /// Parent block hash.
    pub parent_hash: B256,
    /// Whether the block is deep enough to be considered final.
    pub stable: bool,
}

impl From<Block> for BlockResponse {
    fn from(block: Block) -> Self {
        Self {
            block_num: block.number,
            block_hash: block.hash,
            block_time: block.timestamp,
            parent_hash: block.parent_hash,
            stable: block.stable,
        }
    }
}

/// Body of `GET /blocks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockListResponse {
    /// Blocks, most recent first.
    pub blocks: Vec<BlockResponse>,
}

/// Body of `GET /blocks/{number}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockDetailResponse {
    /// The block.
    #[serde(flatten)]
    pub block: BlockResponse,
    /// Hashes of the block's transactions in block order.
    pub transactions: Vec<B256>,
}

impl From<BlockWithTransactions> for BlockDetailResponse {
    fn from(found: BlockWithTransactions) -> Self {
        Self { block: found.block.into(), transactions: found.transactions }
    }
}

/// A receipt log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogResponse {
    /// Position of the log in the block.
    pub index: u64,
    /// Raw log data.
    pub data: Bytes,
}

impl From<TransactionLog> for LogResponse {
    fn from(log: TransactionLog) -> Self {
        Self { index: log.log_index, data: log.data }
    }
}

/// Body of `GET /transaction/{hash}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionResponse {
    /// Transaction hash.
    pub tx_hash: B256,
    /// Sender.
    pub from: Address,
    /// Recipient, or the zero address for contract creation.
    pub to: Address,
    /// Sender nonce.
    pub nonce: u64,
    /// Call data.
    pub data: Bytes,
    /// Transferred wei as a decimal string.
    pub value: String,
    /// Receipt logs, ordered by index.
    pub logs: Vec<LogResponse>,
}

impl From<TransactionWithLogs> for TransactionResponse {
    fn from(found: TransactionWithLogs) -> Self {
        let TransactionWithLogs { transaction, logs } = found;
        Self {
            tx_hash: transaction.tx_hash,
            from: transaction.from,
            to: transaction.to,
            nonce: transaction.nonce,
            data: transaction.data,
            value: transaction.value.to_string(),
            logs: logs.into_iter().map(Into::into).collect(),
        }
    }
}

/// Body of a not-found response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// Stable numeric error code.
    pub err_code: u32,
    /// Human readable message.
    pub err_msg: &'static str,
}

impl ErrorResponse {
    /// The requested block is not stored.
    pub const BLOCK_NOT_EXIST: Self = Self { err_code: 1001, err_msg: "block not exist" };
    /// The requested transaction is not stored.
    pub const TRANSACTION_NOT_EXIST: Self =
        Self { err_code: 2001, err_msg: "transaction not exist" };
}
