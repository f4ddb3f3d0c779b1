use alloy_consensus::TxEnvelope;
use alloy_eips::BlockNumHash;
use alloy_primitives::B256;
use ethscan_primitives::{Block, TransactionLog};

/// A block fetched from the chain with its full transaction bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBlock {
    /// Block number.
    pub number: u64,
    /// Block hash.
    pub hash: B256,
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Transactions in block order.
    pub transactions: Vec<ChainTransaction>,
}

impl ChainBlock {
    /// Returns the block's number and hash.
    pub const fn id(&self) -> BlockNumHash {
        BlockNumHash { number: self.number, hash: self.hash }
    }

    /// Builds the storage record for this block.
    pub const fn to_record(&self, stable: bool) -> Block {
        Block {
            number: self.number,
            hash: self.hash,
            parent_hash: self.parent_hash,
            timestamp: self.timestamp,
            stable,
        }
    }
}

/// A signed transaction as included in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    /// Transaction hash.
    pub hash: B256,
    /// Position within the block.
    pub index: u64,
    /// The signed transaction.
    pub envelope: TxEnvelope,
}

/// The parts of a transaction receipt the indexer keeps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChainReceipt {
    /// Hash of the transaction the receipt belongs to.
    pub tx_hash: B256,
    /// Emitted logs, ordered by log index.
    pub logs: Vec<TransactionLog>,
}
