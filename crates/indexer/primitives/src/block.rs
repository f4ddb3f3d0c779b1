//! Block records as persisted by the indexer.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// A block header as mirrored into the store.
///
/// A block number identifies a row at any instant, but the same number may be
/// associated with different hashes over time when the chain reorganizes. The
/// `stable` flag separates provisional rows from rows that have been confirmed
/// past the configured depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Block {
    /// The block number.
    pub number: u64,
    /// The hash of this block instance.
    pub hash: B256,
    /// The hash of the preceding block.
    pub parent_hash: B256,
    /// Production time reported by the chain, in seconds since the epoch.
    pub timestamp: u64,
    /// Whether the block has been confirmed past the confirmation depth.
    pub stable: bool,
}

/// A block together with the hashes of the transactions it contains.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockWithTransactions {
    /// The block record.
    pub block: Block,
    /// Hashes of the transactions stored under the block hash, in storage order.
    pub transactions: Vec<B256>,
}

