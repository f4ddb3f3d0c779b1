use crate::{ChainBlock, ChainClientError, ChainReceipt};
use alloy_eips::BlockNumHash;
use alloy_primitives::B256;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt::Debug;

/// Point reads against the chain.
///
/// The main reason this trait exists is to swap the RPC-backed client for an
/// in-process chain in tests.
#[async_trait]
pub trait ChainClient: Debug + Send + Sync + 'static {
    /// Returns the number and hash of the current canonical head.
    async fn head_of_chain(&self) -> Result<BlockNumHash, ChainClientError>;

    /// Fetches the canonical block at `number` with full transactions.
    ///
    /// Returns `Ok(None)` if the chain has no block at that number yet.
    async fn block_by_number(&self, number: u64) -> Result<Option<ChainBlock>, ChainClientError>;

    /// Fetches the receipt of `tx_hash`.
    ///
    /// Returns `Ok(None)` if the node does not know the transaction.
    async fn transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> Result<Option<ChainReceipt>, ChainClientError>;
}

/// A stream of new canonical heads.
pub type HeadStream = BoxStream<'static, Result<BlockNumHash, ChainClientError>>;

/// Push notifications of new heads.
#[async_trait]
pub trait HeadSubscriber: Debug + Send + Sync + 'static {
    /// Opens a new head subscription.
    ///
    /// The stream ends when the underlying subscription is dropped by the node.
    async fn subscribe_new_heads(&self) -> Result<HeadStream, ChainClientError>;
}
