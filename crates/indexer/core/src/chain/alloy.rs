//! [`ChainClient`] and [`HeadSubscriber`] backed by `alloy-provider`.

use crate::{
    ChainBlock, ChainClient, ChainClientError, ChainReceipt, ChainTransaction, HeadStream,
    HeadSubscriber,
};
use alloy_eips::{BlockNumHash, BlockNumberOrTag};
use alloy_primitives::B256;
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types_eth::{Block, BlockTransactions, TransactionReceipt};
use alloy_transport::{TransportError, TransportErrorKind};
use async_trait::async_trait;
use ethscan_primitives::TransactionLog;
use futures::StreamExt;
use std::{future::IntoFuture, time::Duration};
use tracing::{debug, info};
use url::Url;

/// Default per-request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Builder for an [`AlloyChainClient`].
#[derive(Debug, Clone)]
pub struct AlloyChainClientBuilder {
    /// HTTP endpoint used for point reads.
    pub rpc_url: Url,
    /// WebSocket endpoint used for head subscriptions.
    pub ws_url: Url,
    /// Upper bound on every outbound call.
    pub timeout: Duration,
}

impl AlloyChainClientBuilder {
    /// Creates a builder with the default request timeout.
    pub const fn new(rpc_url: Url, ws_url: Url) -> Self {
        Self { rpc_url, ws_url, timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS) }
    }

    /// Sets the per-request timeout.
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client. No connection is made until the first request.
    pub fn build(self) -> AlloyChainClient {
        AlloyChainClient {
            provider: RootProvider::new_http(self.rpc_url),
            ws_url: self.ws_url,
            timeout: self.timeout,
        }
    }
}

/// A chain client reading over HTTP and subscribing over WebSocket.
#[derive(Debug, Clone)]
pub struct AlloyChainClient {
    provider: RootProvider,
    ws_url: Url,
    timeout: Duration,
}

impl AlloyChainClient {
    async fn call<T, F>(&self, method: &'static str, request: F) -> Result<T, ChainClientError>
    where
        F: IntoFuture<Output = Result<T, TransportError>>,
    {
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ChainClientError::Timeout(method))?
            .map_err(Into::into)
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn head_of_chain(&self) -> Result<BlockNumHash, ChainClientError> {
        let block = self
            .call("eth_getBlockByNumber", self.provider.get_block_by_number(BlockNumberOrTag::Latest))
            .await?
            .ok_or_else(|| TransportErrorKind::custom_str("latest block unavailable"))?;
        Ok(BlockNumHash::new(block.header.number, block.header.hash))
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<ChainBlock>, ChainClientError> {
        let block = self
            .call(
                "eth_getBlockByNumber",
                self.provider.get_block_by_number(BlockNumberOrTag::Number(number)).full(),
            )
            .await?;
        block.map(into_chain_block).transpose()
    }

    async fn transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> Result<Option<ChainReceipt>, ChainClientError> {
        let receipt = self
            .call("eth_getTransactionReceipt", self.provider.get_transaction_receipt(tx_hash))
            .await?;
        Ok(receipt.map(|receipt| into_chain_receipt(tx_hash, &receipt)))
    }
}

#[async_trait]
impl HeadSubscriber for AlloyChainClient {
    async fn subscribe_new_heads(&self) -> Result<HeadStream, ChainClientError> {
        let connect = RootProvider::connect(self.ws_url.as_str());
        let provider: RootProvider = tokio::time::timeout(self.timeout, connect)
            .await
            .map_err(|_| ChainClientError::Timeout("connect"))?
            .map_err(|err| ChainClientError::Connect {
                url: self.ws_url.to_string(),
                reason: err.to_string(),
            })?;

        let subscription = self.call("eth_subscribe", provider.subscribe_blocks()).await?;
        info!(target: "subscriber", url = %self.ws_url, "Subscribed to new heads");

        // The stream owns the provider so the socket lives as long as the subscription.
        let stream = subscription.into_stream().map(move |header| {
            let _ = &provider;
            debug!(target: "subscriber", number = header.number, hash = %header.hash, "New head");
            Ok(BlockNumHash::new(header.number, header.hash))
        });
        Ok(stream.boxed())
    }
}

fn into_chain_block(block: Block) -> Result<ChainBlock, ChainClientError> {
    let number = block.header.number;
    let transactions = match block.transactions {
        BlockTransactions::Full(transactions) => transactions,
        BlockTransactions::Hashes(hashes) if hashes.is_empty() => Vec::new(),
        _ => return Err(ChainClientError::MissingTransactions(number)),
    };

    let transactions = transactions
        .into_iter()
        .enumerate()
        .map(|(position, tx)| {
            let index = tx.transaction_index.unwrap_or(position as u64);
            let envelope = tx.inner.into_inner();
            ChainTransaction { hash: *envelope.tx_hash(), index, envelope }
        })
        .collect();

    Ok(ChainBlock {
        number,
        hash: block.header.hash,
        parent_hash: block.header.parent_hash,
        timestamp: block.header.timestamp,
        transactions,
    })
}

fn into_chain_receipt(tx_hash: B256, receipt: &TransactionReceipt) -> ChainReceipt {
    let logs = receipt
        .inner
        .logs()
        .iter()
        .enumerate()
        .map(|(position, log)| TransactionLog {
            tx_hash,
            log_index: log.log_index.unwrap_or(position as u64),
            data: log.inner.data.data.clone(),
        })
        .collect();
    ChainReceipt { tx_hash, logs }
}
