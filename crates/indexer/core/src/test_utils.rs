//! Test utilities for the synchronization engine.

use crate::{
    ChainBlock, ChainClient, ChainClientError, ChainReceipt, ChainTransaction, HeadStream,
    HeadSubscriber,
};
use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_eips::BlockNumHash;
use alloy_primitives::{Address, B256, Bytes, Signature, TxKind, U256};
use alloy_transport::TransportErrorKind;
use async_trait::async_trait;
use futures::{StreamExt, stream};
use std::{
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    ops::RangeInclusive,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

/// Deterministic hash of the block at `number` on branch `fork`.
pub fn test_block_hash(number: u64, fork: u8) -> B256 {
    let mut hash = B256::ZERO;
    hash[0] = fork.wrapping_add(1);
    hash[24..].copy_from_slice(&number.to_be_bytes());
    hash
}

/// Builds a block on branch `fork`. Transaction indexes are reassigned by position.
pub fn test_block(number: u64, fork: u8, transactions: Vec<ChainTransaction>) -> ChainBlock {
    let transactions = transactions
        .into_iter()
        .enumerate()
        .map(|(index, tx)| ChainTransaction { index: index as u64, ..tx })
        .collect();
    ChainBlock {
        number,
        hash: test_block_hash(number, fork),
        parent_hash: test_block_hash(number.saturating_sub(1), fork),
        timestamp: 1_600_000_000 + number * 12,
        transactions,
    }
}

/// Builds a signed legacy transaction. `to = None` creates a contract.
pub fn test_transaction(nonce: u64, to: Option<Address>) -> ChainTransaction {
    let tx = TxLegacy {
        nonce,
        to: to.map_or(TxKind::Create, TxKind::Call),
        value: U256::from(1_000_000_000_000_000_000u128) * U256::from(nonce + 1),
        input: Bytes::from(vec![0xca, 0xfe, nonce as u8]),
        gas_limit: 21_000,
        gas_price: 1_000_000_000,
        ..Default::default()
    };
    sign(tx, Signature::test_signature())
}

/// Builds a transaction whose signature cannot be recovered.
pub fn test_unrecoverable_transaction(nonce: u64) -> ChainTransaction {
    let tx = TxLegacy { nonce, to: TxKind::Call(Address::repeat_byte(1)), ..Default::default() };
    sign(tx, Signature::new(U256::ZERO, U256::ZERO, false))
}

fn sign(tx: TxLegacy, signature: Signature) -> ChainTransaction {
    let envelope = TxEnvelope::from(tx.into_signed(signature));
    ChainTransaction { hash: *envelope.tx_hash(), index: 0, envelope }
}

#[derive(Debug, Default)]
struct ChainState {
    blocks: BTreeMap<u64, ChainBlock>,
    receipts: HashMap<B256, ChainReceipt>,
    failing_blocks: HashSet<u64>,
    fail_receipts: bool,
    fetch_delay: Duration,
    receipt_delay: Duration,
    subscriptions: VecDeque<Option<Vec<Option<u64>>>>,
    subscribe_calls: usize,
    fetches: HashMap<u64, usize>,
    in_flight: HashMap<u64, usize>,
    in_flight_total: usize,
    peak_in_flight: usize,
    overlapping_fetches: usize,
}

/// An in-process chain implementing [`ChainClient`] and [`HeadSubscriber`].
///
/// Clones share state, so a test can keep a handle while the engine owns another.
/// Block fetches record how many run concurrently and whether two fetches of the
/// same number ever overlap.
#[derive(Debug, Clone, Default)]
pub struct TestChainClient {
    state: Arc<Mutex<ChainState>>,
}

impl TestChainClient {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a chain holding empty canonical blocks for `range`.
    pub fn with_blocks(range: RangeInclusive<u64>) -> Self {
        let client = Self::new();
        for number in range {
            client.insert_block(test_block(number, 0, Vec::new()));
        }
        client
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces the canonical block at its number.
    pub fn insert_block(&self, block: ChainBlock) {
        self.state().blocks.insert(block.number, block);
    }

    /// Replaces the block at `number` with an empty block on branch `fork`.
    pub fn reorg(&self, number: u64, fork: u8) {
        self.insert_block(test_block(number, fork, Vec::new()));
    }

    /// Registers the receipt returned for its transaction.
    pub fn insert_receipt(&self, receipt: ChainReceipt) {
        self.state().receipts.insert(receipt.tx_hash, receipt);
    }

    /// Makes fetches of `number` fail.
    pub fn fail_block(&self, number: u64) {
        self.state().failing_blocks.insert(number);
    }

    /// Makes every receipt fetch fail.
    pub fn set_fail_receipts(&self, fail: bool) {
        self.state().fail_receipts = fail;
    }

    /// Delays every block fetch by `delay`.
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.state().fetch_delay = delay;
    }

    /// Delays every receipt fetch by `delay`.
    pub fn set_receipt_delay(&self, delay: Duration) {
        self.state().receipt_delay = delay;
    }

    /// Queues a subscription that yields `heads` and then ends.
    pub fn push_subscription(&self, heads: Vec<u64>) {
        self.push_subscription_items(heads.into_iter().map(Some).collect());
    }

    /// Queues a subscription yielding `items` and then ending. `None` yields an
    /// error item in place of a head.
    pub fn push_subscription_items(&self, items: Vec<Option<u64>>) {
        self.state().subscriptions.push_back(Some(items));
    }

    /// Queues a failed subscription attempt.
    pub fn push_subscribe_failure(&self) {
        self.state().subscriptions.push_back(None);
    }

    /// Number of subscription attempts so far.
    pub fn subscribe_calls(&self) -> usize {
        self.state().subscribe_calls
    }

    /// Number of times `number` was fetched.
    pub fn fetch_count(&self, number: u64) -> usize {
        self.state().fetches.get(&number).copied().unwrap_or_default()
    }

    /// Largest number of block fetches observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.state().peak_in_flight
    }

    /// Number of fetches that started while another fetch of the same number ran.
    pub fn overlapping_fetches(&self) -> usize {
        self.state().overlapping_fetches
    }
}

#[async_trait]
impl ChainClient for TestChainClient {
    async fn head_of_chain(&self) -> Result<BlockNumHash, ChainClientError> {
        self.state()
            .blocks
            .last_key_value()
            .map(|(_, block)| block.id())
            .ok_or_else(|| TransportErrorKind::custom_str("empty chain").into())
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<ChainBlock>, ChainClientError> {
        let (delay, fail) = {
            let mut guard = self.state();
            let state = &mut *guard;
            *state.fetches.entry(number).or_default() += 1;
            let running = state.in_flight.entry(number).or_default();
            *running += 1;
            if *running > 1 {
                state.overlapping_fetches += 1;
            }
            state.in_flight_total += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight_total);
            (state.fetch_delay, state.failing_blocks.contains(&number))
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut guard = self.state();
        let state = &mut *guard;
        state.in_flight_total -= 1;
        if let Some(running) = state.in_flight.get_mut(&number) {
            *running -= 1;
        }
        if fail {
            return Err(ChainClientError::Timeout("eth_getBlockByNumber"));
        }
        Ok(state.blocks.get(&number).cloned())
    }

    async fn transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> Result<Option<ChainReceipt>, ChainClientError> {
        let delay = self.state().receipt_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if state.fail_receipts {
            return Err(ChainClientError::Timeout("eth_getTransactionReceipt"));
        }
        Ok(state.receipts.get(&tx_hash).cloned())
    }
}

#[async_trait]
impl HeadSubscriber for TestChainClient {
    async fn subscribe_new_heads(&self) -> Result<HeadStream, ChainClientError> {
        let mut state = self.state();
        state.subscribe_calls += 1;
        match state.subscriptions.pop_front() {
            Some(Some(items)) => Ok(stream::iter(items.into_iter().map(|item| match item {
                Some(number) => Ok(BlockNumHash::new(number, test_block_hash(number, 0))),
                None => Err(ChainClientError::Subscription("malformed header".to_string())),
            }))
            .boxed()),
            Some(None) => Err(ChainClientError::Subscription("connection refused".to_string())),
            None => Ok(stream::pending().boxed()),
        }
    }
}
