//! Transaction and receipt ingestion.

use crate::{ChainClient, ChainTransaction, IngestError, Metrics};
use alloy_consensus::{Transaction as _, transaction::SignerRecoverable};
use alloy_primitives::{B256, TxKind};
use ethscan_primitives::{CONTRACT_CREATION_RECIPIENT, Transaction};
use ethscan_storage::TransactionStorageWriter;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Persists transactions and, in the background, their receipt logs.
#[derive(Debug)]
pub struct TransactionIngestor<C, S> {
    chain: Arc<C>,
    storage: Arc<S>,
    receipts: TaskTracker,
}

impl<C, S> Clone for TransactionIngestor<C, S> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            storage: self.storage.clone(),
            receipts: self.receipts.clone(),
        }
    }
}

impl<C, S> TransactionIngestor<C, S>
where
    C: ChainClient,
    S: TransactionStorageWriter + 'static,
{
    /// Creates an ingestor writing to `storage`.
    pub fn new(chain: Arc<C>, storage: Arc<S>) -> Self {
        Self { chain, storage, receipts: TaskTracker::new() }
    }

    /// Stores `tx` under `block_hash` and schedules its receipt.
    ///
    /// The receipt task is detached: its failures are logged and counted but
    /// never reach the caller, and it is not retried.
    pub async fn ingest(
        &self,
        block_hash: B256,
        tx: ChainTransaction,
    ) -> Result<Transaction, IngestError> {
        let transaction = to_record(block_hash, &tx)?;
        self.storage.create_transaction(&transaction).await?;
        metrics::counter!(Metrics::TRANSACTIONS_STORED_TOTAL).increment(1);
        debug!(
            target: "ingestor",
            tx_hash = %transaction.tx_hash,
            contract_creation = transaction.is_contract_creation(),
            "Stored transaction"
        );

        let chain = self.chain.clone();
        let storage = self.storage.clone();
        let tx_hash = transaction.tx_hash;
        self.receipts.spawn(async move {
            match save_receipt(chain.as_ref(), storage.as_ref(), tx_hash).await {
                Ok(0) => {}
                Ok(logs) => {
                    metrics::counter!(Metrics::RECEIPTS_STORED_TOTAL).increment(1);
                    debug!(target: "ingestor", %tx_hash, logs, "Stored receipt logs");
                }
                Err(IngestError::Storage(err)) if err.is_not_found() => {
                    debug!(
                        target: "ingestor",
                        %tx_hash,
                        "Transaction removed before its receipt was stored"
                    );
                }
                Err(err) => {
                    metrics::counter!(Metrics::RECEIPT_ERRORS_TOTAL).increment(1);
                    warn!(target: "ingestor", %tx_hash, %err, "Failed to store receipt");
                }
            }
        });

        Ok(transaction)
    }

    /// Waits until every scheduled receipt task has finished.
    pub async fn wait_for_receipts(&self) {
        self.receipts.close();
        self.receipts.wait().await;
        self.receipts.reopen();
    }
}

/// Builds the storage record for `tx`, recovering its sender.
fn to_record(block_hash: B256, tx: &ChainTransaction) -> Result<Transaction, IngestError> {
    let from = tx.envelope.recover_signer().map_err(|err| IngestError::SignerRecovery {
        tx_hash: tx.hash,
        reason: err.to_string(),
    })?;
    let to = match tx.envelope.kind() {
        TxKind::Call(to) => to,
        TxKind::Create => CONTRACT_CREATION_RECIPIENT,
    };

    Ok(Transaction {
        block_hash,
        tx_hash: tx.hash,
        index: tx.index,
        from,
        to,
        nonce: tx.envelope.nonce(),
        data: tx.envelope.input().clone(),
        value: tx.envelope.value(),
    })
}

/// Fetches the receipt of `tx_hash` and stores it with its logs.
///
/// Receipts without logs are not stored. Returns the number of logs written.
async fn save_receipt<C, S>(chain: &C, storage: &S, tx_hash: B256) -> Result<usize, IngestError>
where
    C: ChainClient,
    S: TransactionStorageWriter,
{
    let Some(receipt) = chain.transaction_receipt(tx_hash).await? else {
        debug!(target: "ingestor", %tx_hash, "Receipt not available");
        return Ok(0);
    };
    if receipt.logs.is_empty() {
        return Ok(0);
    }
    storage.save_receipt_and_logs(tx_hash, &receipt.logs).await?;
    Ok(receipt.logs.len())
}
