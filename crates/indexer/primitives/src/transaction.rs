//! Transaction and log records.

use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Recipient stored for contract creation transactions, which have no `to`.
pub const CONTRACT_CREATION_RECIPIENT: Address = Address::ZERO;

/// A transaction mirrored from a block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transaction {
    /// Hash of the block that contained the transaction when it was ingested.
    pub block_hash: B256,
    /// The transaction hash.
    pub tx_hash: B256,
    /// Position of the transaction within its block.
    pub index: u64,
    /// The recovered sender.
    pub from: Address,
    /// The recipient, or [`CONTRACT_CREATION_RECIPIENT`] for contract creation.
    pub to: Address,
    /// The sender nonce.
    pub nonce: u64,
    /// The raw input payload.
    pub data: Bytes,
    /// The transferred value in wei.
    pub value: U256,
}

impl Transaction {
    /// Returns true if the transaction was stored with the contract creation placeholder.
    pub fn is_contract_creation(&self) -> bool {
        self.to == CONTRACT_CREATION_RECIPIENT
    }
}

/// A single log emitted by a transaction, as stored with its receipt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionLog {
    /// Hash of the emitting transaction.
    pub tx_hash: B256,
    /// Index of the log within its block.
    pub log_index: u64,
    /// Opaque log data.
    pub data: Bytes,
}

/// A transaction together with its stored logs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionWithLogs {
    /// The transaction record.
    pub transaction: Transaction,
    /// Logs ordered by log index. Empty if no receipt was stored.
    pub logs: Vec<TransactionLog>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_contract_creation_placeholder() {
        let tx = Transaction { to: CONTRACT_CREATION_RECIPIENT, ..Default::default() };
        assert!(tx.is_contract_creation());
        assert_eq!(
            CONTRACT_CREATION_RECIPIENT.to_string(),
            "0x0000000000000000000000000000000000000000"
        );

        let call = Transaction {
            to: address!("0123456789012345678901234567890123456789"),
            ..Default::default()
        };
        assert!(!call.is_contract_creation());
    }

    #[test]
    fn test_value_survives_json_without_precision_loss() {
        let tx = Transaction { value: U256::MAX, ..Default::default() };
        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value, U256::MAX);
    }
}
