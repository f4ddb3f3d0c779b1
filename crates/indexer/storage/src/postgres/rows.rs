//! Row types and conversions between the relational schema and domain records.

use crate::StorageError;
use alloy_primitives::{Address, B256, Bytes, U256};
use ethscan_primitives::{Block, Transaction, TransactionLog};
use sqlx::FromRow;
use std::str::FromStr;

#[derive(Debug, FromRow)]
pub(super) struct BlockRow {
    pub(super) block_num: i64,
    pub(super) block_hash: String,
    pub(super) block_time: i64,
    pub(super) parent_hash: String,
    pub(super) stable: bool,
}

impl TryFrom<BlockRow> for Block {
    type Error = StorageError;

    fn try_from(row: BlockRow) -> Result<Self, Self::Error> {
        Ok(Self {
            number: to_u64(row.block_num, "block_num")?,
            hash: parse(&row.block_hash, "block_hash")?,
            parent_hash: parse(&row.parent_hash, "parent_hash")?,
            timestamp: to_u64(row.block_time, "block_time")?,
            stable: row.stable,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct TransactionRow {
    pub(super) block_hash: String,
    pub(super) tx_hash: String,
    pub(super) tx_index: i64,
    pub(super) tx_from: String,
    pub(super) tx_to: String,
    pub(super) nonce: i64,
    pub(super) tx_data: Vec<u8>,
    pub(super) tx_value: String,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StorageError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            block_hash: parse(&row.block_hash, "block_hash")?,
            tx_hash: parse(&row.tx_hash, "tx_hash")?,
            index: to_u64(row.tx_index, "tx_index")?,
            from: parse::<Address>(&row.tx_from, "tx_from")?,
            to: parse::<Address>(&row.tx_to, "tx_to")?,
            nonce: to_u64(row.nonce, "nonce")?,
            data: Bytes::from(row.tx_data),
            value: U256::from_str_radix(&row.tx_value, 10).map_err(|err| {
                StorageError::Decode { field: "tx_value", reason: err.to_string() }
            })?,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct LogRow {
    pub(super) tx_hash: String,
    pub(super) log_index: i64,
    pub(super) log_data: Vec<u8>,
}

impl TryFrom<LogRow> for TransactionLog {
    type Error = StorageError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            tx_hash: parse(&row.tx_hash, "tx_hash")?,
            log_index: to_u64(row.log_index, "log_index")?,
            data: Bytes::from(row.log_data),
        })
    }
}

/// Converts an unsigned value into the signed column type used by Postgres.
pub(super) fn to_i64(value: u64, field: &'static str) -> Result<i64, StorageError> {
    i64::try_from(value)
        .map_err(|err| StorageError::Decode { field, reason: format!("{value}: {err}") })
}

fn to_u64(value: i64, field: &'static str) -> Result<u64, StorageError> {
    u64::try_from(value)
        .map_err(|err| StorageError::Decode { field, reason: format!("{value}: {err}") })
}

fn parse<T>(value: &str, field: &'static str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|err: T::Err| StorageError::Decode { field, reason: err.to_string() })
}

/// Formats a hash the way it is stored: `0x`-prefixed lowercase hex.
pub(super) fn hash_key(hash: B256) -> String {
    hash.to_string()
}

/// Formats a wei amount the way it is stored: a decimal string.
pub(super) fn value_key(value: U256) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_block_row_conversion() {
        let row = BlockRow {
            block_num: 100,
            block_hash: hash_key(B256::repeat_byte(0xab)),
            block_time: 1_650_000_000,
            parent_hash: hash_key(B256::repeat_byte(0xaa)),
            stable: true,
        };
        let block = Block::try_from(row).unwrap();
        assert_eq!(block.number, 100);
        assert_eq!(block.hash, B256::repeat_byte(0xab));
        assert_eq!(block.parent_hash, B256::repeat_byte(0xaa));
        assert!(block.stable);
    }

    #[test]
    fn test_block_row_rejects_negative_number() {
        let row = BlockRow {
            block_num: -1,
            block_hash: hash_key(B256::ZERO),
            block_time: 0,
            parent_hash: hash_key(B256::ZERO),
            stable: false,
        };
        assert!(matches!(
            Block::try_from(row),
            Err(StorageError::Decode { field: "block_num", .. })
        ));
    }

    #[test]
    fn test_transaction_row_decimal_value() {
        let row = TransactionRow {
            block_hash: hash_key(B256::repeat_byte(1)),
            tx_hash: hash_key(B256::repeat_byte(2)),
            tx_index: 3,
            tx_from: address!("0123456789012345678901234567890123456789").to_string(),
            tx_to: Address::ZERO.to_string(),
            nonce: 9,
            tx_data: vec![0xde, 0xad],
            tx_value: "340282366920938463463374607431768211456".to_string(),
        };
        let tx = Transaction::try_from(row).unwrap();
        assert_eq!(tx.value, U256::from(1u8) << 128);
        assert!(tx.is_contract_creation());
        assert_eq!(tx.data, Bytes::from_static(&[0xde, 0xad]));
        assert_eq!(value_key(tx.value), "340282366920938463463374607431768211456");
    }

    #[test]
    fn test_transaction_row_rejects_hex_value() {
        let row = TransactionRow {
            block_hash: hash_key(B256::ZERO),
            tx_hash: hash_key(B256::ZERO),
            tx_index: 0,
            tx_from: Address::ZERO.to_string(),
            tx_to: Address::ZERO.to_string(),
            nonce: 0,
            tx_data: vec![],
            tx_value: "0xzz".to_string(),
        };
        assert!(matches!(
            Transaction::try_from(row),
            Err(StorageError::Decode { field: "tx_value", .. })
        ));
    }

    #[test]
    fn test_to_i64_overflow() {
        assert_eq!(to_i64(5, "nonce").unwrap(), 5);
        assert!(to_i64(u64::MAX, "nonce").is_err());
    }
}
