#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod block;
pub use block::{Block, BlockWithTransactions};

mod transaction;
pub use transaction::{
    CONTRACT_CREATION_RECIPIENT, Transaction, TransactionLog, TransactionWithLogs,
};
