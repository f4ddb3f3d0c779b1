//! Access to the chain being indexed.

mod types;
pub use types::{ChainBlock, ChainReceipt, ChainTransaction};

mod traits;
pub use traits::{ChainClient, HeadStream, HeadSubscriber};

mod alloy;
pub use alloy::{AlloyChainClient, AlloyChainClientBuilder};
