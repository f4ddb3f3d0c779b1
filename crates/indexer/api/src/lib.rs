#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::ApiError;

mod response;
pub use response::{
    BlockDetailResponse, BlockListResponse, BlockResponse, ErrorResponse, LogResponse,
    TransactionResponse,
};

mod routes;
pub use routes::{ListParams, router};

mod server;
pub use server::{ApiServer, ServerError};
