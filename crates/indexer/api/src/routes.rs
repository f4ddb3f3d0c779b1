//! Route handlers.

use crate::{ApiError, BlockDetailResponse, BlockListResponse, TransactionResponse};
use alloy_primitives::B256;
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    routing::get,
};
use ethscan_core::QueryService;
use ethscan_storage::{BlockStorageReader, TransactionStorageReader};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Query string of `GET /blocks`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Requested page size. Zero or absent means the default.
    pub limit: Option<usize>,
}

/// Builds the API router over `query`.
pub fn router<S>(query: QueryService<S>) -> Router
where
    S: BlockStorageReader + TransactionStorageReader + 'static,
{
    Router::new()
        .route("/blocks", get(list_blocks::<S>))
        .route("/blocks/{number}", get(block_by_number::<S>))
        .route("/transaction/{hash}", get(transaction_by_hash::<S>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(query)
}

async fn list_blocks<S>(
    State(query): State<QueryService<S>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<BlockListResponse>, ApiError>
where
    S: BlockStorageReader + TransactionStorageReader + 'static,
{
    let Query(params) = params?;
    let blocks = query.list(params.limit.unwrap_or_default()).await?;
    Ok(Json(BlockListResponse { blocks: blocks.into_iter().map(Into::into).collect() }))
}

async fn block_by_number<S>(
    State(query): State<QueryService<S>>,
    Path(number): Path<String>,
) -> Result<Json<BlockDetailResponse>, ApiError>
where
    S: BlockStorageReader + TransactionStorageReader + 'static,
{
    let number = number
        .parse::<u64>()
        .map_err(|err| ApiError::BadRequest(format!("invalid block number {number:?}: {err}")))?;
    Ok(Json(query.block_by_number(number).await?.into()))
}

async fn transaction_by_hash<S>(
    State(query): State<QueryService<S>>,
    Path(hash): Path<String>,
) -> Result<Json<TransactionResponse>, ApiError>
where
    S: BlockStorageReader + TransactionStorageReader + 'static,
{
    let tx_hash = hash
        .parse::<B256>()
        .map_err(|err| ApiError::BadRequest(format!("invalid transaction hash {hash:?}: {err}")))?;
    Ok(Json(query.transaction_by_hash(tx_hash).await?.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, U256};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use ethscan_primitives::{Block, Transaction, TransactionLog};
    use ethscan_storage::{BlockStorageWriter, InMemoryStore, TransactionStorageWriter};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        for number in 1..=25u64 {
            store
                .create_block(Block {
                    number,
                    hash: B256::with_last_byte(number as u8),
                    parent_hash: B256::with_last_byte(number as u8 - 1),
                    timestamp: 1_000 + number,
                    stable: number <= 20,
                })
                .await
                .unwrap();
        }
        store
            .create_transaction(&Transaction {
                block_hash: B256::with_last_byte(3),
                tx_hash: B256::repeat_byte(0xaa),
                index: 0,
                from: Address::repeat_byte(0x11),
                to: Address::ZERO,
                nonce: 7,
                data: Bytes::from_static(&[0xde, 0xad]),
                value: U256::from(10).pow(U256::from(20)),
            })
            .await
            .unwrap();
        store
            .save_receipt_and_logs(
                B256::repeat_byte(0xaa),
                &[TransactionLog {
                    tx_hash: B256::repeat_byte(0xaa),
                    log_index: 2,
                    data: Bytes::from_static(&[1, 2]),
                }],
            )
            .await
            .unwrap();
        store
    }

    async fn get(store: &InMemoryStore, uri: &str) -> (StatusCode, Value) {
        let app = router(QueryService::new(Arc::new(store.clone())));
        let response =
            app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_list_default_limit() {
        let store = seeded_store().await;
        let (status, body) = get(&store, "/blocks").await;
        assert_eq!(status, StatusCode::OK);
        let blocks = body["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 20);
        assert_eq!(blocks[0]["block_num"], 25);
        assert_eq!(blocks[0]["stable"], false);
    }

    #[tokio::test]
    async fn test_list_limit_out_of_range() {
        let store = seeded_store().await;
        let (status, body) = get(&store, "/blocks?limit=150").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!("limit should be 0~100"));

        let (status, body) = get(&store, "/blocks?limit=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["blocks"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_limit_is_json_bad_request() {
        let store = seeded_store().await;
        for uri in ["/blocks?limit=abc", "/blocks?limit=-1"] {
            let (status, body) = get(&store, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            let message = body.as_str().unwrap();
            assert!(message.starts_with("invalid query: "), "{message}");
        }
    }

    #[tokio::test]
    async fn test_block_detail() {
        let store = seeded_store().await;
        let (status, body) = get(&store, "/blocks/3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["block_num"], 3);
        assert_eq!(body["block_hash"], json!(B256::with_last_byte(3)));
        assert_eq!(body["transactions"], json!([B256::repeat_byte(0xaa)]));
    }

    #[tokio::test]
    async fn test_block_not_found() {
        let store = seeded_store().await;
        let (status, body) = get(&store, "/blocks/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"err_code": 1001, "err_msg": "block not exist"}));
    }

    #[tokio::test]
    async fn test_invalid_block_number() {
        let store = seeded_store().await;
        let (status, _) = get(&store, "/blocks/latest").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_transaction_detail() {
        let store = seeded_store().await;
        let uri = format!("/transaction/{}", B256::repeat_byte(0xaa));
        let (status, body) = get(&store, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["to"], json!("0x0000000000000000000000000000000000000000"));
        assert_eq!(body["value"], json!("100000000000000000000"));
        assert_eq!(body["nonce"], 7);
        assert_eq!(body["data"], json!("0xdead"));
        assert_eq!(body["logs"], json!([{"index": 2, "data": "0x0102"}]));
    }

    #[tokio::test]
    async fn test_transaction_not_found() {
        let store = seeded_store().await;
        let uri = format!("/transaction/{}", B256::repeat_byte(0xbb));
        let (status, body) = get(&store, &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"err_code": 2001, "err_msg": "transaction not exist"}));

        let (status, _) = get(&store, "/transaction/nothex").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_storage_failure_is_generic() {
        let store = seeded_store().await;
        store.set_fail_reads(true);
        let (status, body) = get(&store, "/blocks/3").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!("internal server error"));
    }
}
