use crate::ErrorResponse;
use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ethscan_core::QueryError;
use thiserror::Error;
use tracing::error;

/// An error answered to an API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was malformed.
    #[error("{0}")]
    BadRequest(String),

    /// The requested entry does not exist.
    #[error("{}", .0.err_msg)]
    NotFound(ErrorResponse),

    /// Something failed server side. Details are logged, not returned.
    #[error("internal server error")]
    Internal,
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::BlockNotFound(_) => Self::NotFound(ErrorResponse::BLOCK_NOT_EXIST),
            QueryError::TransactionNotFound(_) => {
                Self::NotFound(ErrorResponse::TRANSACTION_NOT_EXIST)
            }
            QueryError::InvalidLimit { max, .. } => {
                Self::BadRequest(format!("limit should be 0~{max}"))
            }
            QueryError::Storage(err) => {
                error!(target: "api", %err, "Storage failure while serving request");
                Self::Internal
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(format!("invalid query: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, Json(message)).into_response(),
            Self::NotFound(body) => (StatusCode::NOT_FOUND, Json(body)).into_response(),
            Self::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(self.to_string())).into_response()
            }
        }
    }
}
