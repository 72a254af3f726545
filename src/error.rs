use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use thiserror::Error;

use crate::models::common::ErrorResponse;

/// Failures talking to the backpack.tf API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("{endpoint} reported failure: {message}")]
    Unsuccessful {
        endpoint: &'static str,
        message: String,
        body: String,
    },
}

impl UpstreamError {
    /// Raw response body, when the provider answered at all
    pub fn body(&self) -> Option<&str> {
        match self {
            UpstreamError::Request { .. } => None,
            UpstreamError::Decode { body, .. } | UpstreamError::Unsuccessful { body, .. } => {
                Some(body)
            }
        }
    }

    /// Connection failures and timeouts. A body the provider actually sent is never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Request { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("database error: {0}")]
    Persistence(#[from] DbErr),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Upstream(err) => {
                match err.body() {
                    Some(body) => tracing::error!(error = %err, body = %body, "Upstream request failed"),
                    None => tracing::error!(error = %err, "Upstream request failed"),
                }
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Persistence(err) => {
                tracing::error!(error = %err, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Validation(msg) => {
                tracing::debug!(error = %msg, "Rejected request");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
