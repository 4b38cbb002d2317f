use std::error::Error;

use axum::response::IntoResponse;
use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;
use tracing::error;

use siloscript_runner::RunnerError;
use siloscript_store::StoreError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Application errors that translate directly into an HTTP response,
/// mirroring `spec.md`'s error-kind table.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("invalid key")]
    InvalidKey,

    #[error("crypt error")]
    Crypt(#[source] anyhow::Error),

    #[error("type error: {0}")]
    TypeError(&'static str),

    #[error("runtime error")]
    Runtime(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound,
            StoreError::Crypt(e) => AppError::Crypt(e),
            StoreError::Backend(e) => AppError::Runtime(e.into()),
        }
    }
}

impl From<RunnerError> for AppError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::NotFound => AppError::NotFound,
            RunnerError::Io(e) => AppError::Runtime(e.into()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Runtime(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidKey => StatusCode::BAD_REQUEST,
            AppError::Crypt(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::TypeError(_) => StatusCode::BAD_REQUEST,
            AppError::Runtime(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(status = ?status, message = ?self, details = ?self.source());
        }

        let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Server errors never leak crypt/runtime detail to callers: a
            // fixed retry-later message only.
            Json(ErrorBody {
                error: "internal error, please retry later".to_string(),
            })
        } else {
            Json(ErrorBody {
                error: self.to_string(),
            })
        };

        (status, body).into_response()
    }
}
