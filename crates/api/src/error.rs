//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::IdError;
use doc_store::DocStoreError;
use views::ViewError;

/// API-level error type that maps to HTTP responses.
///
/// Every error is rendered as `{"error": <kind>, "reason": <message>}`.
#[derive(Debug)]
pub enum ApiError {
    /// Document store error.
    Store(DocStoreError),
    /// View engine or view read error.
    View(ViewError),
}

impl ApiError {
    /// Returns the HTTP status, the wire name of the error kind and the
    /// reason text.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Store(err) => store_error_parts(err),
            ApiError::View(ViewError::Store(err)) => store_error_parts(err),
            ApiError::View(err @ ViewError::Script(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "script_error", err.to_string())
            }
            ApiError::View(err @ ViewError::Worker(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", err.to_string())
            }
        }
    }
}

fn store_error_parts(err: &DocStoreError) -> (StatusCode, &'static str, String) {
    match err {
        DocStoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found", "missing".into()),
        DocStoreError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id", err.to_string()),
        DocStoreError::CreateFailed(_) => (StatusCode::CONFLICT, "create_failed", err.to_string()),
        DocStoreError::UninitializedDb => {
            (StatusCode::BAD_REQUEST, "uninitialized_db", err.to_string())
        }
        DocStoreError::InvalidDbName(_) => {
            (StatusCode::BAD_REQUEST, "invalid_db_name", err.to_string())
        }
        DocStoreError::InvalidDocument(_) | DocStoreError::Serialization(_) => {
            (StatusCode::BAD_REQUEST, "serialization_error", err.to_string())
        }
        DocStoreError::Queue(_) | DocStoreError::Database(_) | DocStoreError::Migration(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal", err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, reason) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %reason, "internal server error");
        }

        let body = serde_json::json!({ "error": kind, "reason": reason });
        (status, axum::Json(body)).into_response()
    }
}

impl From<DocStoreError> for ApiError {
    fn from(err: DocStoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<ViewError> for ApiError {
    fn from(err: ViewError) -> Self {
        ApiError::View(err)
    }
}

impl From<IdError> for ApiError {
    fn from(err: IdError) -> Self {
        ApiError::Store(err.into())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Store(err.into())
    }
}
