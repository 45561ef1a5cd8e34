//! Error types for the API server.
//!
//! [`ApiError`] is what handlers return. Its
//! [`IntoResponse`](axum::response::IntoResponse) implementation renders
//! every failure as `{"error": ..., "status": ...}` JSON.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lifeline_dispatch::DispatchError;
use tracing::error;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with work already in progress.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request cannot be acted on as given.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::CameraNotFound(_)
            | DispatchError::EventNotFound(_)
            | DispatchError::UnitNotFound(_) => Self::NotFound(err.to_string()),
            DispatchError::AlreadySimulating(_) => Self::Conflict(err.to_string()),
            DispatchError::NoPath(_) => Self::BadRequest(err.to_string()),
            DispatchError::Store(_) | DispatchError::Serialization(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<lifeline_db::DbError> for ApiError {
    fn from(err: lifeline_db::DbError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::BadRequest(msg) | Self::InvalidUuid(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => {
                error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use lifeline_types::UnitId;

    use super::*;

    #[test]
    fn dispatch_errors_map_to_statuses() {
        let id = UnitId::new();
        let cases = [
            (DispatchError::UnitNotFound(id), StatusCode::NOT_FOUND),
            (DispatchError::AlreadySimulating(id), StatusCode::CONFLICT),
            (DispatchError::NoPath(id), StatusCode::BAD_REQUEST),
            (
                DispatchError::CameraNotFound("CAM_1".to_owned()),
                StatusCode::NOT_FOUND,
            ),
        ];
        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
