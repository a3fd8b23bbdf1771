use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sea_orm::DbErr;
use serde_json::json;
use tracing::error;

/// Error kinds an agent handler can surface. Each kind owns its status code;
/// handlers construct the kind and return, the conversion to a JSON error
/// body happens in one place.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request itself is malformed (missing field, bad date, bad unit).
    #[error("{0}")]
    Validation(String),
    /// A state-machine violation that `force=true` could override.
    #[error("{0}")]
    Conflict(String),
    /// The referenced truck/container/session/provider does not exist.
    #[error("{0}")]
    NotFound(String),
    /// An outbound call to the sister service failed.
    #[error("upstream service failure: {0}")]
    Upstream(String),
    /// Unexpected database failure; the transaction was rolled back.
    #[error("storage failure: {0}")]
    Storage(#[from] DbErr),
}

impl ApiError {
    /// A 400 with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// A 409 with the given message.
    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    /// A 404 with the given message.
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// A 500 with the given message.
    pub fn upstream(message: impl Into<String>) -> Self {
        ApiError::Upstream(message.into())
    }

    /// The status code this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_their_status_codes() {
        assert_eq!(
            ApiError::validation("bad date").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::conflict("open in").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::not_found("no row").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::upstream("timeout").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(DbErr::Custom("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
