//! API error responses
//!
//! Every failure is written as `{"error": "<message>"}` with a status that
//! tells the caller whose fault it was.

use crate::host::HostError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed body or missing/invalid fields
    #[error("{0}")]
    BadRequest(String),

    /// No caller identity on the request
    #[error("Not authorized")]
    Unauthorized,

    /// Caller unknown to the host or not a system admin
    #[error("{0}")]
    Forbidden(&'static str),

    /// The host call failed; carries the host's message verbatim
    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<HostError> for ApiError {
    fn from(e: HostError) -> Self {
        ApiError::Upstream(e.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Forbidden("Forbidden").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Upstream("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_host_error_passes_through_verbatim() {
        let err: ApiError = HostError::with_status("Unable to find the channel.", 404).into();
        assert_eq!(err.to_string(), "Unable to find the channel.");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
