//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use plinko_core::error::PirError;
use serde::Serialize;
use thiserror::Error;

/// Structured error body for API clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    #[error(transparent)]
    Core(#[from] PirError),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Core(PirError::Domain { .. }) => "OUT_OF_RANGE",
            Self::Core(PirError::QueryMalformed(_)) => "QUERY_MALFORMED",
            Self::Core(PirError::OutOfHints) => "OUT_OF_HINTS",
            Self::Core(_) => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Core(PirError::Domain { .. }) | Self::Core(PirError::QueryMalformed(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_client_or_server_class() {
        let bad = ApiError::Core(PirError::QueryMalformed("x"));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert_eq!(bad.code(), "QUERY_MALFORMED");

        let range = ApiError::Core(PirError::Domain { bound: 4 });
        assert_eq!(range.status(), StatusCode::BAD_REQUEST);

        let internal = ApiError::Core(PirError::OutOfHints);
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
