//! Rendering [`ConvertError`] as an HTTP response.
//!
//! Client kinds map to 400 and carry their own message. Every server kind
//! maps to 500 with the generic failure message, so paths and codec detail
//! stay in the logs.

use crate::error::ConvertError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Error body: `{ "error": "...", "code": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable [`crate::ErrorKind`] code.
    pub code: String,
}

impl From<&ConvertError> for ErrorResponse {
    fn from(err: &ConvertError) -> Self {
        Self {
            error: err.public_message(),
            code: err.kind().code().to_string(),
        }
    }
}

/// Wrapper so handlers can return `Result<_, HttpError>` and use `?` on
/// [`ConvertError`].
#[derive(Debug)]
pub struct HttpError(pub ConvertError);

impl From<ConvertError> for HttpError {
    fn from(err: ConvertError) -> Self {
        HttpError(err)
    }
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.0.kind().code();
        if status.is_client_error() {
            tracing::warn!(status = status.as_u16(), code, error = %self.0, "Request failed");
        } else {
            tracing::error!(status = status.as_u16(), code, error = %self.0, "Request failed");
        }
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}
