//! Errors raised while relaying a single alert.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The body parsed, but `text` was absent, null or empty.
    #[error("Missing 'text' field in JSON.")]
    MissingText,

    /// The body was not a JSON object with a string `text` field.
    #[error("{0}")]
    InvalidBody(#[from] serde_json::Error),

    /// The request to ntfy never produced a response.
    #[error("{0}")]
    Upstream(#[from] reqwest::Error),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingText => StatusCode::BAD_REQUEST,
            RelayError::InvalidBody(_) | RelayError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short label used for logging and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::MissingText => "missing_text",
            RelayError::InvalidBody(_) => "invalid_body",
            RelayError::Upstream(_) => "upstream",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
