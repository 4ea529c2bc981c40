use reqwest::{Method, StatusCode};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to send the HTTP request: {0}")]
    RequestBuild(#[from] reqwest::Error),

    /// The exchange answered with a non-success status. Negative-path checks
    /// match on `status` rather than on the message.
    #[error("{method} {path} returned {status}: {message}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
        message: String,
    },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("{method} {path} took {elapsed:?}, longer than the retire timeout")]
    Retired {
        method: Method,
        path: String,
        elapsed: Duration,
    },

    #[error("The API request returned an error: {0}")]
    ApiError(String),
}

impl ApiError {
    /// The HTTP status the exchange answered with, if it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Shorthand used by fakes and tests.
    pub fn status_only(method: Method, path: &str, status: StatusCode) -> Self {
        ApiError::Status {
            method,
            path: path.to_string(),
            status,
            message: status.canonical_reason().unwrap_or_default().to_string(),
        }
    }
}
