use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Bank API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Bank API {path} returned {status}: {message}")]
    Status {
        path: String,
        status: StatusCode,
        message: String,
    },

    #[error("Bank account '{0}' does not exist")]
    UnknownAccount(String),

    #[error("Failed to deserialize the bank response: {0}")]
    Deserialization(String),
}
