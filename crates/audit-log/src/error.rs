use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditLogError {
    #[error("Audit log request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Audit log returned {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Failed to deserialize the audit log response: {0}")]
    Deserialization(String),

    #[error(transparent)]
    Event(#[from] events::EventsError),
}
