use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventsError {
    #[error("Malformed payload for audit event '{tag}': {source}")]
    Payload {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}
