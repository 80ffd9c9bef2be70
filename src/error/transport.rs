use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect '{identity}': {source}")]
    Connect {
        identity: String,
        #[source]
        source: Box<tungstenite::Error>,
    },
    #[error("Connection for '{identity}' was refused.")]
    Refused { identity: String },
    #[error("Failed to send frame: {source}")]
    Send {
        #[source]
        source: Box<tungstenite::Error>,
    },
    #[error("Failed to read frame: {source}")]
    Receive {
        #[source]
        source: Box<tungstenite::Error>,
    },
    #[error("Connection is closed.")]
    Closed,
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Malformed payload: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode payload: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}
