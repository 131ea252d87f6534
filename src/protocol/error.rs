use thiserror::Error;

/// Protocol-level errors for message encoding/decoding
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("failed to decode message: {0}")]
    Decoding(#[source] serde_json::Error),

    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
