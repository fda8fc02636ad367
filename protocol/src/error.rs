//! Protocol error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid magic number: {0:#010x}")]
    InvalidMagic(u32),

    #[error("Invalid protocol version: {0}")]
    InvalidVersion(u16),

    #[error("Unknown message type: {0}")]
    UnknownMessageType(u16),

    #[error("Message too small: expected at least {expected}, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("Payload too large: maximum {max}, got {actual}")]
    PayloadTooLarge { max: usize, actual: usize },

    #[error("Payload size mismatch: header declares {declared}, datagram carries {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    #[error("Malformed {0} payload")]
    MalformedPayload(&'static str),
}
