//! Error types for setu-link

use crate::streaming::wire::DecodeError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// setu-link error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation requires an established session
    #[error("not connected")]
    NotConnected,

    /// Frame exceeds the maximum allowed size
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Payload could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Payload could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration file could not be parsed
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be written
    #[error("config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
