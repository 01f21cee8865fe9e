//! Error types for the startup-phase protocol implementation.

use thiserror::Error;

use super::protocol::ProtocolVersion;

/// Result type for startup-phase operations.
pub type PgResult<T> = Result<T, PgError>;

/// Errors that can occur while decoding startup-phase messages or answering them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PgError {
    /// A startup-phase operation was invoked on a typed message.
    #[error("Not an untyped startup message: {:?}", tag_char(.observed))]
    NotUntyped { observed: u8 },

    /// Cancel key data was requested from a message without the cancel marker.
    #[error("Not a cancel message")]
    NotCancel,

    /// The buffer is shorter than a fixed-offset field requires.
    #[error("Truncated message: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },

    /// Declared startup length exceeds the configured maximum.
    #[error("Startup message too large: {length} > {max}")]
    StartupTooLarge { length: usize, max: usize },

    /// Declared startup length is below the 8-byte header.
    #[error("Invalid startup message length: {length}")]
    StartupTooSmall { length: usize },

    /// Client asked for a protocol major version the server does not speak.
    #[error("Unsupported frontend protocol {requested}: server supports {supported}.0")]
    UnsupportedVersion {
        requested: ProtocolVersion,
        supported: u16,
    },

    /// An internal peer connected while internal connections are disabled.
    #[error("Internal peer connections are disabled")]
    InternalPeerRejected,

    /// Handshake configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

fn tag_char(tag: &u8) -> char {
    char::from(*tag)
}

impl From<serde_json::Error> for PgError {
    fn from(e: serde_json::Error) -> Self {
        PgError::Config(e.to_string())
    }
}
