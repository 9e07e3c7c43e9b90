//! Server error types.

use devapi_proto::ProtocolError;
use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors raised by the API server.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServerError {
    /// A frame or payload could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A message arrived that the connection may not receive in its state.
    #[error("message type {message_type} not allowed in state {state:?}")]
    IllegalMessage {
        /// Raw type id from the frame header.
        message_type: u32,
        /// Connection state at the time.
        state: ConnectionState,
    },

    /// A reply that must reach the client could not be sent.
    #[error("failed to send {0}")]
    SendFailed(&'static str),

    /// Two entities of one domain hash to the same key.
    #[error("duplicate entity key 0x{key:08X} for '{name}'")]
    DuplicateKey {
        /// Colliding key.
        key: u32,
        /// Name of the entity that was rejected.
        name: String,
    },

    /// Configuration values are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ServerError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ServerError::Protocol(ProtocolError::InvalidPreamble(_)) => "invalid_preamble",
            ServerError::Protocol(ProtocolError::FrameTooLarge { .. }) => "frame_too_large",
            ServerError::Protocol(_) => "decode",
            ServerError::IllegalMessage { .. } => "illegal_message",
            ServerError::SendFailed(_) => "send_failed",
            ServerError::DuplicateKey { .. } => "duplicate_key",
            ServerError::InvalidConfig(_) => "invalid_config",
        }
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
