//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when working with the native API protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame did not start with the preamble byte.
    #[error("invalid preamble: expected 0x00, got 0x{0:02X}")]
    InvalidPreamble(u8),

    /// Frame header announced a payload larger than [`crate::MAX_FRAME_PAYLOAD`].
    #[error("frame payload of {length} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Announced payload length.
        length: u32,
        /// Configured limit.
        max: usize,
    },

    /// Message type id is not part of the protocol.
    #[error("unknown message type: {0}")]
    UnknownMessageType(u32),

    /// Payload ended in the middle of a field.
    #[error("payload truncated at offset {offset}")]
    Truncated {
        /// Byte offset where more data was expected.
        offset: usize,
    },

    /// Field uses a wire type this protocol cannot skip.
    #[error("unsupported wire type {wire_type} for field {field}")]
    UnsupportedWireType {
        /// Field number.
        field: u32,
        /// Wire type from the tag.
        wire_type: u32,
    },

    /// A string field held bytes that are not valid UTF-8.
    #[error("field {field} is not valid UTF-8")]
    InvalidUtf8 {
        /// Field number.
        field: u32,
    },

    /// A message type was decoded as a request although only the device sends it.
    #[error("message type {0} cannot be received by the device")]
    NotARequest(u32),
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
