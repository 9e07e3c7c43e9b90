//! Frame encoding/decoding utilities.
//!
//! Every message travels in a frame made of a preamble byte, two varints and
//! the payload:
//!
//! ```text
//! +------+----------------+--------------+------------------+
//! | 0x00 | varint length  | varint type  | payload[0..len]  |
//! +------+----------------+--------------+------------------+
//! ```
//!
//! The length counts payload bytes only.

use bytes::{Buf, BytesMut};

use crate::codec::{decode_varint, put_varint, varint_len};
use crate::constants::{MAX_FRAME_PAYLOAD, MAX_HEADER_SIZE, PREAMBLE};
use crate::error::{ProtocolError, ProtocolResult};

/// Initial capacity of the receive accumulator.
pub const RECEIVE_BUFFER_CAPACITY: usize = 1024;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Raw message type id. Not validated here.
    pub message_type: u32,
    /// Payload length in bytes.
    pub length: usize,
    /// Bytes taken by preamble and both varints.
    pub header_len: usize,
}

impl FrameHeader {
    /// Total size of the frame including payload.
    pub fn frame_len(&self) -> usize {
        self.header_len.saturating_add(self.length)
    }
}

/// Encode the header for a frame of `message_type` carrying `payload_len` bytes.
pub fn encode_frame_header(message_type: u32, payload_len: usize) -> Vec<u8> {
    let mut header = Vec::with_capacity(MAX_HEADER_SIZE);
    put_frame_header(&mut header, message_type, payload_len);
    header
}

/// Append a frame header to `buf`.
pub fn put_frame_header(buf: &mut Vec<u8>, message_type: u32, payload_len: usize) {
    buf.push(PREAMBLE);
    put_varint(buf, payload_len as u32);
    put_varint(buf, message_type);
}

/// Size of the header [`encode_frame_header`] would produce.
pub fn frame_header_len(message_type: u32, payload_len: usize) -> usize {
    1 + varint_len(payload_len as u32) + varint_len(message_type)
}

/// Encode a complete frame.
pub fn encode_frame(message_type: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = encode_frame_header(message_type, payload.len());
    buf.extend_from_slice(payload);
    buf
}

/// Decode a frame header from the front of `buf`.
///
/// Returns `Ok(None)` while either varint is incomplete. A wrong first byte
/// or a length above [`MAX_FRAME_PAYLOAD`] is an error; the stream cannot be
/// resynchronised.
pub fn decode_frame_header(buf: &[u8]) -> ProtocolResult<Option<FrameHeader>> {
    let Some(&first) = buf.first() else {
        return Ok(None);
    };
    if first != PREAMBLE {
        return Err(ProtocolError::InvalidPreamble(first));
    }

    let mut pos = 1;
    let Some((length, consumed)) = decode_varint(&buf[pos..]) else {
        return Ok(None);
    };
    pos += consumed;
    if length as usize > MAX_FRAME_PAYLOAD {
        return Err(ProtocolError::FrameTooLarge {
            length,
            max: MAX_FRAME_PAYLOAD,
        });
    }

    let Some((message_type, consumed)) = decode_varint(&buf[pos..]) else {
        return Ok(None);
    };
    pos += consumed;

    Ok(Some(FrameHeader {
        message_type,
        length: length as usize,
        header_len: pos,
    }))
}

/// Accumulates received bytes and hands out complete frames.
///
/// A frame is inspected with [`FrameCodec::peek`], its payload read with
/// [`FrameCodec::payload`], and only dropped from the buffer by
/// [`FrameCodec::consume`]. Callers that stop processing mid-stream simply
/// never consume.
#[derive(Debug)]
pub struct FrameCodec {
    buffer: BytesMut,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    /// Create an empty codec.
    pub fn new() -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(RECEIVE_BUFFER_CAPACITY),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Header of the first frame, once the whole frame is buffered.
    pub fn peek(&self) -> ProtocolResult<Option<FrameHeader>> {
        match decode_frame_header(&self.buffer)? {
            Some(header) if self.buffer.len() >= header.frame_len() => Ok(Some(header)),
            _ => Ok(None),
        }
    }

    /// Payload of the frame described by `header`.
    ///
    /// `header` must come from [`FrameCodec::peek`] with no consume in between.
    pub fn payload(&self, header: &FrameHeader) -> &[u8] {
        &self.buffer[header.header_len..header.frame_len()]
    }

    /// Drop the frame described by `header` from the front of the buffer.
    pub fn consume(&mut self, header: &FrameHeader) {
        let len = header.frame_len().min(self.buffer.len());
        self.buffer.advance(len);
    }

    /// Number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
