//! Field-level wire codec.
//!
//! Payloads are a sequence of tagged fields. Each tag is a varint holding
//! `(field_number << 3) | wire_type`, followed by the value:
//!
//! ```text
//! wire type 0  varint            7 bits per byte, low group first, bit 7 = more
//! wire type 2  length delimited  varint length + bytes (strings, nested messages)
//! wire type 5  fixed32           4 bytes little endian (fixed32, float)
//! ```
//!
//! Encoders never emit a field whose value equals its default (zero, false,
//! empty). Decoders treat an absent field as that default, so both sides must
//! agree on this rule for the format to round-trip.

use bytes::BufMut;

use crate::constants::*;
use crate::error::{ProtocolError, ProtocolResult};

// ============================================================================
// Varints
// ============================================================================

/// Append `value` as a varint.
pub fn put_varint<B: BufMut>(buf: &mut B, mut value: u32) {
    if value <= 0x7F {
        buf.put_u8(value as u8);
        return;
    }

    while value != 0 {
        let low = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            buf.put_u8(low | 0x80);
        } else {
            buf.put_u8(low);
        }
    }
}

/// Encode `value` as a standalone varint.
pub fn encode_varint(value: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(varint_len(value));
    put_varint(&mut buf, value);
    buf
}

/// Number of bytes `value` occupies as a varint.
pub fn varint_len(value: u32) -> usize {
    if value <= 0x7F {
        return 1;
    }
    let bits = 32 - value.leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Decode a varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed, or `None` if the
/// continuation chain runs past the end of `buf` (more data is needed).
/// Bits beyond the 32nd are discarded.
pub fn decode_varint(buf: &[u8]) -> Option<(u32, usize)> {
    let mut result: u32 = 0;
    let mut shift: u32 = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if shift < 32 {
            result |= u32::from(byte & 0x7F) << shift;
        }
        shift += 7;
        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }
    }

    None
}

/// Append the tag for `field` with the given wire type.
pub fn put_field<B: BufMut>(buf: &mut B, field: u32, wire_type: u32) {
    put_varint(buf, (field << 3) | (wire_type & 0b111));
}

/// Encode the tag for `field` with the given wire type.
pub fn encode_field(field: u32, wire_type: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2);
    put_field(&mut buf, field, wire_type);
    buf
}

/// Reinterpret fixed32 bits as a float.
pub fn as_float(raw: u32) -> f32 {
    f32::from_bits(raw)
}

/// Decode a length-delimited value of `field` as UTF-8 text.
pub fn as_string(field: u32, raw: &[u8]) -> ProtocolResult<String> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|_| ProtocolError::InvalidUtf8 { field })
}

// ============================================================================
// Writer
// ============================================================================

/// Writes tagged fields into a caller-owned buffer.
///
/// The buffer is borrowed so a connection can reuse one allocation for
/// every message it sends.
#[derive(Debug)]
pub struct ProtoWriter<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> ProtoWriter<'a> {
    /// Wrap a buffer. Existing contents are kept.
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        ProtoWriter { buf }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Unsigned varint field, omitted when zero.
    pub fn uint32(&mut self, field: u32, value: u32) {
        if value == 0 {
            return;
        }
        put_field(self.buf, field, WIRE_TYPE_VARINT);
        put_varint(self.buf, value);
    }

    /// Signed varint field, sent as its 32-bit two's complement.
    pub fn int32(&mut self, field: u32, value: i32) {
        self.uint32(field, value as u32);
    }

    /// Boolean field, omitted when false.
    pub fn bool(&mut self, field: u32, value: bool) {
        if !value {
            return;
        }
        put_field(self.buf, field, WIRE_TYPE_VARINT);
        self.buf.put_u8(0x01);
    }

    /// Fixed 4-byte field, omitted when zero.
    pub fn fixed32(&mut self, field: u32, value: u32) {
        if value == 0 {
            return;
        }
        put_field(self.buf, field, WIRE_TYPE_FIXED32);
        self.buf.put_u32_le(value);
    }

    /// Float field, omitted when zero.
    pub fn float(&mut self, field: u32, value: f32) {
        if value == 0.0 {
            return;
        }
        self.fixed32(field, value.to_bits());
    }

    /// String field, omitted when empty.
    pub fn string(&mut self, field: u32, value: &str) {
        self.bytes(field, value.as_bytes());
    }

    /// Raw bytes field, omitted when empty.
    pub fn bytes(&mut self, field: u32, value: &[u8]) {
        if value.is_empty() {
            return;
        }
        put_field(self.buf, field, WIRE_TYPE_LENGTH_DELIMITED);
        put_varint(self.buf, value.len() as u32);
        self.buf.extend_from_slice(value);
    }

    /// Start a nested message on `field`.
    ///
    /// Returns a mark to hand to [`ProtoWriter::end_nested`] once the nested
    /// fields have been written.
    pub fn begin_nested(&mut self, field: u32) -> usize {
        put_field(self.buf, field, WIRE_TYPE_LENGTH_DELIMITED);
        self.buf.len()
    }

    /// Backfill the length prefix of the nested message started at `mark`.
    pub fn end_nested(&mut self, mark: usize) {
        let nested_len = (self.buf.len() - mark) as u32;
        let prefix = encode_varint(nested_len);
        self.buf.splice(mark..mark, prefix);
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Value of a single decoded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Wire type 0.
    Varint(u32),
    /// Wire type 1, carried only so it can be skipped.
    Fixed64(u64),
    /// Wire type 2.
    LengthDelimited(&'a [u8]),
    /// Wire type 5.
    Fixed32(u32),
}

/// A decoded field: its number and value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    /// Field number from the tag.
    pub number: u32,
    /// Field value.
    pub value: FieldValue<'a>,
}

/// Iterates over the fields of a complete payload.
///
/// Yields an error and stops if the payload ends inside a field or uses a
/// wire type that cannot be skipped.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> FieldReader<'a> {
    /// Create a reader over `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        FieldReader {
            buf,
            pos: 0,
            failed: false,
        }
    }

    fn read_varint(&mut self) -> ProtocolResult<u32> {
        let (value, consumed) = decode_varint(&self.buf[self.pos..])
            .ok_or(ProtocolError::Truncated { offset: self.pos })?;
        self.pos += consumed;
        Ok(value)
    }

    fn take(&mut self, len: usize) -> ProtocolResult<&'a [u8]> {
        if self.buf.len() - self.pos < len {
            return Err(ProtocolError::Truncated { offset: self.pos });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_field(&mut self) -> ProtocolResult<Field<'a>> {
        let tag = self.read_varint()?;
        let number = tag >> 3;
        let wire_type = tag & 0b111;

        let value = match wire_type {
            WIRE_TYPE_VARINT => FieldValue::Varint(self.read_varint()?),
            WIRE_TYPE_FIXED64 => {
                let raw = self.take(8)?;
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(raw);
                FieldValue::Fixed64(u64::from_le_bytes(bytes))
            }
            WIRE_TYPE_LENGTH_DELIMITED => {
                let len = self.read_varint()? as usize;
                FieldValue::LengthDelimited(self.take(len)?)
            }
            WIRE_TYPE_FIXED32 => {
                let raw = self.take(4)?;
                FieldValue::Fixed32(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
            }
            _ => {
                return Err(ProtocolError::UnsupportedWireType {
                    field: number,
                    wire_type,
                })
            }
        };

        Ok(Field { number, value })
    }
}

impl<'a> Iterator for FieldReader<'a> {
    type Item = ProtocolResult<Field<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.buf.len() {
            return None;
        }
        let result = self.read_field();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}
