//! Message traits shared by every typed message.

use crate::codec::{FieldReader, FieldValue, ProtoWriter};
use crate::error::ProtocolResult;
use crate::message_type::MessageType;

/// A record of tagged fields that can be encoded and decoded.
///
/// Decoding starts from `Default` and feeds each field to the matching hook.
/// A hook returns `false` for a field number it does not know; such fields
/// are skipped.
pub trait ProtoMessage: Default {
    /// Write every non-default field.
    fn encode(&self, _writer: &mut ProtoWriter<'_>) {}

    /// Handle a varint field.
    fn decode_varint(&mut self, _field: u32, _value: u32) -> bool {
        false
    }

    /// Handle a length-delimited field. Nested messages may fail to decode.
    fn decode_length_delimited(&mut self, _field: u32, _value: &[u8]) -> ProtocolResult<bool> {
        Ok(false)
    }

    /// Handle a fixed32 field.
    fn decode_fixed32(&mut self, _field: u32, _value: u32) -> bool {
        false
    }

    /// Merge the fields of `payload` into `self`.
    fn merge(&mut self, payload: &[u8]) -> ProtocolResult<()> {
        for field in FieldReader::new(payload) {
            let field = field?;
            let known = match field.value {
                FieldValue::Varint(v) => self.decode_varint(field.number, v),
                FieldValue::LengthDelimited(v) => self.decode_length_delimited(field.number, v)?,
                FieldValue::Fixed32(v) => self.decode_fixed32(field.number, v),
                FieldValue::Fixed64(_) => false,
            };
            if !known {
                log::trace!(
                    "skipping unknown field {} in {}",
                    field.number,
                    std::any::type_name::<Self>()
                );
            }
        }
        Ok(())
    }

    /// Decode a message from a complete payload.
    fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        let mut msg = Self::default();
        msg.merge(payload)?;
        Ok(msg)
    }

    /// Encode into a fresh buffer.
    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut ProtoWriter::new(&mut buf));
        buf
    }
}

/// A top-level message with its own type id.
pub trait Message: ProtoMessage {
    /// Type id carried in the frame header.
    const MESSAGE_TYPE: MessageType;
}

/// Write `msg` as a nested message on `field`.
pub fn encode_nested<M: ProtoMessage>(writer: &mut ProtoWriter<'_>, field: u32, msg: &M) {
    let mark = writer.begin_nested(field);
    msg.encode(writer);
    writer.end_nested(mark);
}

/// Declares a message with no fields.
macro_rules! empty_message {
    ($(#[$meta:meta])* $name:ident => $ty:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl $crate::message::ProtoMessage for $name {}

        impl $crate::message::Message for $name {
            const MESSAGE_TYPE: $crate::message_type::MessageType =
                $crate::message_type::MessageType::$ty;
        }
    };
}

pub(crate) use empty_message;
