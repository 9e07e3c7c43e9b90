//! Session messages: handshake, disconnect, keepalive and device info.

use crate::codec::{as_string, ProtoWriter};
use crate::constants::{API_VERSION_MAJOR, API_VERSION_MINOR};
use crate::error::ProtocolResult;
use crate::message::{empty_message, Message, ProtoMessage};
use crate::message_type::MessageType;

/// First message of every session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelloRequest {
    /// Free-form description of the controller.
    pub client_info: String,
}

impl ProtoMessage for HelloRequest {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.string(1, &self.client_info);
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            1 => self.client_info = as_string(field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Message for HelloRequest {
    const MESSAGE_TYPE: MessageType = MessageType::HelloRequest;
}

/// Device answer to [`HelloRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelloResponse {
    pub api_version_major: u32,
    pub api_version_minor: u32,
    /// Device description, usually name and firmware version.
    pub server_info: String,
}

impl HelloResponse {
    /// Response announcing the protocol version this crate speaks.
    pub fn new(server_info: impl Into<String>) -> Self {
        HelloResponse {
            api_version_major: API_VERSION_MAJOR,
            api_version_minor: API_VERSION_MINOR,
            server_info: server_info.into(),
        }
    }
}

impl ProtoMessage for HelloResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.uint32(1, self.api_version_major);
        w.uint32(2, self.api_version_minor);
        w.string(3, &self.server_info);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            1 => self.api_version_major = value,
            2 => self.api_version_minor = value,
            _ => return false,
        }
        true
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            3 => self.server_info = as_string(field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Message for HelloResponse {
    const MESSAGE_TYPE: MessageType = MessageType::HelloResponse;
}

/// Authentication attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectRequest {
    pub password: String,
}

impl ProtoMessage for ConnectRequest {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.string(1, &self.password);
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            1 => self.password = as_string(field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Message for ConnectRequest {
    const MESSAGE_TYPE: MessageType = MessageType::ConnectRequest;
}

/// Authentication result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectResponse {
    pub invalid_password: bool,
}

impl ProtoMessage for ConnectResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.bool(1, self.invalid_password);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            1 => self.invalid_password = value != 0,
            _ => return false,
        }
        true
    }
}

impl Message for ConnectResponse {
    const MESSAGE_TYPE: MessageType = MessageType::ConnectResponse;
}

/// Request to end the session, from either side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisconnectRequest {
    pub reason: String,
}

impl ProtoMessage for DisconnectRequest {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.string(1, &self.reason);
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            1 => self.reason = as_string(field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Message for DisconnectRequest {
    const MESSAGE_TYPE: MessageType = MessageType::DisconnectRequest;
}

empty_message!(
    /// Acknowledges a [`DisconnectRequest`].
    DisconnectResponse => DisconnectResponse
);
empty_message!(
    /// Keepalive probe.
    PingRequest => PingRequest
);
empty_message!(
    /// Keepalive answer.
    PingResponse => PingResponse
);
empty_message!(
    /// Ask for [`DeviceInfoResponse`].
    DeviceInfoRequest => DeviceInfoRequest
);

/// Device identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfoResponse {
    pub uses_password: bool,
    pub name: String,
    pub mac_address: String,
    pub version: String,
    pub compilation_time: String,
    pub model: String,
    pub has_deep_sleep: bool,
}

impl ProtoMessage for DeviceInfoResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.bool(1, self.uses_password);
        w.string(2, &self.name);
        w.string(3, &self.mac_address);
        w.string(4, &self.version);
        w.string(5, &self.compilation_time);
        w.string(6, &self.model);
        w.bool(7, self.has_deep_sleep);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            1 => self.uses_password = value != 0,
            7 => self.has_deep_sleep = value != 0,
            _ => return false,
        }
        true
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        let target = match field {
            2 => &mut self.name,
            3 => &mut self.mac_address,
            4 => &mut self.version,
            5 => &mut self.compilation_time,
            6 => &mut self.model,
            _ => return Ok(false),
        };
        *target = as_string(field, value)?;
        Ok(true)
    }
}

impl Message for DeviceInfoResponse {
    const MESSAGE_TYPE: MessageType = MessageType::DeviceInfoResponse;
}
