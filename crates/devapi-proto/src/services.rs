//! Log subscription, service calls, time sync, controller state following and
//! user-defined services.

use crate::codec::{as_float, as_string, ProtoWriter};
use crate::error::ProtocolResult;
use crate::message::{empty_message, encode_nested, Message, ProtoMessage};
use crate::message_type::MessageType;
use crate::types::{LogLevel, ServiceArgType};

// ============================================================================
// Logs
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeLogsRequest {
    pub level: LogLevel,
    /// Ask the device to log its configuration once.
    pub dump_config: bool,
}

impl ProtoMessage for SubscribeLogsRequest {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.uint32(1, self.level.as_u32());
        w.bool(2, self.dump_config);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            1 => self.level = LogLevel::from_u32(value),
            2 => self.dump_config = value != 0,
            _ => return false,
        }
        true
    }
}

impl Message for SubscribeLogsRequest {
    const MESSAGE_TYPE: MessageType = MessageType::SubscribeLogsRequest;
}

/// One forwarded log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeLogsResponse {
    pub level: LogLevel,
    pub tag: String,
    pub message: String,
    /// Set on the placeholder sent when the real line did not fit.
    pub send_failed: bool,
}

impl ProtoMessage for SubscribeLogsResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.uint32(1, self.level.as_u32());
        w.string(2, &self.tag);
        w.string(3, &self.message);
        w.bool(4, self.send_failed);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            1 => self.level = LogLevel::from_u32(value),
            4 => self.send_failed = value != 0,
            _ => return false,
        }
        true
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            2 => self.tag = as_string(field, value)?,
            3 => self.message = as_string(field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Message for SubscribeLogsResponse {
    const MESSAGE_TYPE: MessageType = MessageType::SubscribeLogsResponse;
}

// ============================================================================
// Service calls
// ============================================================================

empty_message!(
    /// Subscribe to service calls emitted by the device.
    SubscribeServiceCallsRequest => SubscribeServiceCallsRequest
);

/// A key/value pair nested in [`ServiceCallResponse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl ProtoMessage for KeyValue {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.string(1, &self.key);
        w.string(2, &self.value);
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            1 => self.key = as_string(field, value)?,
            2 => self.value = as_string(field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// A controller service the device wants invoked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCallResponse {
    /// Service name, e.g. `light.turn_on`.
    pub service: String,
    pub data: Vec<KeyValue>,
    /// Values the controller renders as templates.
    pub data_template: Vec<KeyValue>,
    /// Variables available to the templates.
    pub variables: Vec<KeyValue>,
}

impl ProtoMessage for ServiceCallResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.string(1, &self.service);
        for kv in &self.data {
            encode_nested(w, 2, kv);
        }
        for kv in &self.data_template {
            encode_nested(w, 3, kv);
        }
        for kv in &self.variables {
            encode_nested(w, 4, kv);
        }
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            1 => self.service = as_string(field, value)?,
            2 => self.data.push(KeyValue::decode(value)?),
            3 => self.data_template.push(KeyValue::decode(value)?),
            4 => self.variables.push(KeyValue::decode(value)?),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Message for ServiceCallResponse {
    const MESSAGE_TYPE: MessageType = MessageType::ServiceCallResponse;
}

// ============================================================================
// Time
// ============================================================================

empty_message!(
    /// Device asks the controller for the time.
    GetTimeRequest => GetTimeRequest
);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetTimeResponse {
    /// Seconds since the Unix epoch.
    pub epoch_seconds: u32,
}

impl ProtoMessage for GetTimeResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.fixed32(1, self.epoch_seconds);
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        match field {
            1 => self.epoch_seconds = value,
            _ => return false,
        }
        true
    }
}

impl Message for GetTimeResponse {
    const MESSAGE_TYPE: MessageType = MessageType::GetTimeResponse;
}

// ============================================================================
// Controller state following
// ============================================================================

empty_message!(
    /// Ask which controller entities the device follows.
    SubscribeHomeAssistantStatesRequest => SubscribeHomeAssistantStatesRequest
);

/// Names one controller entity the device follows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeHomeAssistantStateResponse {
    pub entity_id: String,
}

impl ProtoMessage for SubscribeHomeAssistantStateResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.string(1, &self.entity_id);
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            1 => self.entity_id = as_string(field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Message for SubscribeHomeAssistantStateResponse {
    const MESSAGE_TYPE: MessageType = MessageType::SubscribeHomeAssistantStateResponse;
}

/// New state of a followed controller entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HomeAssistantStateResponse {
    pub entity_id: String,
    pub state: String,
}

impl ProtoMessage for HomeAssistantStateResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.string(1, &self.entity_id);
        w.string(2, &self.state);
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            1 => self.entity_id = as_string(field, value)?,
            2 => self.state = as_string(field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Message for HomeAssistantStateResponse {
    const MESSAGE_TYPE: MessageType = MessageType::HomeAssistantStateResponse;
}

// ============================================================================
// User-defined services
// ============================================================================

/// Argument descriptor nested in [`ListEntitiesServicesResponse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEntitiesServicesArgument {
    pub name: String,
    pub arg_type: ServiceArgType,
}

impl ProtoMessage for ListEntitiesServicesArgument {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.string(1, &self.name);
        w.uint32(2, self.arg_type.as_u32());
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            2 => self.arg_type = ServiceArgType::from_u32(value).unwrap_or_default(),
            _ => return false,
        }
        true
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            1 => self.name = as_string(field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Describes one user-defined service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEntitiesServicesResponse {
    pub name: String,
    pub key: u32,
    pub args: Vec<ListEntitiesServicesArgument>,
}

impl ProtoMessage for ListEntitiesServicesResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.string(1, &self.name);
        w.fixed32(2, self.key);
        for arg in &self.args {
            encode_nested(w, 3, arg);
        }
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            1 => self.name = as_string(field, value)?,
            3 => self.args.push(ListEntitiesServicesArgument::decode(value)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        match field {
            2 => self.key = value,
            _ => return false,
        }
        true
    }
}

impl Message for ListEntitiesServicesResponse {
    const MESSAGE_TYPE: MessageType = MessageType::ListEntitiesServicesResponse;
}

/// One argument value of [`ExecuteServiceRequest`]. Only the member matching
/// the declared argument type is meaningful.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteServiceArgument {
    pub bool_: bool,
    pub int_: i32,
    pub float_: f32,
    pub string_: String,
}

impl ProtoMessage for ExecuteServiceArgument {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.bool(1, self.bool_);
        w.int32(2, self.int_);
        w.float(3, self.float_);
        w.string(4, &self.string_);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            1 => self.bool_ = value != 0,
            2 => self.int_ = value as i32,
            _ => return false,
        }
        true
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            4 => self.string_ = as_string(field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        match field {
            3 => self.float_ = as_float(value),
            _ => return false,
        }
        true
    }
}

/// Invoke a user-defined service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteServiceRequest {
    pub key: u32,
    pub args: Vec<ExecuteServiceArgument>,
}

impl ProtoMessage for ExecuteServiceRequest {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.fixed32(1, self.key);
        for arg in &self.args {
            encode_nested(w, 2, arg);
        }
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            2 => self.args.push(ExecuteServiceArgument::decode(value)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        match field {
            1 => self.key = value,
            _ => return false,
        }
        true
    }
}

impl Message for ExecuteServiceRequest {
    const MESSAGE_TYPE: MessageType = MessageType::ExecuteServiceRequest;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;

    #[test]
    fn test_subscribe_logs_request() {
        let req = SubscribeLogsRequest::decode(&[0x08, 0x04, 0x10, 0x01]).unwrap();
        assert_eq!(req.level, LogLevel::Debug);
        assert!(req.dump_config);
    }

    #[test]
    fn test_log_response_send_failed_only() {
        let msg = SubscribeLogsResponse {
            send_failed: true,
            ..Default::default()
        };
        assert_eq!(msg.encode_to_vec(), vec![0x20, 0x01]);
    }

    #[test]
    fn test_service_call_nested_entries() {
        let call = ServiceCallResponse {
            service: "light.turn_on".into(),
            data: vec![KeyValue::new("entity_id", "light.kitchen")],
            data_template: vec![KeyValue::new("brightness", "{{ level }}")],
            variables: vec![KeyValue::new("level", "128"), KeyValue::new("x", "")],
        };
        let decoded = ServiceCallResponse::decode(&call.encode_to_vec()).unwrap();
        assert_eq!(decoded, call);
    }

    #[test]
    fn test_nested_entry_bytes() {
        let call = ServiceCallResponse {
            service: String::new(),
            data: vec![KeyValue::new("a", "b")],
            ..Default::default()
        };
        assert_eq!(
            call.encode_to_vec(),
            vec![0x12, 0x06, 0x0A, 0x01, b'a', 0x12, 0x01, b'b']
        );
    }

    #[test]
    fn test_truncated_nested_entry_is_error() {
        // data entry claims 4 bytes, inner string claims 9
        let payload = [0x12, 0x04, 0x0A, 0x09, b'a', b'b'];
        assert_eq!(
            ServiceCallResponse::decode(&payload),
            Err(ProtocolError::Truncated { offset: 2 })
        );
    }

    #[test]
    fn test_list_services_args() {
        let msg = ListEntitiesServicesResponse {
            name: "set_level".into(),
            key: 42,
            args: vec![
                ListEntitiesServicesArgument {
                    name: "enabled".into(),
                    arg_type: ServiceArgType::Bool,
                },
                ListEntitiesServicesArgument {
                    name: "level".into(),
                    arg_type: ServiceArgType::Float,
                },
            ],
        };
        assert_eq!(
            ListEntitiesServicesResponse::decode(&msg.encode_to_vec()).unwrap(),
            msg
        );
    }

    #[test]
    fn test_execute_service_with_default_argument() {
        // An all-default argument still occupies a slot as an empty nested message.
        let req = ExecuteServiceRequest {
            key: 7,
            args: vec![
                ExecuteServiceArgument::default(),
                ExecuteServiceArgument {
                    int_: -20,
                    ..Default::default()
                },
                ExecuteServiceArgument {
                    string_: "hello".into(),
                    ..Default::default()
                },
            ],
        };
        let decoded = ExecuteServiceRequest::decode(&req.encode_to_vec()).unwrap();
        assert_eq!(decoded.args.len(), 3);
        assert_eq!(decoded, req);
    }

    #[test]
    fn test_time_and_home_assistant_messages() {
        let time = GetTimeResponse {
            epoch_seconds: 1_700_000_000,
        };
        assert_eq!(GetTimeResponse::decode(&time.encode_to_vec()).unwrap(), time);

        let state = HomeAssistantStateResponse {
            entity_id: "sun.sun".into(),
            state: "above_horizon".into(),
        };
        assert_eq!(
            HomeAssistantStateResponse::decode(&state.encode_to_vec()).unwrap(),
            state
        );
    }
}
