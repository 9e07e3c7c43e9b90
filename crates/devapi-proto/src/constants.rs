//! Protocol constants
//!
//! These constants define the framing bytes, message type identifiers and
//! wire types used by the device native API protocol.

// ============================================================================
// Framing
// ============================================================================

/// Every frame starts with this byte.
pub const PREAMBLE: u8 = 0x00;

/// Longest possible header: preamble + two 5-byte varints.
pub const MAX_HEADER_SIZE: usize = 11;

/// Largest payload a peer may announce. Longer frames close the connection.
pub const MAX_FRAME_PAYLOAD: usize = 64 * 1024;

/// Major protocol version announced in the hello response.
pub const API_VERSION_MAJOR: u32 = 1;
/// Minor protocol version announced in the hello response.
pub const API_VERSION_MINOR: u32 = 0;

/// Default TCP port the API server listens on.
pub const DEFAULT_PORT: u16 = 6053;

// ============================================================================
// Wire Types
// ============================================================================

/// Varint encoded scalar.
pub const WIRE_TYPE_VARINT: u32 = 0;
/// 64-bit little endian value (only ever skipped).
pub const WIRE_TYPE_FIXED64: u32 = 1;
/// Length prefixed bytes, strings and nested messages.
pub const WIRE_TYPE_LENGTH_DELIMITED: u32 = 2;
/// 32-bit little endian value (fixed32 and float).
pub const WIRE_TYPE_FIXED32: u32 = 5;

// ============================================================================
// Message Types
// ============================================================================

/// Client greeting, first message on every connection.
pub const MSG_HELLO_REQUEST: u32 = 1;
/// Device reply to the greeting.
pub const MSG_HELLO_RESPONSE: u32 = 2;
/// Authentication request carrying the password.
pub const MSG_CONNECT_REQUEST: u32 = 3;
/// Authentication result.
pub const MSG_CONNECT_RESPONSE: u32 = 4;
/// Either side asks to close the session.
pub const MSG_DISCONNECT_REQUEST: u32 = 5;
/// Acknowledges a disconnect request.
pub const MSG_DISCONNECT_RESPONSE: u32 = 6;
/// Keepalive probe.
pub const MSG_PING_REQUEST: u32 = 7;
/// Keepalive answer.
pub const MSG_PING_RESPONSE: u32 = 8;
/// Query device identity.
pub const MSG_DEVICE_INFO_REQUEST: u32 = 9;
/// Device identity.
pub const MSG_DEVICE_INFO_RESPONSE: u32 = 10;

/// Start the describe pass.
pub const MSG_LIST_ENTITIES_REQUEST: u32 = 11;
/// Binary sensor descriptor.
pub const MSG_LIST_ENTITIES_BINARY_SENSOR_RESPONSE: u32 = 12;
/// Cover descriptor.
pub const MSG_LIST_ENTITIES_COVER_RESPONSE: u32 = 13;
/// Fan descriptor.
pub const MSG_LIST_ENTITIES_FAN_RESPONSE: u32 = 14;
/// Light descriptor.
pub const MSG_LIST_ENTITIES_LIGHT_RESPONSE: u32 = 15;
/// Sensor descriptor.
pub const MSG_LIST_ENTITIES_SENSOR_RESPONSE: u32 = 16;
/// Switch descriptor.
pub const MSG_LIST_ENTITIES_SWITCH_RESPONSE: u32 = 17;
/// Text sensor descriptor.
pub const MSG_LIST_ENTITIES_TEXT_SENSOR_RESPONSE: u32 = 18;
/// Terminates the describe pass.
pub const MSG_LIST_ENTITIES_DONE_RESPONSE: u32 = 19;

/// Subscribe to entity state changes (starts the dump pass).
pub const MSG_SUBSCRIBE_STATES_REQUEST: u32 = 20;
/// Binary sensor state.
pub const MSG_BINARY_SENSOR_STATE_RESPONSE: u32 = 21;
/// Cover state.
pub const MSG_COVER_STATE_RESPONSE: u32 = 22;
/// Fan state.
pub const MSG_FAN_STATE_RESPONSE: u32 = 23;
/// Light state.
pub const MSG_LIGHT_STATE_RESPONSE: u32 = 24;
/// Sensor state.
pub const MSG_SENSOR_STATE_RESPONSE: u32 = 25;
/// Switch state.
pub const MSG_SWITCH_STATE_RESPONSE: u32 = 26;
/// Text sensor state.
pub const MSG_TEXT_SENSOR_STATE_RESPONSE: u32 = 27;

/// Subscribe to forwarded log lines.
pub const MSG_SUBSCRIBE_LOGS_REQUEST: u32 = 28;
/// A forwarded log line.
pub const MSG_SUBSCRIBE_LOGS_RESPONSE: u32 = 29;

/// Cover command.
pub const MSG_COVER_COMMAND_REQUEST: u32 = 30;
/// Fan command.
pub const MSG_FAN_COMMAND_REQUEST: u32 = 31;
/// Light command.
pub const MSG_LIGHT_COMMAND_REQUEST: u32 = 32;
/// Switch command.
pub const MSG_SWITCH_COMMAND_REQUEST: u32 = 33;

/// Subscribe to service calls emitted by the device.
pub const MSG_SUBSCRIBE_SERVICE_CALLS_REQUEST: u32 = 34;
/// A service call emitted by the device.
pub const MSG_SERVICE_CALL_RESPONSE: u32 = 35;
/// Device asks the controller for the current time.
pub const MSG_GET_TIME_REQUEST: u32 = 36;
/// Controller answers with the current time.
pub const MSG_GET_TIME_RESPONSE: u32 = 37;
/// Ask which controller states the device wants to follow.
pub const MSG_SUBSCRIBE_HOME_ASSISTANT_STATES_REQUEST: u32 = 38;
/// One followed controller entity.
pub const MSG_SUBSCRIBE_HOME_ASSISTANT_STATE_RESPONSE: u32 = 39;
/// State of a followed controller entity.
pub const MSG_HOME_ASSISTANT_STATE_RESPONSE: u32 = 40;
/// User-defined service descriptor.
pub const MSG_LIST_ENTITIES_SERVICES_RESPONSE: u32 = 41;
/// Invoke a user-defined service.
pub const MSG_EXECUTE_SERVICE_REQUEST: u32 = 42;
