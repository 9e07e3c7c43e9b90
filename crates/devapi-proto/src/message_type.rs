//! Message type identifiers and their direction.

use std::fmt;

use crate::constants::*;
use crate::error::{ProtocolError, ProtocolResult};

/// Which side of the link may send a message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Only the controller sends it; the device receives it.
    ToDevice,
    /// Only the device sends it.
    FromDevice,
    /// Either side may send it.
    Both,
}

/// Every message type of the native API protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    HelloRequest = MSG_HELLO_REQUEST,
    HelloResponse = MSG_HELLO_RESPONSE,
    ConnectRequest = MSG_CONNECT_REQUEST,
    ConnectResponse = MSG_CONNECT_RESPONSE,
    DisconnectRequest = MSG_DISCONNECT_REQUEST,
    DisconnectResponse = MSG_DISCONNECT_RESPONSE,
    PingRequest = MSG_PING_REQUEST,
    PingResponse = MSG_PING_RESPONSE,
    DeviceInfoRequest = MSG_DEVICE_INFO_REQUEST,
    DeviceInfoResponse = MSG_DEVICE_INFO_RESPONSE,
    ListEntitiesRequest = MSG_LIST_ENTITIES_REQUEST,
    ListEntitiesBinarySensorResponse = MSG_LIST_ENTITIES_BINARY_SENSOR_RESPONSE,
    ListEntitiesCoverResponse = MSG_LIST_ENTITIES_COVER_RESPONSE,
    ListEntitiesFanResponse = MSG_LIST_ENTITIES_FAN_RESPONSE,
    ListEntitiesLightResponse = MSG_LIST_ENTITIES_LIGHT_RESPONSE,
    ListEntitiesSensorResponse = MSG_LIST_ENTITIES_SENSOR_RESPONSE,
    ListEntitiesSwitchResponse = MSG_LIST_ENTITIES_SWITCH_RESPONSE,
    ListEntitiesTextSensorResponse = MSG_LIST_ENTITIES_TEXT_SENSOR_RESPONSE,
    ListEntitiesDoneResponse = MSG_LIST_ENTITIES_DONE_RESPONSE,
    SubscribeStatesRequest = MSG_SUBSCRIBE_STATES_REQUEST,
    BinarySensorStateResponse = MSG_BINARY_SENSOR_STATE_RESPONSE,
    CoverStateResponse = MSG_COVER_STATE_RESPONSE,
    FanStateResponse = MSG_FAN_STATE_RESPONSE,
    LightStateResponse = MSG_LIGHT_STATE_RESPONSE,
    SensorStateResponse = MSG_SENSOR_STATE_RESPONSE,
    SwitchStateResponse = MSG_SWITCH_STATE_RESPONSE,
    TextSensorStateResponse = MSG_TEXT_SENSOR_STATE_RESPONSE,
    SubscribeLogsRequest = MSG_SUBSCRIBE_LOGS_REQUEST,
    SubscribeLogsResponse = MSG_SUBSCRIBE_LOGS_RESPONSE,
    CoverCommandRequest = MSG_COVER_COMMAND_REQUEST,
    FanCommandRequest = MSG_FAN_COMMAND_REQUEST,
    LightCommandRequest = MSG_LIGHT_COMMAND_REQUEST,
    SwitchCommandRequest = MSG_SWITCH_COMMAND_REQUEST,
    SubscribeServiceCallsRequest = MSG_SUBSCRIBE_SERVICE_CALLS_REQUEST,
    ServiceCallResponse = MSG_SERVICE_CALL_RESPONSE,
    GetTimeRequest = MSG_GET_TIME_REQUEST,
    GetTimeResponse = MSG_GET_TIME_RESPONSE,
    SubscribeHomeAssistantStatesRequest = MSG_SUBSCRIBE_HOME_ASSISTANT_STATES_REQUEST,
    SubscribeHomeAssistantStateResponse = MSG_SUBSCRIBE_HOME_ASSISTANT_STATE_RESPONSE,
    HomeAssistantStateResponse = MSG_HOME_ASSISTANT_STATE_RESPONSE,
    ListEntitiesServicesResponse = MSG_LIST_ENTITIES_SERVICES_RESPONSE,
    ExecuteServiceRequest = MSG_EXECUTE_SERVICE_REQUEST,
}

impl MessageType {
    /// All message types in id order.
    pub const ALL: [MessageType; 42] = [
        MessageType::HelloRequest,
        MessageType::HelloResponse,
        MessageType::ConnectRequest,
        MessageType::ConnectResponse,
        MessageType::DisconnectRequest,
        MessageType::DisconnectResponse,
        MessageType::PingRequest,
        MessageType::PingResponse,
        MessageType::DeviceInfoRequest,
        MessageType::DeviceInfoResponse,
        MessageType::ListEntitiesRequest,
        MessageType::ListEntitiesBinarySensorResponse,
        MessageType::ListEntitiesCoverResponse,
        MessageType::ListEntitiesFanResponse,
        MessageType::ListEntitiesLightResponse,
        MessageType::ListEntitiesSensorResponse,
        MessageType::ListEntitiesSwitchResponse,
        MessageType::ListEntitiesTextSensorResponse,
        MessageType::ListEntitiesDoneResponse,
        MessageType::SubscribeStatesRequest,
        MessageType::BinarySensorStateResponse,
        MessageType::CoverStateResponse,
        MessageType::FanStateResponse,
        MessageType::LightStateResponse,
        MessageType::SensorStateResponse,
        MessageType::SwitchStateResponse,
        MessageType::TextSensorStateResponse,
        MessageType::SubscribeLogsRequest,
        MessageType::SubscribeLogsResponse,
        MessageType::CoverCommandRequest,
        MessageType::FanCommandRequest,
        MessageType::LightCommandRequest,
        MessageType::SwitchCommandRequest,
        MessageType::SubscribeServiceCallsRequest,
        MessageType::ServiceCallResponse,
        MessageType::GetTimeRequest,
        MessageType::GetTimeResponse,
        MessageType::SubscribeHomeAssistantStatesRequest,
        MessageType::SubscribeHomeAssistantStateResponse,
        MessageType::HomeAssistantStateResponse,
        MessageType::ListEntitiesServicesResponse,
        MessageType::ExecuteServiceRequest,
    ];

    /// Look up a message type by its wire id.
    pub fn from_u32(id: u32) -> Option<Self> {
        if id == 0 {
            return None;
        }
        Self::ALL.get(id as usize - 1).copied()
    }

    /// Like [`MessageType::from_u32`], but an unknown id is an error.
    pub fn try_from_u32(id: u32) -> ProtocolResult<Self> {
        Self::from_u32(id).ok_or(ProtocolError::UnknownMessageType(id))
    }

    /// Wire id.
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Which side sends this message type.
    pub fn direction(self) -> Direction {
        use MessageType::*;
        match self {
            DisconnectRequest | DisconnectResponse | PingRequest | PingResponse => Direction::Both,
            HelloRequest
            | ConnectRequest
            | DeviceInfoRequest
            | ListEntitiesRequest
            | SubscribeStatesRequest
            | SubscribeLogsRequest
            | CoverCommandRequest
            | FanCommandRequest
            | LightCommandRequest
            | SwitchCommandRequest
            | SubscribeServiceCallsRequest
            | GetTimeResponse
            | SubscribeHomeAssistantStatesRequest
            | HomeAssistantStateResponse
            | ExecuteServiceRequest => Direction::ToDevice,
            _ => Direction::FromDevice,
        }
    }

    /// Whether the device may ever receive this message type.
    pub fn is_receivable(self) -> bool {
        self.direction() != Direction::FromDevice
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.id())
    }
}

impl TryFrom<u32> for MessageType {
    type Error = ProtocolError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Self::try_from_u32(id)
    }
}

impl From<MessageType> for u32 {
    fn from(t: MessageType) -> u32 {
        t.id()
    }
}
