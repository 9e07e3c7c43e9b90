//! Typed view of every message the device can receive.

use crate::basic::*;
use crate::commands::*;
use crate::entities::*;
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::ProtoMessage;
use crate::message_type::MessageType;
use crate::services::*;

/// A decoded message received by the device.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Hello(HelloRequest),
    Connect(ConnectRequest),
    Disconnect(DisconnectRequest),
    DisconnectAck(DisconnectResponse),
    Ping(PingRequest),
    Pong(PingResponse),
    DeviceInfo(DeviceInfoRequest),
    ListEntities(ListEntitiesRequest),
    SubscribeStates(SubscribeStatesRequest),
    SubscribeLogs(SubscribeLogsRequest),
    CoverCommand(CoverCommandRequest),
    FanCommand(FanCommandRequest),
    LightCommand(LightCommandRequest),
    SwitchCommand(SwitchCommandRequest),
    SubscribeServiceCalls(SubscribeServiceCallsRequest),
    Time(GetTimeResponse),
    SubscribeHomeAssistantStates(SubscribeHomeAssistantStatesRequest),
    HomeAssistantState(HomeAssistantStateResponse),
    ExecuteService(ExecuteServiceRequest),
}

impl Request {
    /// Decode the payload of a frame of type `message_type`.
    ///
    /// Types only the device sends are rejected with
    /// [`ProtocolError::NotARequest`].
    pub fn decode(message_type: MessageType, payload: &[u8]) -> ProtocolResult<Self> {
        use MessageType as T;
        let request = match message_type {
            T::HelloRequest => Request::Hello(HelloRequest::decode(payload)?),
            T::ConnectRequest => Request::Connect(ConnectRequest::decode(payload)?),
            T::DisconnectRequest => Request::Disconnect(DisconnectRequest::decode(payload)?),
            T::DisconnectResponse => Request::DisconnectAck(DisconnectResponse::decode(payload)?),
            T::PingRequest => Request::Ping(PingRequest::decode(payload)?),
            T::PingResponse => Request::Pong(PingResponse::decode(payload)?),
            T::DeviceInfoRequest => Request::DeviceInfo(DeviceInfoRequest::decode(payload)?),
            T::ListEntitiesRequest => Request::ListEntities(ListEntitiesRequest::decode(payload)?),
            T::SubscribeStatesRequest => {
                Request::SubscribeStates(SubscribeStatesRequest::decode(payload)?)
            }
            T::SubscribeLogsRequest => {
                Request::SubscribeLogs(SubscribeLogsRequest::decode(payload)?)
            }
            T::CoverCommandRequest => Request::CoverCommand(CoverCommandRequest::decode(payload)?),
            T::FanCommandRequest => Request::FanCommand(FanCommandRequest::decode(payload)?),
            T::LightCommandRequest => Request::LightCommand(LightCommandRequest::decode(payload)?),
            T::SwitchCommandRequest => {
                Request::SwitchCommand(SwitchCommandRequest::decode(payload)?)
            }
            T::SubscribeServiceCallsRequest => {
                Request::SubscribeServiceCalls(SubscribeServiceCallsRequest::decode(payload)?)
            }
            T::GetTimeResponse => Request::Time(GetTimeResponse::decode(payload)?),
            T::SubscribeHomeAssistantStatesRequest => Request::SubscribeHomeAssistantStates(
                SubscribeHomeAssistantStatesRequest::decode(payload)?,
            ),
            T::HomeAssistantStateResponse => {
                Request::HomeAssistantState(HomeAssistantStateResponse::decode(payload)?)
            }
            T::ExecuteServiceRequest => {
                Request::ExecuteService(ExecuteServiceRequest::decode(payload)?)
            }
            other => return Err(ProtocolError::NotARequest(other.id())),
        };
        Ok(request)
    }

    /// Message type this request arrived as.
    pub fn message_type(&self) -> MessageType {
        use MessageType as T;
        match self {
            Request::Hello(_) => T::HelloRequest,
            Request::Connect(_) => T::ConnectRequest,
            Request::Disconnect(_) => T::DisconnectRequest,
            Request::DisconnectAck(_) => T::DisconnectResponse,
            Request::Ping(_) => T::PingRequest,
            Request::Pong(_) => T::PingResponse,
            Request::DeviceInfo(_) => T::DeviceInfoRequest,
            Request::ListEntities(_) => T::ListEntitiesRequest,
            Request::SubscribeStates(_) => T::SubscribeStatesRequest,
            Request::SubscribeLogs(_) => T::SubscribeLogsRequest,
            Request::CoverCommand(_) => T::CoverCommandRequest,
            Request::FanCommand(_) => T::FanCommandRequest,
            Request::LightCommand(_) => T::LightCommandRequest,
            Request::SwitchCommand(_) => T::SwitchCommandRequest,
            Request::SubscribeServiceCalls(_) => T::SubscribeServiceCallsRequest,
            Request::Time(_) => T::GetTimeResponse,
            Request::SubscribeHomeAssistantStates(_) => T::SubscribeHomeAssistantStatesRequest,
            Request::HomeAssistantState(_) => T::HomeAssistantStateResponse,
            Request::ExecuteService(_) => T::ExecuteServiceRequest,
        }
    }
}
