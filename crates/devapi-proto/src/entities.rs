//! Entity listing and state messages.
//!
//! Every listing response starts with the same four fields (object id, key,
//! name, unique id), kept in [`EntityListing`]. Every state response starts
//! with the entity key on field 1.

use crate::codec::{as_float, as_string, ProtoWriter};
use crate::error::ProtocolResult;
use crate::message::{empty_message, Message, ProtoMessage};
use crate::message_type::MessageType;
use crate::types::{CoverState, FanSpeed};

empty_message!(
    /// Start the describe pass.
    ListEntitiesRequest => ListEntitiesRequest
);
empty_message!(
    /// Ends the describe pass.
    ListEntitiesDoneResponse => ListEntitiesDoneResponse
);
empty_message!(
    /// Subscribe to state changes. The device replies with every current state.
    SubscribeStatesRequest => SubscribeStatesRequest
);

/// Fields 1 to 4 shared by every listing response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityListing {
    pub object_id: String,
    pub key: u32,
    pub name: String,
    pub unique_id: String,
}

impl EntityListing {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.string(1, &self.object_id);
        w.fixed32(2, self.key);
        w.string(3, &self.name);
        w.string(4, &self.unique_id);
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        let target = match field {
            1 => &mut self.object_id,
            3 => &mut self.name,
            4 => &mut self.unique_id,
            _ => return Ok(false),
        };
        *target = as_string(field, value)?;
        Ok(true)
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        if field == 2 {
            self.key = value;
            return true;
        }
        false
    }
}

// ============================================================================
// Listing responses
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEntitiesBinarySensorResponse {
    pub listing: EntityListing,
    pub device_class: String,
    pub is_status_binary_sensor: bool,
}

impl ProtoMessage for ListEntitiesBinarySensorResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        self.listing.encode(w);
        w.string(5, &self.device_class);
        w.bool(6, self.is_status_binary_sensor);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            6 => self.is_status_binary_sensor = value != 0,
            _ => return false,
        }
        true
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        if field == 5 {
            self.device_class = as_string(field, value)?;
            return Ok(true);
        }
        self.listing.decode_length_delimited(field, value)
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        self.listing.decode_fixed32(field, value)
    }
}

impl Message for ListEntitiesBinarySensorResponse {
    const MESSAGE_TYPE: MessageType = MessageType::ListEntitiesBinarySensorResponse;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEntitiesCoverResponse {
    pub listing: EntityListing,
    pub assumed_state: bool,
}

impl ProtoMessage for ListEntitiesCoverResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        self.listing.encode(w);
        w.bool(5, self.assumed_state);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            5 => self.assumed_state = value != 0,
            _ => return false,
        }
        true
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        self.listing.decode_length_delimited(field, value)
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        self.listing.decode_fixed32(field, value)
    }
}

impl Message for ListEntitiesCoverResponse {
    const MESSAGE_TYPE: MessageType = MessageType::ListEntitiesCoverResponse;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEntitiesFanResponse {
    pub listing: EntityListing,
    pub supports_oscillation: bool,
    pub supports_speed: bool,
}

impl ProtoMessage for ListEntitiesFanResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        self.listing.encode(w);
        w.bool(5, self.supports_oscillation);
        w.bool(6, self.supports_speed);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            5 => self.supports_oscillation = value != 0,
            6 => self.supports_speed = value != 0,
            _ => return false,
        }
        true
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        self.listing.decode_length_delimited(field, value)
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        self.listing.decode_fixed32(field, value)
    }
}

impl Message for ListEntitiesFanResponse {
    const MESSAGE_TYPE: MessageType = MessageType::ListEntitiesFanResponse;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListEntitiesLightResponse {
    pub listing: EntityListing,
    pub supports_brightness: bool,
    pub supports_rgb: bool,
    pub supports_white_value: bool,
    pub supports_color_temperature: bool,
    pub min_mireds: f32,
    pub max_mireds: f32,
    /// Effect names. Lights with effects list `"None"` first.
    pub effects: Vec<String>,
}

impl ProtoMessage for ListEntitiesLightResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        self.listing.encode(w);
        w.bool(5, self.supports_brightness);
        w.bool(6, self.supports_rgb);
        w.bool(7, self.supports_white_value);
        w.bool(8, self.supports_color_temperature);
        w.float(9, self.min_mireds);
        w.float(10, self.max_mireds);
        for effect in &self.effects {
            w.string(11, effect);
        }
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        let flag = value != 0;
        match field {
            5 => self.supports_brightness = flag,
            6 => self.supports_rgb = flag,
            7 => self.supports_white_value = flag,
            8 => self.supports_color_temperature = flag,
            _ => return false,
        }
        true
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        if field == 11 {
            self.effects.push(as_string(field, value)?);
            return Ok(true);
        }
        self.listing.decode_length_delimited(field, value)
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        match field {
            9 => self.min_mireds = as_float(value),
            10 => self.max_mireds = as_float(value),
            _ => return self.listing.decode_fixed32(field, value),
        }
        true
    }
}

impl Message for ListEntitiesLightResponse {
    const MESSAGE_TYPE: MessageType = MessageType::ListEntitiesLightResponse;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEntitiesSensorResponse {
    pub listing: EntityListing,
    pub icon: String,
    pub unit_of_measurement: String,
    pub accuracy_decimals: i32,
}

impl ProtoMessage for ListEntitiesSensorResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        self.listing.encode(w);
        w.string(5, &self.icon);
        w.string(6, &self.unit_of_measurement);
        w.int32(7, self.accuracy_decimals);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            7 => self.accuracy_decimals = value as i32,
            _ => return false,
        }
        true
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            5 => self.icon = as_string(field, value)?,
            6 => self.unit_of_measurement = as_string(field, value)?,
            _ => return self.listing.decode_length_delimited(field, value),
        }
        Ok(true)
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        self.listing.decode_fixed32(field, value)
    }
}

impl Message for ListEntitiesSensorResponse {
    const MESSAGE_TYPE: MessageType = MessageType::ListEntitiesSensorResponse;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEntitiesSwitchResponse {
    pub listing: EntityListing,
    pub icon: String,
    pub assumed_state: bool,
}

impl ProtoMessage for ListEntitiesSwitchResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        self.listing.encode(w);
        w.string(5, &self.icon);
        w.bool(6, self.assumed_state);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            6 => self.assumed_state = value != 0,
            _ => return false,
        }
        true
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        if field == 5 {
            self.icon = as_string(field, value)?;
            return Ok(true);
        }
        self.listing.decode_length_delimited(field, value)
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        self.listing.decode_fixed32(field, value)
    }
}

impl Message for ListEntitiesSwitchResponse {
    const MESSAGE_TYPE: MessageType = MessageType::ListEntitiesSwitchResponse;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEntitiesTextSensorResponse {
    pub listing: EntityListing,
    pub icon: String,
}

impl ProtoMessage for ListEntitiesTextSensorResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        self.listing.encode(w);
        w.string(5, &self.icon);
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        if field == 5 {
            self.icon = as_string(field, value)?;
            return Ok(true);
        }
        self.listing.decode_length_delimited(field, value)
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        self.listing.decode_fixed32(field, value)
    }
}

impl Message for ListEntitiesTextSensorResponse {
    const MESSAGE_TYPE: MessageType = MessageType::ListEntitiesTextSensorResponse;
}

// ============================================================================
// State responses
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinarySensorStateResponse {
    pub key: u32,
    pub state: bool,
}

impl ProtoMessage for BinarySensorStateResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.fixed32(1, self.key);
        w.bool(2, self.state);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            2 => self.state = value != 0,
            _ => return false,
        }
        true
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        match field {
            1 => self.key = value,
            _ => return false,
        }
        true
    }
}

impl Message for BinarySensorStateResponse {
    const MESSAGE_TYPE: MessageType = MessageType::BinarySensorStateResponse;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverStateResponse {
    pub key: u32,
    pub state: CoverState,
}

impl ProtoMessage for CoverStateResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.fixed32(1, self.key);
        w.uint32(2, self.state.as_u32());
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            2 => self.state = CoverState::from_u32(value),
            _ => return false,
        }
        true
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        match field {
            1 => self.key = value,
            _ => return false,
        }
        true
    }
}

impl Message for CoverStateResponse {
    const MESSAGE_TYPE: MessageType = MessageType::CoverStateResponse;
}

/// Fan state. `oscillating` and `speed` are left at their defaults when the
/// fan does not support them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanStateResponse {
    pub key: u32,
    pub state: bool,
    pub oscillating: bool,
    pub speed: FanSpeed,
}

impl ProtoMessage for FanStateResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.fixed32(1, self.key);
        w.bool(2, self.state);
        w.bool(3, self.oscillating);
        w.uint32(4, self.speed.as_u32());
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            2 => self.state = value != 0,
            3 => self.oscillating = value != 0,
            4 => self.speed = FanSpeed::from_u32(value).unwrap_or_default(),
            _ => return false,
        }
        true
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        match field {
            1 => self.key = value,
            _ => return false,
        }
        true
    }
}

impl Message for FanStateResponse {
    const MESSAGE_TYPE: MessageType = MessageType::FanStateResponse;
}

/// Light state. Channels the light does not support stay at zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightStateResponse {
    pub key: u32,
    pub state: bool,
    pub brightness: f32,
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub white: f32,
    pub color_temperature: f32,
    pub effect: String,
}

impl ProtoMessage for LightStateResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.fixed32(1, self.key);
        w.bool(2, self.state);
        w.float(3, self.brightness);
        w.float(4, self.red);
        w.float(5, self.green);
        w.float(6, self.blue);
        w.float(7, self.white);
        w.float(8, self.color_temperature);
        w.string(9, &self.effect);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            2 => self.state = value != 0,
            _ => return false,
        }
        true
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            9 => self.effect = as_string(field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        let target = match field {
            1 => {
                self.key = value;
                return true;
            }
            3 => &mut self.brightness,
            4 => &mut self.red,
            5 => &mut self.green,
            6 => &mut self.blue,
            7 => &mut self.white,
            8 => &mut self.color_temperature,
            _ => return false,
        };
        *target = as_float(value);
        true
    }
}

impl Message for LightStateResponse {
    const MESSAGE_TYPE: MessageType = MessageType::LightStateResponse;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorStateResponse {
    pub key: u32,
    pub state: f32,
}

impl ProtoMessage for SensorStateResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.fixed32(1, self.key);
        w.float(2, self.state);
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        match field {
            1 => self.key = value,
            2 => self.state = as_float(value),
            _ => return false,
        }
        true
    }
}

impl Message for SensorStateResponse {
    const MESSAGE_TYPE: MessageType = MessageType::SensorStateResponse;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchStateResponse {
    pub key: u32,
    pub state: bool,
}

impl ProtoMessage for SwitchStateResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.fixed32(1, self.key);
        w.bool(2, self.state);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            2 => self.state = value != 0,
            _ => return false,
        }
        true
    }

    fn decode_fixed32(&mut self, field: u32, value: u32) -> bool {
        match field {
            1 => self.key = value,
            _ => return false,
        }
        true
    }
}

impl Message for SwitchStateResponse {
    const MESSAGE_TYPE: MessageType = MessageType::SwitchStateResponse;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextSensorStateResponse {
    pub key: u32,
    pub state: String,
}

impl ProtoMessage for TextSensorStateResponse {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.fixed32(1, self.key);
        w.string(2, &self.state);
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            2 => self.state = as_string(field, value)?,
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

impl Message for TextSensorStateResponse {
    const MESSAGE_TYPE: MessageType = MessageType::TextSensorStateResponse;
}
