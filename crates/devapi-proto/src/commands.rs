//! Entity command requests.
//!
//! Optional fields are paired with a `has_*` flag on the wire. The accessor
//! methods fold each pair into an `Option`.

use crate::codec::{as_float, as_string, ProtoWriter};
use crate::error::ProtocolResult;
use crate::message::{Message, ProtoMessage};
use crate::message_type::MessageType;
use crate::types::{CoverCommand, FanSpeed};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverCommandRequest {
    pub key: u32,
    pub has_state: bool,
    /// Raw [`CoverCommand`] value.
    pub command: u32,
}

impl CoverCommandRequest {
    /// Requested action, if one was sent and is known.
    pub fn command(&self) -> Option<CoverCommand> {
        if !self.has_state {
            return None;
        }
        CoverCommand::from_u32(self.command)
    }
}

impl ProtoMessage for CoverCommandRequest {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.fixed32(1, self.key);
        w.bool(2, self.has_state);
        w.uint32(3, self.command);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            2 => self.has_state = value != 0,
            3 => self.command = value,
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

impl Message for CoverCommandRequest {
    const MESSAGE_TYPE: MessageType = MessageType::CoverCommandRequest;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanCommandRequest {
    pub key: u32,
    pub has_state: bool,
    pub state: bool,
    pub has_speed: bool,
    /// Raw [`FanSpeed`] value.
    pub speed: u32,
    pub has_oscillating: bool,
    pub oscillating: bool,
}

impl FanCommandRequest {
    pub fn state(&self) -> Option<bool> {
        self.has_state.then_some(self.state)
    }

    /// Requested speed. Unknown values read as not set.
    pub fn speed(&self) -> Option<FanSpeed> {
        if !self.has_speed {
            return None;
        }
        FanSpeed::from_u32(self.speed)
    }

    pub fn oscillating(&self) -> Option<bool> {
        self.has_oscillating.then_some(self.oscillating)
    }
}

impl ProtoMessage for FanCommandRequest {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.fixed32(1, self.key);
        w.bool(2, self.has_state);
        w.bool(3, self.state);
        w.bool(4, self.has_speed);
        w.uint32(5, self.speed);
        w.bool(6, self.has_oscillating);
        w.bool(7, self.oscillating);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        match field {
            2 => self.has_state = value != 0,
            3 => self.state = value != 0,
            4 => self.has_speed = value != 0,
            5 => self.speed = value,
            6 => self.has_oscillating = value != 0,
            7 => self.oscillating = value != 0,
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

impl Message for FanCommandRequest {
    const MESSAGE_TYPE: MessageType = MessageType::FanCommandRequest;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightCommandRequest {
    pub key: u32,
    pub has_state: bool,
    pub state: bool,
    pub has_brightness: bool,
    pub brightness: f32,
    pub has_rgb: bool,
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub has_white: bool,
    pub white: f32,
    pub has_color_temperature: bool,
    pub color_temperature: f32,
    pub has_transition_length: bool,
    /// Milliseconds.
    pub transition_length: u32,
    pub has_flash_length: bool,
    /// Milliseconds.
    pub flash_length: u32,
    pub has_effect: bool,
    pub effect: String,
}

impl LightCommandRequest {
    pub fn state(&self) -> Option<bool> {
        self.has_state.then_some(self.state)
    }

    pub fn brightness(&self) -> Option<f32> {
        self.has_brightness.then_some(self.brightness)
    }

    /// Red, green and blue, sent together.
    pub fn rgb(&self) -> Option<(f32, f32, f32)> {
        self.has_rgb.then_some((self.red, self.green, self.blue))
    }

    pub fn white(&self) -> Option<f32> {
        self.has_white.then_some(self.white)
    }

    pub fn color_temperature(&self) -> Option<f32> {
        self.has_color_temperature.then_some(self.color_temperature)
    }

    pub fn transition_length(&self) -> Option<u32> {
        self.has_transition_length.then_some(self.transition_length)
    }

    pub fn flash_length(&self) -> Option<u32> {
        self.has_flash_length.then_some(self.flash_length)
    }

    pub fn effect(&self) -> Option<&str> {
        self.has_effect.then_some(self.effect.as_str())
    }
}

impl ProtoMessage for LightCommandRequest {
    fn encode(&self, w: &mut ProtoWriter<'_>) {
        w.fixed32(1, self.key);
        w.bool(2, self.has_state);
        w.bool(3, self.state);
        w.bool(4, self.has_brightness);
        w.float(5, self.brightness);
        w.bool(6, self.has_rgb);
        w.float(7, self.red);
        w.float(8, self.green);
        w.float(9, self.blue);
        w.bool(10, self.has_white);
        w.float(11, self.white);
        w.bool(12, self.has_color_temperature);
        w.float(13, self.color_temperature);
        w.bool(14, self.has_transition_length);
        w.uint32(15, self.transition_length);
        w.bool(16, self.has_flash_length);
        w.uint32(17, self.flash_length);
        w.bool(18, self.has_effect);
        w.string(19, &self.effect);
    }

    fn decode_varint(&mut self, field: u32, value: u32) -> bool {
        let flag = value != 0;
        match field {
            2 => self.has_state = flag,
            3 => self.state = flag,
            4 => self.has_brightness = flag,
            6 => self.has_rgb = flag,
            10 => self.has_white = flag,
            12 => self.has_color_temperature = flag,
            14 => self.has_transition_length = flag,
            15 => self.transition_length = value,
            16 => self.has_flash_length = flag,
            17 => self.flash_length = value,
            18 => self.has_effect = flag,
            _ => return false,
        }
        true
    }

    fn decode_length_delimited(&mut self, field: u32, value: &[u8]) -> ProtocolResult<bool> {
        match field {
            19 => self.effect = as_string(field, value)?,
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
            5 => &mut self.brightness,
            7 => &mut self.red,
            8 => &mut self.green,
            9 => &mut self.blue,
            11 => &mut self.white,
            13 => &mut self.color_temperature,
            _ => return false,
        };
        *target = as_float(value);
        true
    }
}

impl Message for LightCommandRequest {
    const MESSAGE_TYPE: MessageType = MessageType::LightCommandRequest;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchCommandRequest {
    pub key: u32,
    pub state: bool,
}

impl ProtoMessage for SwitchCommandRequest {
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

impl Message for SwitchCommandRequest {
    const MESSAGE_TYPE: MessageType = MessageType::SwitchCommandRequest;
}
