//! Entity model.
//!
//! The server does not own entity behaviour. Each domain is a small trait
//! exposing exactly what the API needs to describe an entity, report its state
//! and, for actuators, forward a command. Implementations live with the
//! drivers and use interior mutability, since the server only holds shared
//! handles.

use std::sync::Arc;

use devapi_proto::{
    CoverCommand, CoverCommandRequest, CoverState, FanCommandRequest, FanSpeed,
    LightCommandRequest, SwitchCommandRequest,
};

use crate::error::{ServerError, ServerResult};

/// FNV-1 offset basis.
const FNV1_OFFSET_BASIS: u32 = 2_166_136_261;
/// FNV-1 prime.
const FNV1_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1 hash (multiply, then xor).
pub fn fnv1_hash(s: &str) -> u32 {
    s.bytes().fold(FNV1_OFFSET_BASIS, |hash, byte| {
        hash.wrapping_mul(FNV1_PRIME) ^ u32::from(byte)
    })
}

/// Derive an object id from a display name.
///
/// Lowercases, turns spaces into underscores and drops everything outside
/// `[a-z0-9_-]`.
pub fn sanitize_object_id(name: &str) -> String {
    name.chars()
        .map(|c| if c == ' ' { '_' } else { c.to_ascii_lowercase() })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Identity shared by every entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    name: String,
    object_id: String,
    key: u32,
    internal: bool,
    unique_id: Option<String>,
}

impl EntityInfo {
    /// Identity for a visible entity called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let object_id = sanitize_object_id(&name);
        let key = fnv1_hash(&object_id);
        EntityInfo {
            name,
            object_id,
            key,
            internal: false,
            unique_id: None,
        }
    }

    /// Hide the entity from clients.
    pub fn with_internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }

    /// Override the default unique id.
    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn key(&self) -> u32 {
        self.key
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// Unique id reported to clients: the override if set, otherwise
    /// `<device name><domain><object id>`.
    pub fn unique_id(&self, device_name: &str, domain: &str) -> String {
        match &self.unique_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{}{}{}", device_name, domain, self.object_id),
        }
    }
}

/// Common entity behaviour.
pub trait Entity: Send + Sync {
    fn info(&self) -> &EntityInfo;

    fn is_internal(&self) -> bool {
        self.info().is_internal()
    }

    fn key(&self) -> u32 {
        self.info().key()
    }
}

// ============================================================================
// Call objects
// ============================================================================

/// Cover command forwarded to [`Cover::control`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverCall {
    pub command: CoverCommand,
}

impl CoverCall {
    /// Build from a request. `None` when the request carries no usable command.
    pub fn from_request(req: &CoverCommandRequest) -> Option<Self> {
        req.command().map(|command| CoverCall { command })
    }
}

/// Fan command. `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanCall {
    pub state: Option<bool>,
    pub speed: Option<FanSpeed>,
    pub oscillating: Option<bool>,
}

impl From<&FanCommandRequest> for FanCall {
    fn from(req: &FanCommandRequest) -> Self {
        FanCall {
            state: req.state(),
            speed: req.speed(),
            oscillating: req.oscillating(),
        }
    }
}

/// Light command. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightCall {
    pub state: Option<bool>,
    pub brightness: Option<f32>,
    pub rgb: Option<(f32, f32, f32)>,
    pub white: Option<f32>,
    pub color_temperature: Option<f32>,
    /// Milliseconds.
    pub transition_length: Option<u32>,
    /// Milliseconds.
    pub flash_length: Option<u32>,
    pub effect: Option<String>,
}

impl From<&LightCommandRequest> for LightCall {
    fn from(req: &LightCommandRequest) -> Self {
        LightCall {
            state: req.state(),
            brightness: req.brightness(),
            rgb: req.rgb(),
            white: req.white(),
            color_temperature: req.color_temperature(),
            transition_length: req.transition_length(),
            flash_length: req.flash_length(),
            effect: req.effect().map(str::to_string),
        }
    }
}

/// Switch command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchCall {
    pub state: bool,
}

impl From<&SwitchCommandRequest> for SwitchCall {
    fn from(req: &SwitchCommandRequest) -> Self {
        SwitchCall { state: req.state }
    }
}

// ============================================================================
// Domains
// ============================================================================

pub trait BinarySensor: Entity {
    fn device_class(&self) -> String {
        String::new()
    }

    fn is_status_binary_sensor(&self) -> bool {
        false
    }

    /// Current state, `None` until the first reading.
    fn state(&self) -> Option<bool>;
}

pub trait Cover: Entity {
    fn assumed_state(&self) -> bool {
        false
    }

    /// Current position, `None` until known.
    fn state(&self) -> Option<CoverState>;

    fn control(&self, call: CoverCall);
}

/// Optional fan capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanTraits {
    pub supports_oscillation: bool,
    pub supports_speed: bool,
}

/// Fan state as reported to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanValues {
    pub state: bool,
    pub oscillating: bool,
    pub speed: FanSpeed,
}

pub trait Fan: Entity {
    fn traits(&self) -> FanTraits;

    fn values(&self) -> FanValues;

    fn control(&self, call: FanCall);
}

/// Optional light capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LightTraits {
    pub supports_brightness: bool,
    pub supports_rgb: bool,
    pub supports_white_value: bool,
    pub supports_color_temperature: bool,
    pub min_mireds: f32,
    pub max_mireds: f32,
}

/// Light output as reported to clients.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightValues {
    pub state: bool,
    pub brightness: f32,
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub white: f32,
    pub color_temperature: f32,
    /// Active effect name, empty for none.
    pub effect: String,
}

pub trait Light: Entity {
    fn traits(&self) -> LightTraits;

    /// Effect names, without the implicit `"None"` entry.
    fn effects(&self) -> Vec<String> {
        Vec::new()
    }

    fn values(&self) -> LightValues;

    fn control(&self, call: LightCall);
}

pub trait Sensor: Entity {
    fn icon(&self) -> String {
        String::new()
    }

    fn unit_of_measurement(&self) -> String {
        String::new()
    }

    fn accuracy_decimals(&self) -> i32 {
        0
    }

    /// Latest reading, `None` until the first one.
    fn state(&self) -> Option<f32>;
}

pub trait Switch: Entity {
    fn icon(&self) -> String {
        String::new()
    }

    fn assumed_state(&self) -> bool {
        false
    }

    fn state(&self) -> bool;

    fn control(&self, call: SwitchCall);
}

pub trait TextSensor: Entity {
    fn icon(&self) -> String {
        String::new()
    }

    /// Latest value, `None` until the first one.
    fn state(&self) -> Option<String>;
}

// ============================================================================
// Registry
// ============================================================================

/// All entities exposed over the API, per domain in registration order.
#[derive(Default)]
pub struct EntityRegistry {
    binary_sensors: Vec<Arc<dyn BinarySensor>>,
    covers: Vec<Arc<dyn Cover>>,
    fans: Vec<Arc<dyn Fan>>,
    lights: Vec<Arc<dyn Light>>,
    sensors: Vec<Arc<dyn Sensor>>,
    switches: Vec<Arc<dyn Switch>>,
    text_sensors: Vec<Arc<dyn TextSensor>>,
}

fn check_unique<T: Entity + ?Sized>(existing: &[Arc<T>], entity: &T) -> ServerResult<()> {
    if existing.iter().any(|e| e.key() == entity.key()) {
        return Err(ServerError::DuplicateKey {
            key: entity.key(),
            name: entity.info().name().to_string(),
        });
    }
    Ok(())
}

macro_rules! domain_accessors {
    ($field:ident, $trait:ident, $register:ident, $by_key:ident) => {
        /// Register an entity. Keys must be unique within the domain.
        pub fn $register(&mut self, entity: Arc<dyn $trait>) -> ServerResult<()> {
            check_unique(&self.$field, entity.as_ref())?;
            self.$field.push(entity);
            Ok(())
        }

        pub fn $field(&self) -> &[Arc<dyn $trait>] {
            &self.$field
        }

        pub fn $by_key(&self, key: u32) -> Option<&Arc<dyn $trait>> {
            self.$field.iter().find(|e| e.key() == key)
        }
    };
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    domain_accessors!(binary_sensors, BinarySensor, register_binary_sensor, binary_sensor_by_key);
    domain_accessors!(covers, Cover, register_cover, cover_by_key);
    domain_accessors!(fans, Fan, register_fan, fan_by_key);
    domain_accessors!(lights, Light, register_light, light_by_key);
    domain_accessors!(sensors, Sensor, register_sensor, sensor_by_key);
    domain_accessors!(switches, Switch, register_switch, switch_by_key);
    domain_accessors!(text_sensors, TextSensor, register_text_sensor, text_sensor_by_key);

    /// Number of entities across all domains, internal ones included.
    pub fn len(&self) -> usize {
        self.binary_sensors.len()
            + self.covers.len()
            + self.fans.len()
            + self.lights.len()
            + self.sensors.len()
            + self.switches.len()
            + self.text_sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("binary_sensors", &self.binary_sensors.len())
            .field("covers", &self.covers.len())
            .field("fans", &self.fans.len())
            .field("lights", &self.lights.len())
            .field("sensors", &self.sensors.len())
            .field("switches", &self.switches.len())
            .field("text_sensors", &self.text_sensors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestSensor {
        info: EntityInfo,
    }

    impl Entity for TestSensor {
        fn info(&self) -> &EntityInfo {
            &self.info
        }
    }

    impl Sensor for TestSensor {
        fn state(&self) -> Option<f32> {
            Some(21.5)
        }
    }

    #[test]
    fn test_fnv1_known_values() {
        assert_eq!(fnv1_hash(""), 2_166_136_261);
        // One round: offset * prime, then xor 'a'.
        let expected = 2_166_136_261u32.wrapping_mul(16_777_619) ^ 0x61;
        assert_eq!(fnv1_hash("a"), expected);
        assert_eq!(fnv1_hash("a"), 0x050C_5D7E);
    }

    #[test]
    fn test_sanitize_object_id() {
        assert_eq!(sanitize_object_id("Living Room Temp"), "living_room_temp");
        assert_eq!(sanitize_object_id("Pump #2 (main)"), "pump_2_main");
        assert_eq!(sanitize_object_id("a-b_c"), "a-b_c");
        assert_eq!(sanitize_object_id("Überhitzung"), "berhitzung");
    }

    #[test]
    fn test_entity_info_defaults() {
        let info = EntityInfo::new("Garage Door");
        assert_eq!(info.object_id(), "garage_door");
        assert_eq!(info.key(), fnv1_hash("garage_door"));
        assert!(!info.is_internal());
        assert_eq!(info.unique_id("node", "cover"), "nodecovergarage_door");

        let custom = info.with_unique_id("abc123");
        assert_eq!(custom.unique_id("node", "cover"), "abc123");
    }

    #[test]
    fn test_registry_lookup_and_duplicates() {
        let mut registry = EntityRegistry::new();
        let sensor = Arc::new(TestSensor {
            info: EntityInfo::new("Outdoor Temp"),
        });
        let key = sensor.key();
        registry.register_sensor(sensor).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.sensor_by_key(key).is_some());
        assert!(registry.sensor_by_key(key ^ 1).is_none());
        assert!(registry.switch_by_key(key).is_none());

        let duplicate = Arc::new(TestSensor {
            info: EntityInfo::new("outdoor temp"),
        });
        assert!(matches!(
            registry.register_sensor(duplicate),
            Err(ServerError::DuplicateKey { .. })
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_calls_from_requests() {
        let req = FanCommandRequest {
            key: 1,
            has_speed: true,
            speed: 2,
            ..Default::default()
        };
        let call = FanCall::from(&req);
        assert_eq!(call.speed, Some(FanSpeed::High));
        assert_eq!(call.state, None);

        let req = CoverCommandRequest {
            key: 1,
            has_state: false,
            command: 1,
        };
        assert_eq!(CoverCall::from_request(&req), None);

        let req = LightCommandRequest {
            has_effect: true,
            effect: "Pulse".into(),
            ..Default::default()
        };
        assert_eq!(LightCall::from(&req).effect.as_deref(), Some("Pulse"));
    }
}
