//! Device file loading.
//!
//! A device file is YAML describing the API server, the device identity and
//! the demo entities the runner should expose:
//!
//! ```yaml
//! device:
//!   name: porch
//! server:
//!   port: 6053
//!   password: hunter2
//! entities:
//!   - domain: sensor
//!     name: Porch Temperature
//!     unit: "°C"
//!     accuracy_decimals: 1
//!     initial: 18.5
//!     drift: 0.2
//!   - domain: switch
//!     name: Porch Light
//! follow_states:
//!   - sun.sun
//! ```

use std::path::Path;

use devapi_server::{DeviceInfo, ServerConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default main loop period.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 16;
/// Default period between demo sensor readings.
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 10_000;

/// Everything in a device file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub server: ServerConfig,
    pub device: DeviceInfo,
    pub entities: Vec<EntityConfig>,
    /// Controller entities whose state the device follows.
    pub follow_states: Vec<String>,
    pub tick_interval_ms: u64,
    pub sample_interval_ms: u64,
    /// Seed for demo sensor drift. Random when absent.
    pub seed: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            server: ServerConfig::default(),
            device: DeviceInfo::default(),
            entities: Vec::new(),
            follow_states: Vec::new(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            seed: None,
        }
    }
}

/// Identity shared by every entity entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityCommon {
    pub name: String,
    #[serde(default)]
    pub internal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(flatten)]
    pub common: EntityCommon,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub accuracy_decimals: i32,
    /// First reading. No state is reported until the first sample if absent.
    #[serde(default)]
    pub initial: Option<f32>,
    /// Largest change between two samples.
    #[serde(default)]
    pub drift: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinarySensorConfig {
    #[serde(flatten)]
    pub common: EntityCommon,
    #[serde(default)]
    pub device_class: String,
    #[serde(default)]
    pub initial: Option<bool>,
    /// Chance of flipping on each sample, 0 to 1.
    #[serde(default)]
    pub flip_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchConfig {
    #[serde(flatten)]
    pub common: EntityCommon,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub initial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightConfig {
    #[serde(flatten)]
    pub common: EntityCommon,
    #[serde(default)]
    pub brightness: bool,
    #[serde(default)]
    pub rgb: bool,
    #[serde(default)]
    pub white_value: bool,
    #[serde(default)]
    pub color_temperature: bool,
    #[serde(default)]
    pub min_mireds: f32,
    #[serde(default)]
    pub max_mireds: f32,
    #[serde(default)]
    pub effects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanConfig {
    #[serde(flatten)]
    pub common: EntityCommon,
    #[serde(default)]
    pub oscillation: bool,
    #[serde(default)]
    pub speed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverConfig {
    #[serde(flatten)]
    pub common: EntityCommon,
    #[serde(default)]
    pub assumed_state: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSensorConfig {
    #[serde(flatten)]
    pub common: EntityCommon,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub initial: Option<String>,
}

/// One demo entity, tagged by its domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum EntityConfig {
    BinarySensor(BinarySensorConfig),
    Cover(CoverConfig),
    Fan(FanConfig),
    Light(LightConfig),
    Sensor(SensorConfig),
    Switch(SwitchConfig),
    TextSensor(TextSensorConfig),
}

impl EntityConfig {
    pub fn common(&self) -> &EntityCommon {
        match self {
            EntityConfig::BinarySensor(c) => &c.common,
            EntityConfig::Cover(c) => &c.common,
            EntityConfig::Fan(c) => &c.common,
            EntityConfig::Light(c) => &c.common,
            EntityConfig::Sensor(c) => &c.common,
            EntityConfig::Switch(c) => &c.common,
            EntityConfig::TextSensor(c) => &c.common,
        }
    }
}

/// Command-line values that take precedence over the device file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub password: Option<String>,
}

impl RunnerConfig {
    /// Parse a device file from YAML text.
    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        let config: RunnerConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a device file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(password) = &overrides.password {
            self.server.password = password.clone();
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.server
            .validate()
            .and_then(|_| self.device.validate())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be greater than zero".into()));
        }
        if let Some(entity) = self.entities.iter().find(|e| e.common().name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("entity without a name: {entity:?}")));
        }
        Ok(())
    }
}
