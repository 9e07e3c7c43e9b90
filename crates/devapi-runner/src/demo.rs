//! Demo entities.
//!
//! Software stand-ins for hardware drivers, built from the device file.
//! Sensors wander randomly on each sample; actuators simply adopt whatever
//! the controller commands. Every change is announced on an update channel
//! which the main loop forwards to [`devapi_server::Server`].

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use devapi_proto::{CoverCommand, CoverState, FanSpeed};
use devapi_server::{
    BinarySensor, Cover, CoverCall, Entity, EntityInfo, EntityRegistry, Fan, FanCall, FanTraits,
    FanValues, Light, LightCall, LightTraits, LightValues, Sensor, Server, ServerResult, Switch,
    SwitchCall, TextSensor,
};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::{
    BinarySensorConfig, CoverConfig, EntityCommon, EntityConfig, FanConfig, LightConfig,
    SensorConfig, SwitchConfig, TextSensorConfig,
};

/// A state change to publish, by entity key.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityUpdate {
    BinarySensor { key: u32, state: bool },
    Cover { key: u32 },
    Fan { key: u32 },
    Light { key: u32 },
    Sensor { key: u32, state: f32 },
    Switch { key: u32, state: bool },
    TextSensor { key: u32, state: String },
}

fn entity_info(common: &EntityCommon) -> EntityInfo {
    let info = EntityInfo::new(common.name.clone()).with_internal(common.internal);
    match &common.unique_id {
        Some(id) => info.with_unique_id(id.clone()),
        None => info,
    }
}

fn publish(updates: &Sender<EntityUpdate>, update: EntityUpdate) {
    // Unbounded; only fails once the main loop has gone.
    let _ = updates.send(update);
}

// ============================================================================
// Sensors
// ============================================================================

pub struct DemoSensor {
    info: EntityInfo,
    config: SensorConfig,
    state: Mutex<Option<f32>>,
}

impl Entity for DemoSensor {
    fn info(&self) -> &EntityInfo {
        &self.info
    }
}

impl Sensor for DemoSensor {
    fn icon(&self) -> String {
        self.config.icon.clone()
    }

    fn unit_of_measurement(&self) -> String {
        self.config.unit.clone()
    }

    fn accuracy_decimals(&self) -> i32 {
        self.config.accuracy_decimals
    }

    fn state(&self) -> Option<f32> {
        *self.state.lock()
    }
}

impl DemoSensor {
    fn sample(&self, rng: &mut ChaCha8Rng) -> f32 {
        let mut state = self.state.lock();
        let drift = self.config.drift.abs();
        let current = state.unwrap_or(0.0);
        let next = if drift > 0.0 {
            current + rng.gen_range(-drift..=drift)
        } else {
            current
        };
        *state = Some(next);
        next
    }
}

pub struct DemoBinarySensor {
    info: EntityInfo,
    config: BinarySensorConfig,
    state: Mutex<Option<bool>>,
}

impl Entity for DemoBinarySensor {
    fn info(&self) -> &EntityInfo {
        &self.info
    }
}

impl BinarySensor for DemoBinarySensor {
    fn device_class(&self) -> String {
        self.config.device_class.clone()
    }

    fn state(&self) -> Option<bool> {
        *self.state.lock()
    }
}

impl DemoBinarySensor {
    /// Maybe flip. Returns the new state when it changed.
    fn sample(&self, rng: &mut ChaCha8Rng) -> Option<bool> {
        let p = self.config.flip_probability.clamp(0.0, 1.0);
        let mut state = self.state.lock();
        if state.is_some() && !rng.gen_bool(p) {
            return None;
        }
        let next = !state.unwrap_or(true);
        *state = Some(next);
        Some(next)
    }
}

pub struct DemoTextSensor {
    info: EntityInfo,
    config: TextSensorConfig,
    state: Mutex<Option<String>>,
}

impl Entity for DemoTextSensor {
    fn info(&self) -> &EntityInfo {
        &self.info
    }
}

impl TextSensor for DemoTextSensor {
    fn icon(&self) -> String {
        self.config.icon.clone()
    }

    fn state(&self) -> Option<String> {
        self.state.lock().clone()
    }
}

// ============================================================================
// Actuators
// ============================================================================

pub struct DemoSwitch {
    info: EntityInfo,
    config: SwitchConfig,
    state: Mutex<bool>,
    updates: Sender<EntityUpdate>,
}

impl Entity for DemoSwitch {
    fn info(&self) -> &EntityInfo {
        &self.info
    }
}

impl Switch for DemoSwitch {
    fn icon(&self) -> String {
        self.config.icon.clone()
    }

    fn state(&self) -> bool {
        *self.state.lock()
    }

    fn control(&self, call: SwitchCall) {
        *self.state.lock() = call.state;
        info!("Switch '{}' turned {}", self.info.name(), if call.state { "on" } else { "off" });
        publish(
            &self.updates,
            EntityUpdate::Switch {
                key: self.key(),
                state: call.state,
            },
        );
    }
}

pub struct DemoLight {
    info: EntityInfo,
    config: LightConfig,
    values: Mutex<LightValues>,
    updates: Sender<EntityUpdate>,
}

impl Entity for DemoLight {
    fn info(&self) -> &EntityInfo {
        &self.info
    }
}

impl Light for DemoLight {
    fn traits(&self) -> LightTraits {
        LightTraits {
            supports_brightness: self.config.brightness,
            supports_rgb: self.config.rgb,
            supports_white_value: self.config.white_value,
            supports_color_temperature: self.config.color_temperature,
            min_mireds: self.config.min_mireds,
            max_mireds: self.config.max_mireds,
        }
    }

    fn effects(&self) -> Vec<String> {
        self.config.effects.clone()
    }

    fn values(&self) -> LightValues {
        self.values.lock().clone()
    }

    fn control(&self, call: LightCall) {
        {
            let mut v = self.values.lock();
            if let Some(state) = call.state {
                v.state = state;
            }
            if let Some(brightness) = call.brightness {
                v.brightness = brightness.clamp(0.0, 1.0);
            }
            if let Some((r, g, b)) = call.rgb {
                v.red = r;
                v.green = g;
                v.blue = b;
            }
            if let Some(white) = call.white {
                v.white = white;
            }
            if let Some(ct) = call.color_temperature {
                v.color_temperature = ct;
            }
            if let Some(effect) = call.effect {
                // "None" is the implicit no-effect entry.
                v.effect = if effect == "None" { String::new() } else { effect };
            }
        }
        debug!("Light '{}' updated", self.info.name());
        publish(&self.updates, EntityUpdate::Light { key: self.key() });
    }
}

pub struct DemoFan {
    info: EntityInfo,
    config: FanConfig,
    values: Mutex<FanValues>,
    updates: Sender<EntityUpdate>,
}

impl Entity for DemoFan {
    fn info(&self) -> &EntityInfo {
        &self.info
    }
}

impl Fan for DemoFan {
    fn traits(&self) -> FanTraits {
        FanTraits {
            supports_oscillation: self.config.oscillation,
            supports_speed: self.config.speed,
        }
    }

    fn values(&self) -> FanValues {
        *self.values.lock()
    }

    fn control(&self, call: FanCall) {
        {
            let mut v = self.values.lock();
            if let Some(state) = call.state {
                v.state = state;
            }
            if let Some(speed) = call.speed {
                v.speed = speed;
            }
            if let Some(oscillating) = call.oscillating {
                v.oscillating = oscillating;
            }
        }
        publish(&self.updates, EntityUpdate::Fan { key: self.key() });
    }
}

pub struct DemoCover {
    info: EntityInfo,
    config: CoverConfig,
    state: Mutex<CoverState>,
    updates: Sender<EntityUpdate>,
}

impl Entity for DemoCover {
    fn info(&self) -> &EntityInfo {
        &self.info
    }
}

impl Cover for DemoCover {
    fn assumed_state(&self) -> bool {
        self.config.assumed_state
    }

    fn state(&self) -> Option<CoverState> {
        Some(*self.state.lock())
    }

    fn control(&self, call: CoverCall) {
        let next = match call.command {
            CoverCommand::Open => CoverState::Open,
            CoverCommand::Close => CoverState::Closed,
            CoverCommand::Stop => return,
        };
        *self.state.lock() = next;
        publish(&self.updates, EntityUpdate::Cover { key: self.key() });
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Owns the demo entities that change on their own.
pub struct DemoDriver {
    sensors: Vec<Arc<DemoSensor>>,
    binary_sensors: Vec<Arc<DemoBinarySensor>>,
    rng: ChaCha8Rng,
    sample_interval_ms: u64,
    last_sample: Option<u64>,
    updates: Sender<EntityUpdate>,
}

/// Build demo entities from the device file.
///
/// Returns the registry to hand to the server, the driver for the sampled
/// entities and the receiving end of the update channel.
pub fn build(
    entities: &[EntityConfig],
    seed: Option<u64>,
    sample_interval_ms: u64,
) -> ServerResult<(EntityRegistry, DemoDriver, Receiver<EntityUpdate>)> {
    let (updates, rx) = crossbeam_channel::unbounded();
    let mut registry = EntityRegistry::new();
    let mut driver = DemoDriver {
        sensors: Vec::new(),
        binary_sensors: Vec::new(),
        rng: match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        },
        sample_interval_ms,
        last_sample: None,
        updates: updates.clone(),
    };

    for entity in entities {
        match entity.clone() {
            EntityConfig::Sensor(config) => {
                let sensor = Arc::new(DemoSensor {
                    info: entity_info(&config.common),
                    state: Mutex::new(config.initial),
                    config,
                });
                registry.register_sensor(sensor.clone())?;
                driver.sensors.push(sensor);
            }
            EntityConfig::BinarySensor(config) => {
                let sensor = Arc::new(DemoBinarySensor {
                    info: entity_info(&config.common),
                    state: Mutex::new(config.initial),
                    config,
                });
                registry.register_binary_sensor(sensor.clone())?;
                driver.binary_sensors.push(sensor);
            }
            EntityConfig::TextSensor(config) => {
                registry.register_text_sensor(Arc::new(DemoTextSensor {
                    info: entity_info(&config.common),
                    state: Mutex::new(config.initial.clone()),
                    config,
                }))?;
            }
            EntityConfig::Switch(config) => {
                registry.register_switch(Arc::new(DemoSwitch {
                    info: entity_info(&config.common),
                    state: Mutex::new(config.initial),
                    config,
                    updates: updates.clone(),
                }))?;
            }
            EntityConfig::Light(config) => {
                registry.register_light(Arc::new(DemoLight {
                    info: entity_info(&config.common),
                    values: Mutex::new(LightValues {
                        brightness: 1.0,
                        red: 1.0,
                        green: 1.0,
                        blue: 1.0,
                        ..Default::default()
                    }),
                    config,
                    updates: updates.clone(),
                }))?;
            }
            EntityConfig::Fan(config) => {
                registry.register_fan(Arc::new(DemoFan {
                    info: entity_info(&config.common),
                    values: Mutex::new(FanValues {
                        speed: FanSpeed::Low,
                        ..Default::default()
                    }),
                    config,
                    updates: updates.clone(),
                }))?;
            }
            EntityConfig::Cover(config) => {
                registry.register_cover(Arc::new(DemoCover {
                    info: entity_info(&config.common),
                    state: Mutex::new(CoverState::Closed),
                    config,
                    updates: updates.clone(),
                }))?;
            }
        }
    }

    Ok((registry, driver, rx))
}

impl DemoDriver {
    /// Take new readings if a sample interval has passed.
    pub fn step(&mut self, now: u64) {
        if let Some(last) = self.last_sample {
            if now.saturating_sub(last) < self.sample_interval_ms {
                return;
            }
        }
        self.last_sample = Some(now);

        for sensor in &self.sensors {
            let state = sensor.sample(&mut self.rng);
            publish(
                &self.updates,
                EntityUpdate::Sensor {
                    key: sensor.key(),
                    state,
                },
            );
        }
        for sensor in &self.binary_sensors {
            if let Some(state) = sensor.sample(&mut self.rng) {
                publish(
                    &self.updates,
                    EntityUpdate::BinarySensor {
                        key: sensor.key(),
                        state,
                    },
                );
            }
        }
    }
}

/// Forward one update to the server's subscribed clients.
pub fn apply_update(server: &mut Server, update: EntityUpdate) {
    let registry = server.context().registry();
    match update {
        EntityUpdate::BinarySensor { key, state } => {
            if let Some(e) = registry.binary_sensor_by_key(key).cloned() {
                server.on_binary_sensor_update(e.as_ref(), state);
            }
        }
        EntityUpdate::Cover { key } => {
            if let Some(e) = registry.cover_by_key(key).cloned() {
                server.on_cover_update(e.as_ref());
            }
        }
        EntityUpdate::Fan { key } => {
            if let Some(e) = registry.fan_by_key(key).cloned() {
                server.on_fan_update(e.as_ref());
            }
        }
        EntityUpdate::Light { key } => {
            if let Some(e) = registry.light_by_key(key).cloned() {
                server.on_light_update(e.as_ref());
            }
        }
        EntityUpdate::Sensor { key, state } => {
            if let Some(e) = registry.sensor_by_key(key).cloned() {
                server.on_sensor_update(e.as_ref(), state);
            }
        }
        EntityUpdate::Switch { key, state } => {
            if let Some(e) = registry.switch_by_key(key).cloned() {
                server.on_switch_update(e.as_ref(), state);
            }
        }
        EntityUpdate::TextSensor { key, state } => {
            if let Some(e) = registry.text_sensor_by_key(key).cloned() {
                server.on_text_sensor_update(e.as_ref(), &state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerConfig;

    fn demo(yaml: &str) -> (EntityRegistry, DemoDriver, Receiver<EntityUpdate>) {
        let config = RunnerConfig::from_yaml(yaml).unwrap();
        build(&config.entities, Some(1), 1000).unwrap()
    }

    #[test]
    fn test_build_registers_every_domain() {
        let (registry, _driver, _rx) = demo(
            r#"
entities:
  - {domain: sensor, name: Temp, initial: 20.0}
  - {domain: binary_sensor, name: Door}
  - {domain: text_sensor, name: Status, initial: ok}
  - {domain: switch, name: Relay}
  - {domain: light, name: Lamp}
  - {domain: fan, name: Fan}
  - {domain: cover, name: Blind}
"#,
        );
        assert_eq!(registry.len(), 7);
        assert_eq!(registry.sensors()[0].state(), Some(20.0));
        assert_eq!(registry.text_sensors()[0].state().as_deref(), Some("ok"));
        assert_eq!(registry.covers()[0].state(), Some(CoverState::Closed));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let config = RunnerConfig::from_yaml(
            "entities: [{domain: switch, name: Relay}, {domain: switch, name: relay}]",
        )
        .unwrap();
        assert!(build(&config.entities, None, 1000).is_err());
    }

    #[test]
    fn test_sensor_drift_stays_in_range() {
        let (registry, mut driver, rx) =
            demo("entities: [{domain: sensor, name: Temp, initial: 20.0, drift: 0.5}]");

        driver.step(0);
        driver.step(500);
        driver.step(1000);
        let updates: Vec<_> = rx.try_iter().collect();
        assert_eq!(updates.len(), 2);
        for update in updates {
            match update {
                EntityUpdate::Sensor { key, state } => {
                    assert_eq!(key, registry.sensors()[0].key());
                    assert!((19.0..=21.0).contains(&state));
                }
                other => panic!("unexpected update {other:?}"),
            }
        }
    }

    #[test]
    fn test_binary_sensor_reports_first_reading() {
        let (_registry, mut driver, rx) = demo("entities: [{domain: binary_sensor, name: Door}]");
        driver.step(0);
        assert!(matches!(
            rx.try_recv(),
            Ok(EntityUpdate::BinarySensor { state: false, .. })
        ));
        // Zero flip probability: no further changes.
        driver.step(5000);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_actuators_publish_changes() {
        let (registry, _driver, rx) = demo(
            r#"
entities:
  - {domain: switch, name: Relay}
  - {domain: light, name: Lamp, brightness: true, effects: [Pulse]}
  - {domain: cover, name: Blind}
"#,
        );

        let switch = registry.switches()[0].clone();
        switch.control(SwitchCall { state: true });
        assert!(switch.state());
        assert_eq!(
            rx.try_recv().unwrap(),
            EntityUpdate::Switch {
                key: switch.key(),
                state: true
            }
        );

        let light = registry.lights()[0].clone();
        light.control(LightCall {
            state: Some(true),
            brightness: Some(1.5),
            effect: Some("Pulse".into()),
            ..Default::default()
        });
        let values = light.values();
        assert!(values.state);
        assert_eq!(values.brightness, 1.0);
        assert_eq!(values.effect, "Pulse");
        light.control(LightCall {
            effect: Some("None".into()),
            ..Default::default()
        });
        assert_eq!(light.values().effect, "");

        let cover = registry.covers()[0].clone();
        cover.control(CoverCall {
            command: CoverCommand::Stop,
        });
        cover.control(CoverCall {
            command: CoverCommand::Open,
        });
        assert_eq!(cover.state(), Some(CoverState::Open));

        let kinds: Vec<_> = rx.try_iter().collect();
        assert_eq!(kinds.len(), 3);
    }
}
