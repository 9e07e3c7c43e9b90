//! The API server: owns every connection and drives them from [`Server::tick`].
//!
//! The server is single-threaded by construction. Whatever accepts sockets
//! hands transports to [`Server::accept`]; entity owners report changes
//! through the `on_*_update` methods, which fan out to every subscribed
//! client.

use devapi_metrics::metric_defs;
use devapi_proto::{DeviceInfoResponse, LogLevel, ServiceCallResponse};
use tracing::{debug, error, info};

use crate::config::{DeviceInfo, ServerConfig};
use crate::connection::{Connection, ConnectionState};
use crate::entity::{BinarySensor, Cover, EntityRegistry, Fan, Light, Sensor, Switch, TextSensor};
use crate::error::ServerResult;
use crate::service::{HomeAssistantStateSubscription, UserService};
use crate::transport::Transport;

type TimeListener = Box<dyn FnMut(u32) + Send>;

/// State shared by all connections of a server.
pub struct ServerContext {
    pub(crate) config: ServerConfig,
    pub(crate) device: DeviceInfo,
    pub(crate) registry: EntityRegistry,
    pub(crate) services: Vec<UserService>,
    pub(crate) state_subscriptions: Vec<HomeAssistantStateSubscription>,
    pub(crate) time_listener: Option<TimeListener>,
    pub(crate) dump_config_requested: bool,
}

impl ServerContext {
    pub fn new(config: ServerConfig, device: DeviceInfo, registry: EntityRegistry) -> Self {
        ServerContext {
            config,
            device,
            registry,
            services: Vec::new(),
            state_subscriptions: Vec::new(),
            time_listener: None,
            dump_config_requested: false,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn uses_password(&self) -> bool {
        !self.config.password.is_empty()
    }

    /// Compare `candidate` with the configured password.
    ///
    /// The loop runs over the candidate's length whatever the outcome, but an
    /// unequal length is still visible earlier than a content mismatch.
    pub fn check_password(&self, candidate: &str) -> bool {
        let password = self.config.password.as_bytes();
        let candidate = candidate.as_bytes();

        let (left, mut result) = if password.len() == candidate.len() {
            (password, 0u8)
        } else {
            (candidate, 1u8)
        };
        for (a, b) in left.iter().zip(candidate) {
            result |= a ^ b;
        }
        result == 0
    }

    pub(crate) fn device_info_response(&self) -> DeviceInfoResponse {
        DeviceInfoResponse {
            uses_password: self.uses_password(),
            name: self.device.name.clone(),
            mac_address: self.device.mac_address.clone(),
            version: self.device.version.clone(),
            compilation_time: self.device.compilation_time.clone(),
            model: self.device.model.clone(),
            has_deep_sleep: self.device.has_deep_sleep,
        }
    }
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("config", &self.config)
            .field("device", &self.device)
            .field("registry", &self.registry)
            .field("services", &self.services)
            .field("state_subscriptions", &self.state_subscriptions)
            .field("time_listener", &self.time_listener.is_some())
            .finish()
    }
}

/// What the caller should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// No client for longer than the reboot timeout.
    RebootRequested,
}

/// API server.
#[derive(Debug)]
pub struct Server {
    ctx: ServerContext,
    connections: Vec<Connection>,
    last_connected: u64,
}

impl Server {
    /// Validate the configuration and create an idle server.
    pub fn new(
        config: ServerConfig,
        device: DeviceInfo,
        registry: EntityRegistry,
        now: u64,
    ) -> ServerResult<Self> {
        config.validate()?;
        device.validate()?;
        info!(
            "API server for '{}' with {} entities on port {}",
            device.name,
            registry.len(),
            config.port
        );
        Ok(Server {
            ctx: ServerContext::new(config, device, registry),
            connections: Vec::new(),
            last_connected: now,
        })
    }

    pub fn context(&self) -> &ServerContext {
        &self.ctx
    }

    pub fn port(&self) -> u16 {
        self.ctx.config.port
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn uses_password(&self) -> bool {
        self.ctx.uses_password()
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        self.ctx.check_password(candidate)
    }

    /// Whether any client is past the handshake.
    pub fn is_connected(&self) -> bool {
        self.connections
            .iter()
            .any(|c| c.state() == ConnectionState::Connected)
    }

    /// Expose a user service. Must happen before clients list entities.
    pub fn register_user_service(&mut self, service: UserService) {
        debug!("Registering user service '{}'", service.name());
        self.ctx.services.push(service);
    }

    pub fn subscribe_home_assistant_state(&mut self, subscription: HomeAssistantStateSubscription) {
        self.ctx.state_subscriptions.push(subscription);
    }

    /// Callback for the epoch seconds delivered by a time response.
    pub fn set_time_listener<F>(&mut self, listener: F)
    where
        F: FnMut(u32) + Send + 'static,
    {
        self.ctx.time_listener = Some(Box::new(listener));
    }

    /// Returns whether a client asked for a config dump since the last call.
    pub fn take_dump_config_request(&mut self) -> bool {
        std::mem::take(&mut self.ctx.dump_config_requested)
    }

    /// Add a client.
    pub fn accept(&mut self, transport: Box<dyn Transport>, now: u64) {
        let connection = Connection::new(transport, now);
        debug!("Accepted {}", connection.client_info());
        metrics::counter!(metric_defs::CONNECTIONS_ACCEPTED.name).increment(1);
        self.connections.push(connection);
        metrics::gauge!(metric_defs::ACTIVE_CONNECTIONS.name).set(self.connections.len() as f64);
    }

    /// One pass of the server loop.
    pub fn tick(&mut self, now: u64) -> TickOutcome {
        let before = self.connections.len();
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.connections)
            .into_iter()
            .partition(Connection::is_removed);
        self.connections = kept;
        for connection in removed {
            debug!("Disconnecting {}", connection.client_info());
            metrics::counter!(metric_defs::CONNECTIONS_CLOSED.name).increment(1);
        }
        if self.connections.len() != before {
            metrics::gauge!(metric_defs::ACTIVE_CONNECTIONS.name)
                .set(self.connections.len() as f64);
        }

        for connection in &mut self.connections {
            connection.run(&mut self.ctx, now);
        }

        let timeout = self.ctx.config.reboot_timeout_ms;
        if timeout != 0 {
            if self.connections.is_empty() {
                if now.saturating_sub(self.last_connected) > timeout {
                    error!("No client connected to API. Rebooting...");
                    return TickOutcome::RebootRequested;
                }
            } else {
                self.last_connected = now;
            }
        }
        TickOutcome::Continue
    }

    /// Ask every client to disconnect.
    pub fn shutdown(&mut self, reason: &str) {
        info!("Shutting down API server: {}", reason);
        for connection in &mut self.connections {
            connection.send_disconnect_request(reason);
        }
    }

    // ------------------------------------------------------------------------
    // Fan-out
    // ------------------------------------------------------------------------

    pub fn on_binary_sensor_update(&mut self, entity: &dyn BinarySensor, state: bool) {
        if entity.is_internal() {
            return;
        }
        for c in &mut self.connections {
            c.send_binary_sensor_state(entity, state);
        }
    }

    pub fn on_cover_update(&mut self, entity: &dyn Cover) {
        if entity.is_internal() {
            return;
        }
        for c in &mut self.connections {
            c.send_cover_state(entity);
        }
    }

    pub fn on_fan_update(&mut self, entity: &dyn Fan) {
        if entity.is_internal() {
            return;
        }
        for c in &mut self.connections {
            c.send_fan_state(entity);
        }
    }

    pub fn on_light_update(&mut self, entity: &dyn Light) {
        if entity.is_internal() {
            return;
        }
        for c in &mut self.connections {
            c.send_light_state(entity);
        }
    }

    pub fn on_sensor_update(&mut self, entity: &dyn Sensor, state: f32) {
        if entity.is_internal() {
            return;
        }
        for c in &mut self.connections {
            c.send_sensor_state(entity, state);
        }
    }

    pub fn on_switch_update(&mut self, entity: &dyn Switch, state: bool) {
        if entity.is_internal() {
            return;
        }
        for c in &mut self.connections {
            c.send_switch_state(entity, state);
        }
    }

    pub fn on_text_sensor_update(&mut self, entity: &dyn TextSensor, state: &str) {
        if entity.is_internal() {
            return;
        }
        for c in &mut self.connections {
            c.send_text_sensor_state(entity, state);
        }
    }

    /// Forward a log line to every client subscribed at `level` or noisier.
    pub fn on_log_line(&mut self, level: LogLevel, tag: &str, line: &str) {
        for c in &mut self.connections {
            c.send_log_message(level, tag, line);
        }
    }

    /// Ask subscribed clients to call a controller service.
    pub fn send_service_call(&mut self, call: &ServiceCallResponse) {
        for c in &mut self.connections {
            c.send_service_call(call);
        }
    }

    /// Ask every authenticated client for the time.
    pub fn request_time(&mut self) {
        for c in self
            .connections
            .iter_mut()
            .filter(|c| c.state() == ConnectionState::Connected)
        {
            c.send_time_request();
        }
    }
}
