//! One client session.
//!
//! A connection turns received bytes into frames, gates them on the handshake
//! state, dispatches them, and drives its two entity iterators and the
//! keepalive. Everything runs inside [`Connection::run`], called once per
//! server tick.

use devapi_metrics::{metric_defs, MessageLabels};
use devapi_proto::{
    put_frame_header, ConnectResponse, CoverStateResponse, DisconnectRequest, DisconnectResponse,
    FanStateResponse, FrameCodec, FrameHeader, GetTimeRequest, HelloResponse, LightStateResponse,
    ListEntitiesBinarySensorResponse, ListEntitiesCoverResponse, ListEntitiesDoneResponse,
    ListEntitiesFanResponse, ListEntitiesLightResponse, ListEntitiesSensorResponse,
    ListEntitiesSwitchResponse, ListEntitiesTextSensorResponse, LogLevel, Message, MessageType,
    PingRequest, PingResponse, ProtoWriter, Request, SensorStateResponse, ServiceCallResponse,
    SubscribeHomeAssistantStateResponse, SubscribeLogsResponse, SwitchStateResponse,
    TextSensorStateResponse, BinarySensorStateResponse, EntityListing, MAX_HEADER_SIZE,
};
use tracing::{debug, trace, warn};

use crate::entity::{
    BinarySensor, Cover, CoverCall, Entity, Fan, FanCall, Light, LightCall, Sensor, Switch,
    SwitchCall, TextSensor,
};
use crate::error::{ServerError, ServerResult};
use crate::iterator::{EntityIterator, EntityVisitor};
use crate::server::ServerContext;
use crate::service::UserService;
use crate::transport::Transport;

/// Handshake progress. Only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    WaitingForHello,
    WaitingForConnect,
    Connected,
}

/// Transport plus everything needed to send on it.
///
/// Kept apart from the iterators so a visitor can borrow the link while the
/// connection advances its cursor.
pub(crate) struct Link {
    transport: Box<dyn Transport>,
    send_buffer: Vec<u8>,
    header: Vec<u8>,
    remove: bool,
    state_subscription: bool,
    service_call_subscription: bool,
}

impl Link {
    fn new(transport: Box<dyn Transport>) -> Self {
        Link {
            transport,
            send_buffer: Vec::with_capacity(64),
            header: Vec::with_capacity(MAX_HEADER_SIZE),
            remove: false,
            state_subscription: false,
            service_call_subscription: false,
        }
    }

    /// Encode and send a message through the reusable buffer.
    fn send_message<M: Message>(&mut self, msg: &M) -> bool {
        self.send_buffer.clear();
        msg.encode(&mut ProtoWriter::new(&mut self.send_buffer));
        self.send_buffer(M::MESSAGE_TYPE)
    }

    /// Frame and write whatever is in the send buffer.
    fn send_buffer(&mut self, message_type: MessageType) -> bool {
        if self.remove {
            return false;
        }

        self.header.clear();
        put_frame_header(&mut self.header, message_type.id(), self.send_buffer.len());

        let needed = self.header.len() + self.send_buffer.len();
        let labels = MessageLabels::new(format!("{message_type:?}")).to_labels();
        // Log responses never log, or a full buffer would feed itself.
        let quiet = message_type == MessageType::SubscribeLogsResponse;

        if needed > self.transport.space() {
            if !quiet {
                trace!("Cannot send {:?}: not enough transport buffer space", message_type);
            }
            metrics::counter!(metric_defs::SEND_DROPPED.name, &labels).increment(1);
            return false;
        }

        if !self.transport.write(&self.header, &self.send_buffer) {
            return false;
        }
        metrics::counter!(metric_defs::FRAMES_SENT.name, &labels).increment(1);
        metrics::histogram!(metric_defs::FRAME_PAYLOAD_SIZE.name).record(self.send_buffer.len() as f64);
        true
    }

    fn close(&mut self) {
        self.transport.close();
        self.remove = true;
    }

    fn send_binary_sensor_state(&mut self, entity: &dyn BinarySensor, state: bool) -> bool {
        if !self.state_subscription {
            return false;
        }
        self.send_message(&BinarySensorStateResponse {
            key: entity.key(),
            state,
        })
    }

    fn send_cover_state(&mut self, entity: &dyn Cover) -> bool {
        if !self.state_subscription {
            return false;
        }
        self.send_message(&CoverStateResponse {
            key: entity.key(),
            state: entity.state().unwrap_or_default(),
        })
    }

    fn send_fan_state(&mut self, entity: &dyn Fan) -> bool {
        if !self.state_subscription {
            return false;
        }
        let traits = entity.traits();
        let values = entity.values();
        let mut msg = FanStateResponse {
            key: entity.key(),
            state: values.state,
            ..Default::default()
        };
        if traits.supports_oscillation {
            msg.oscillating = values.oscillating;
        }
        if traits.supports_speed {
            msg.speed = values.speed;
        }
        self.send_message(&msg)
    }

    fn send_light_state(&mut self, entity: &dyn Light) -> bool {
        if !self.state_subscription {
            return false;
        }
        let traits = entity.traits();
        let values = entity.values();
        let mut msg = LightStateResponse {
            key: entity.key(),
            state: values.state,
            ..Default::default()
        };
        if traits.supports_brightness {
            msg.brightness = values.brightness;
        }
        if traits.supports_rgb {
            msg.red = values.red;
            msg.green = values.green;
            msg.blue = values.blue;
        }
        if traits.supports_white_value {
            msg.white = values.white;
        }
        if traits.supports_color_temperature {
            msg.color_temperature = values.color_temperature;
        }
        if !entity.effects().is_empty() {
            msg.effect = values.effect;
        }
        self.send_message(&msg)
    }

    fn send_sensor_state(&mut self, entity: &dyn Sensor, state: f32) -> bool {
        if !self.state_subscription {
            return false;
        }
        self.send_message(&SensorStateResponse {
            key: entity.key(),
            state,
        })
    }

    fn send_switch_state(&mut self, entity: &dyn Switch, state: bool) -> bool {
        if !self.state_subscription {
            return false;
        }
        self.send_message(&SwitchStateResponse {
            key: entity.key(),
            state,
        })
    }

    fn send_text_sensor_state(&mut self, entity: &dyn TextSensor, state: &str) -> bool {
        if !self.state_subscription {
            return false;
        }
        self.send_message(&TextSensorStateResponse {
            key: entity.key(),
            state: state.to_string(),
        })
    }
}

fn listing(entity: &dyn Entity, device_name: &str, domain: &str) -> EntityListing {
    let info = entity.info();
    EntityListing {
        object_id: info.object_id().to_string(),
        key: info.key(),
        name: info.name().to_string(),
        unique_id: info.unique_id(device_name, domain),
    }
}

/// Describe pass: one listing per entity and service, then a done marker.
struct ListEntitiesVisitor<'a> {
    link: &'a mut Link,
    device_name: &'a str,
}

impl EntityVisitor for ListEntitiesVisitor<'_> {
    fn on_binary_sensor(&mut self, entity: &dyn BinarySensor) -> bool {
        self.link.send_message(&ListEntitiesBinarySensorResponse {
            listing: listing(entity, self.device_name, "binary_sensor"),
            device_class: entity.device_class(),
            is_status_binary_sensor: entity.is_status_binary_sensor(),
        })
    }

    fn on_cover(&mut self, entity: &dyn Cover) -> bool {
        self.link.send_message(&ListEntitiesCoverResponse {
            listing: listing(entity, self.device_name, "cover"),
            assumed_state: entity.assumed_state(),
        })
    }

    fn on_fan(&mut self, entity: &dyn Fan) -> bool {
        let traits = entity.traits();
        self.link.send_message(&ListEntitiesFanResponse {
            listing: listing(entity, self.device_name, "fan"),
            supports_oscillation: traits.supports_oscillation,
            supports_speed: traits.supports_speed,
        })
    }

    fn on_light(&mut self, entity: &dyn Light) -> bool {
        let traits = entity.traits();
        let mut effects = entity.effects();
        if !effects.is_empty() {
            effects.insert(0, "None".to_string());
        }
        self.link.send_message(&ListEntitiesLightResponse {
            listing: listing(entity, self.device_name, "light"),
            supports_brightness: traits.supports_brightness,
            supports_rgb: traits.supports_rgb,
            supports_white_value: traits.supports_white_value,
            supports_color_temperature: traits.supports_color_temperature,
            min_mireds: traits.min_mireds,
            max_mireds: traits.max_mireds,
            effects,
        })
    }

    fn on_sensor(&mut self, entity: &dyn Sensor) -> bool {
        self.link.send_message(&ListEntitiesSensorResponse {
            listing: listing(entity, self.device_name, "sensor"),
            icon: entity.icon(),
            unit_of_measurement: entity.unit_of_measurement(),
            accuracy_decimals: entity.accuracy_decimals(),
        })
    }

    fn on_switch(&mut self, entity: &dyn Switch) -> bool {
        self.link.send_message(&ListEntitiesSwitchResponse {
            listing: listing(entity, self.device_name, "switch"),
            icon: entity.icon(),
            assumed_state: entity.assumed_state(),
        })
    }

    fn on_text_sensor(&mut self, entity: &dyn TextSensor) -> bool {
        self.link.send_message(&ListEntitiesTextSensorResponse {
            listing: listing(entity, self.device_name, "text_sensor"),
            icon: entity.icon(),
        })
    }

    fn on_service(&mut self, service: &UserService) -> bool {
        self.link.send_message(&service.to_list_response())
    }

    fn on_end(&mut self) -> bool {
        self.link.send_message(&ListEntitiesDoneResponse)
    }
}

/// Dump pass: the current state of every entity that has one.
struct InitialStateVisitor<'a> {
    link: &'a mut Link,
}

impl EntityVisitor for InitialStateVisitor<'_> {
    fn on_binary_sensor(&mut self, entity: &dyn BinarySensor) -> bool {
        match entity.state() {
            Some(state) => self.link.send_binary_sensor_state(entity, state),
            None => true,
        }
    }

    fn on_cover(&mut self, entity: &dyn Cover) -> bool {
        if entity.state().is_none() {
            return true;
        }
        self.link.send_cover_state(entity)
    }

    fn on_fan(&mut self, entity: &dyn Fan) -> bool {
        self.link.send_fan_state(entity)
    }

    fn on_light(&mut self, entity: &dyn Light) -> bool {
        self.link.send_light_state(entity)
    }

    fn on_sensor(&mut self, entity: &dyn Sensor) -> bool {
        match entity.state() {
            Some(state) => self.link.send_sensor_state(entity, state),
            None => true,
        }
    }

    fn on_switch(&mut self, entity: &dyn Switch) -> bool {
        self.link.send_switch_state(entity, entity.state())
    }

    fn on_text_sensor(&mut self, entity: &dyn TextSensor) -> bool {
        match entity.state() {
            Some(state) => self.link.send_text_sensor_state(entity, &state),
            None => true,
        }
    }
}

/// A client session.
pub struct Connection {
    link: Link,
    codec: FrameCodec,
    state: ConnectionState,
    client_info: String,
    last_traffic: u64,
    awaiting_pong: bool,
    log_subscription: LogLevel,
    list_entities: EntityIterator,
    initial_state: EntityIterator,
}

impl Connection {
    /// Start a session on a freshly accepted transport.
    pub fn new(transport: Box<dyn Transport>, now: u64) -> Self {
        let client_info = transport.peer();
        Connection {
            link: Link::new(transport),
            codec: FrameCodec::new(),
            state: ConnectionState::WaitingForHello,
            client_info,
            last_traffic: now,
            awaiting_pong: false,
            log_subscription: LogLevel::None,
            list_entities: EntityIterator::new(),
            initial_state: EntityIterator::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// `"<client info> (<peer>)"` after the hello, the peer address before.
    pub fn client_info(&self) -> &str {
        &self.client_info
    }

    /// Whether the connection is waiting to be dropped by the server.
    pub fn is_removed(&self) -> bool {
        self.link.remove
    }

    pub fn is_awaiting_pong(&self) -> bool {
        self.awaiting_pong
    }

    pub fn has_state_subscription(&self) -> bool {
        self.link.state_subscription
    }

    pub fn has_service_call_subscription(&self) -> bool {
        self.link.service_call_subscription
    }

    pub fn log_subscription(&self) -> LogLevel {
        self.log_subscription
    }

    /// Bytes received but not yet processed.
    pub fn buffered_len(&self) -> usize {
        self.codec.buffered_len()
    }

    /// One pass of the connection's work.
    pub fn run(&mut self, ctx: &mut ServerContext, now: u64) {
        if self.link.remove {
            return;
        }
        if !self.link.transport.is_connected() {
            debug!("Connection[{}]: transport disconnected", self.client_info);
            self.link.remove = true;
            return;
        }

        while let Some(chunk) = self.link.transport.try_recv() {
            self.on_bytes(ctx, &chunk, now);
            if self.link.remove {
                return;
            }
        }

        let device_name = ctx.device.name.as_str();
        self.list_entities.advance(
            &ctx.registry,
            &ctx.services,
            &mut ListEntitiesVisitor {
                link: &mut self.link,
                device_name,
            },
        );
        self.initial_state.advance(
            &ctx.registry,
            &ctx.services,
            &mut InitialStateVisitor {
                link: &mut self.link,
            },
        );

        let idle = now.saturating_sub(self.last_traffic);
        if self.awaiting_pong {
            if idle > ctx.config.pong_timeout_ms() {
                warn!(
                    "Connection[{}]: no response to ping in time, disconnecting",
                    self.client_info
                );
                self.link.close();
            }
        } else if idle > ctx.config.keepalive_ms {
            self.awaiting_pong = true;
            self.send_ping_request();
        }
    }

    /// Append received bytes and process every complete frame.
    pub fn on_bytes(&mut self, ctx: &mut ServerContext, data: &[u8], now: u64) {
        self.codec.push(data);
        while !self.link.remove {
            match self.process_frame(ctx, now) {
                Ok(true) => {}
                Ok(false) => return,
                Err(e) => {
                    warn!("Connection[{}]: {}", self.client_info, e);
                    self.fatal_error(&e);
                    return;
                }
            }
        }
    }

    /// Handle the first buffered frame. `Ok(false)` when more bytes are needed.
    fn process_frame(&mut self, ctx: &mut ServerContext, now: u64) -> ServerResult<bool> {
        let Some(header) = self.codec.peek()? else {
            return Ok(false);
        };

        let message_type = self.gate(&header)?;
        let request = Request::decode(message_type, self.codec.payload(&header))?;

        trace!("Connection[{}]: received {:?}", self.client_info, message_type);
        metrics::counter!(
            metric_defs::FRAMES_RECEIVED.name,
            &MessageLabels::new(format!("{message_type:?}")).to_labels()
        )
        .increment(1);

        self.last_traffic = now;
        self.handle(ctx, request)?;
        if !self.link.remove {
            self.codec.consume(&header);
        }
        Ok(true)
    }

    fn gate(&self, header: &FrameHeader) -> ServerResult<MessageType> {
        MessageType::from_u32(header.message_type)
            .filter(|t| self.valid_rx_message_type(*t))
            .ok_or(ServerError::IllegalMessage {
                message_type: header.message_type,
                state: self.state,
            })
    }

    /// Whether a message of type `t` may be received in the current state.
    pub fn valid_rx_message_type(&self, t: MessageType) -> bool {
        use MessageType as T;
        match t {
            _ if !t.is_receivable() => false,
            T::HelloRequest => self.state == ConnectionState::WaitingForHello,
            T::ConnectRequest => self.state == ConnectionState::WaitingForConnect,
            T::PingRequest
            | T::PingResponse
            | T::DisconnectRequest
            | T::DisconnectResponse
            | T::DeviceInfoRequest => self.state != ConnectionState::WaitingForHello,
            _ => self.state == ConnectionState::Connected,
        }
    }

    fn fatal_error(&mut self, error: &ServerError) {
        metrics::counter!(metric_defs::FATAL_ERRORS.name, "reason" => error.reason()).increment(1);
        self.link.close();
    }

    fn handle(&mut self, ctx: &mut ServerContext, request: Request) -> ServerResult<()> {
        match request {
            Request::Hello(req) => {
                self.client_info = format!("{} ({})", req.client_info, self.link.transport.peer());
                debug!("Hello from client '{}'", self.client_info);
                if !self.link.send_message(&HelloResponse::new(ctx.device.server_info())) {
                    return Err(ServerError::SendFailed("hello response"));
                }
                self.state = ConnectionState::WaitingForConnect;
            }
            Request::Connect(req) => {
                let correct = ctx.check_password(&req.password);
                let resp = ConnectResponse {
                    invalid_password: !correct,
                };
                if !self.link.send_message(&resp) {
                    return Err(ServerError::SendFailed("connect response"));
                }
                if correct {
                    debug!("Client '{}' connected successfully", self.client_info);
                    self.state = ConnectionState::Connected;
                    if ctx.config.time_sync {
                        self.send_time_request();
                    }
                } else {
                    warn!("Client '{}' sent an invalid password", self.client_info);
                }
            }
            Request::Disconnect(req) => {
                debug!(
                    "Client '{}' requested disconnect: {}",
                    self.client_info, req.reason
                );
                if !self.link.send_message(&DisconnectResponse) {
                    return Err(ServerError::SendFailed("disconnect response"));
                }
                self.link.close();
            }
            Request::DisconnectAck(_) => self.link.close(),
            Request::Ping(_) => {
                self.link.send_message(&PingResponse);
            }
            Request::Pong(_) => self.awaiting_pong = false,
            Request::DeviceInfo(_) => {
                self.link.send_message(&ctx.device_info_response());
            }
            Request::ListEntities(_) => self.list_entities.begin(),
            Request::SubscribeStates(_) => {
                self.link.state_subscription = true;
                self.initial_state.begin();
            }
            Request::SubscribeLogs(req) => {
                self.log_subscription = req.level;
                if req.dump_config {
                    ctx.dump_config_requested = true;
                }
            }
            Request::CoverCommand(req) => {
                if let Some(cover) = ctx.registry.cover_by_key(req.key) {
                    match CoverCall::from_request(&req) {
                        Some(call) => cover.control(call),
                        None => trace!("Cover command without a known action, ignored"),
                    }
                }
            }
            Request::FanCommand(req) => {
                if let Some(fan) = ctx.registry.fan_by_key(req.key) {
                    fan.control(FanCall::from(&req));
                }
            }
            Request::LightCommand(req) => {
                if let Some(light) = ctx.registry.light_by_key(req.key) {
                    light.control(LightCall::from(&req));
                }
            }
            Request::SwitchCommand(req) => {
                if let Some(switch) = ctx.registry.switch_by_key(req.key) {
                    switch.control(SwitchCall::from(&req));
                }
            }
            Request::SubscribeServiceCalls(_) => self.link.service_call_subscription = true,
            Request::Time(resp) => match ctx.time_listener.as_mut() {
                Some(listener) => listener(resp.epoch_seconds),
                None => trace!("Time response with no listener, ignored"),
            },
            Request::SubscribeHomeAssistantStates(_) => {
                for sub in &ctx.state_subscriptions {
                    self.link.send_message(&SubscribeHomeAssistantStateResponse {
                        entity_id: sub.entity_id.clone(),
                    });
                }
            }
            Request::HomeAssistantState(resp) => {
                for sub in ctx
                    .state_subscriptions
                    .iter()
                    .filter(|s| s.entity_id == resp.entity_id)
                {
                    sub.notify(&resp.state);
                }
            }
            Request::ExecuteService(req) => {
                let mut found = false;
                for service in &ctx.services {
                    if service.execute(&req) {
                        found = true;
                    }
                }
                if !found {
                    debug!("Could not find matching service for key 0x{:08X}", req.key);
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------------

    pub fn send_binary_sensor_state(&mut self, entity: &dyn BinarySensor, state: bool) -> bool {
        self.link.send_binary_sensor_state(entity, state)
    }

    pub fn send_cover_state(&mut self, entity: &dyn Cover) -> bool {
        self.link.send_cover_state(entity)
    }

    pub fn send_fan_state(&mut self, entity: &dyn Fan) -> bool {
        self.link.send_fan_state(entity)
    }

    pub fn send_light_state(&mut self, entity: &dyn Light) -> bool {
        self.link.send_light_state(entity)
    }

    pub fn send_sensor_state(&mut self, entity: &dyn Sensor, state: f32) -> bool {
        self.link.send_sensor_state(entity, state)
    }

    pub fn send_switch_state(&mut self, entity: &dyn Switch, state: bool) -> bool {
        self.link.send_switch_state(entity, state)
    }

    pub fn send_text_sensor_state(&mut self, entity: &dyn TextSensor, state: &str) -> bool {
        self.link.send_text_sensor_state(entity, state)
    }

    /// Forward a log line if the client subscribed at `level` or noisier.
    ///
    /// If the line does not fit, a bare `send_failed` marker is tried instead.
    pub fn send_log_message(&mut self, level: LogLevel, tag: &str, line: &str) -> bool {
        if self.log_subscription < level {
            return false;
        }
        let msg = SubscribeLogsResponse {
            level,
            tag: tag.to_string(),
            message: line.to_string(),
            send_failed: false,
        };
        if self.link.send_message(&msg) {
            return true;
        }
        self.link.send_message(&SubscribeLogsResponse {
            send_failed: true,
            ..Default::default()
        })
    }

    pub fn send_disconnect_request(&mut self, reason: &str) -> bool {
        self.link.send_message(&DisconnectRequest {
            reason: reason.to_string(),
        })
    }

    pub fn send_ping_request(&mut self) -> bool {
        trace!("Connection[{}]: sending ping", self.client_info);
        self.link.send_message(&PingRequest)
    }

    /// Forward a service call if the client subscribed to them.
    pub fn send_service_call(&mut self, call: &ServiceCallResponse) -> bool {
        if !self.link.service_call_subscription {
            return false;
        }
        self.link.send_message(call)
    }

    pub fn send_time_request(&mut self) -> bool {
        self.link.send_message(&GetTimeRequest)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("client_info", &self.client_info)
            .field("state", &self.state)
            .field("remove", &self.link.remove)
            .field("last_traffic", &self.last_traffic)
            .field("awaiting_pong", &self.awaiting_pong)
            .finish_non_exhaustive()
    }
}
