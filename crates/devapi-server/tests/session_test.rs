//! End-to-end tests of API sessions over in-memory transports.
//!
//! Each test plays the controller: it writes request frames into a
//! [`MemoryPeer`], ticks the server and decodes whatever came back.

use std::sync::Arc;

use devapi_proto::{
    encode_frame, ConnectRequest, ConnectResponse, CoverCommand, CoverCommandRequest, CoverState,
    DeviceInfoRequest, DeviceInfoResponse,
    DisconnectRequest, DisconnectResponse, ExecuteServiceArgument, ExecuteServiceRequest,
    FanCommandRequest, FanSpeed, FrameCodec, GetTimeResponse, HelloRequest, HelloResponse, HomeAssistantStateResponse,
    KeyValue, LightCommandRequest, LightStateResponse, ListEntitiesBinarySensorResponse, ListEntitiesLightResponse,
    ListEntitiesRequest, ListEntitiesSensorResponse, ListEntitiesServicesResponse,
    ListEntitiesSwitchResponse, LogLevel, Message, MessageType,
    SensorStateResponse, ServiceArgType, ServiceCallResponse, SubscribeHomeAssistantStateResponse,
    SubscribeHomeAssistantStatesRequest, SubscribeLogsRequest, SubscribeLogsResponse,
    SubscribeServiceCallsRequest, SubscribeStatesRequest, SwitchCommandRequest,
    SwitchStateResponse,
};
use devapi_server::{
    BinarySensor, ConnectionState, Cover, CoverCall, DeviceInfo, Entity, EntityInfo,
    EntityRegistry, Fan, FanCall, FanTraits, FanValues, HomeAssistantStateSubscription, Light,
    LightCall, LightTraits, LightValues, MemoryPeer,
    MemoryTransport, Sensor, Server, ServerConfig, ServiceArg, ServiceArgValue, Switch,
    SwitchCall, TickOutcome, UserService,
};
use parking_lot::Mutex;

// ============================================================================
// Test entities
// ============================================================================

struct TestSwitch {
    info: EntityInfo,
    state: Mutex<bool>,
    calls: Mutex<Vec<SwitchCall>>,
}

impl TestSwitch {
    fn new(info: EntityInfo) -> Arc<Self> {
        Arc::new(TestSwitch {
            info,
            state: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
        })
    }
}

impl Entity for TestSwitch {
    fn info(&self) -> &EntityInfo {
        &self.info
    }
}

impl Switch for TestSwitch {
    fn icon(&self) -> String {
        "mdi:power".into()
    }

    fn state(&self) -> bool {
        *self.state.lock()
    }

    fn control(&self, call: SwitchCall) {
        *self.state.lock() = call.state;
        self.calls.lock().push(call);
    }
}

struct TestSensor {
    info: EntityInfo,
    state: Mutex<Option<f32>>,
}

impl Entity for TestSensor {
    fn info(&self) -> &EntityInfo {
        &self.info
    }
}

impl Sensor for TestSensor {
    fn unit_of_measurement(&self) -> String {
        "°C".into()
    }

    fn accuracy_decimals(&self) -> i32 {
        1
    }

    fn state(&self) -> Option<f32> {
        *self.state.lock()
    }
}

struct TestBinarySensor {
    info: EntityInfo,
}

impl Entity for TestBinarySensor {
    fn info(&self) -> &EntityInfo {
        &self.info
    }
}

impl BinarySensor for TestBinarySensor {
    fn device_class(&self) -> String {
        "motion".into()
    }

    fn state(&self) -> Option<bool> {
        None
    }
}

struct TestLight {
    info: EntityInfo,
    values: Mutex<LightValues>,
    calls: Mutex<Vec<LightCall>>,
}

impl Entity for TestLight {
    fn info(&self) -> &EntityInfo {
        &self.info
    }
}

impl Light for TestLight {
    fn traits(&self) -> LightTraits {
        LightTraits {
            supports_brightness: true,
            ..Default::default()
        }
    }

    fn effects(&self) -> Vec<String> {
        vec!["Rainbow".into()]
    }

    fn values(&self) -> LightValues {
        self.values.lock().clone()
    }

    fn control(&self, call: LightCall) {
        let mut values = self.values.lock();
        if let Some(state) = call.state {
            values.state = state;
        }
        if let Some(brightness) = call.brightness {
            values.brightness = brightness;
        }
        self.calls.lock().push(call);
    }
}

struct TestCover {
    info: EntityInfo,
    calls: Mutex<Vec<CoverCall>>,
}

impl Entity for TestCover {
    fn info(&self) -> &EntityInfo {
        &self.info
    }
}

impl Cover for TestCover {
    fn state(&self) -> Option<CoverState> {
        None
    }

    fn control(&self, call: CoverCall) {
        self.calls.lock().push(call);
    }
}

struct TestFan {
    info: EntityInfo,
    calls: Mutex<Vec<FanCall>>,
}

impl Entity for TestFan {
    fn info(&self) -> &EntityInfo {
        &self.info
    }
}

impl Fan for TestFan {
    fn traits(&self) -> FanTraits {
        FanTraits {
            supports_oscillation: true,
            supports_speed: true,
        }
    }

    fn values(&self) -> FanValues {
        FanValues::default()
    }

    fn control(&self, call: FanCall) {
        self.calls.lock().push(call);
    }
}

struct Fixture {
    server: Server,
    switch: Arc<TestSwitch>,
    sensor: Arc<TestSensor>,
    light: Arc<TestLight>,
    cover: Arc<TestCover>,
    fan: Arc<TestFan>,
    now: u64,
}

fn fixture_with(config: ServerConfig) -> Fixture {
    build_fixture(config, false)
}

/// `with_actuators` also registers a cover and a fan.
fn build_fixture(config: ServerConfig, with_actuators: bool) -> Fixture {
    let switch = TestSwitch::new(EntityInfo::new("Relay"));
    let hidden = TestSwitch::new(EntityInfo::new("Boot Relay").with_internal(true));
    let sensor = Arc::new(TestSensor {
        info: EntityInfo::new("Outdoor Temperature"),
        state: Mutex::new(None),
    });
    let motion = Arc::new(TestBinarySensor {
        info: EntityInfo::new("Hall Motion").with_unique_id("hall-pir-1"),
    });
    let light = Arc::new(TestLight {
        info: EntityInfo::new("Desk Lamp"),
        values: Mutex::new(LightValues {
            state: true,
            brightness: 0.5,
            red: 1.0,
            effect: "Rainbow".into(),
            ..Default::default()
        }),
        calls: Mutex::new(Vec::new()),
    });
    let cover = Arc::new(TestCover {
        info: EntityInfo::new("Garage Door"),
        calls: Mutex::new(Vec::new()),
    });
    let fan = Arc::new(TestFan {
        info: EntityInfo::new("Ceiling Fan"),
        calls: Mutex::new(Vec::new()),
    });

    let mut registry = EntityRegistry::new();
    registry.register_binary_sensor(motion).unwrap();
    registry.register_light(light.clone()).unwrap();
    registry.register_sensor(sensor.clone()).unwrap();
    registry.register_switch(switch.clone()).unwrap();
    registry.register_switch(hidden).unwrap();
    if with_actuators {
        registry.register_cover(cover.clone()).unwrap();
        registry.register_fan(fan.clone()).unwrap();
    }

    let device = DeviceInfo {
        name: "kitchen".into(),
        mac_address: "AA:BB:CC:DD:EE:FF".into(),
        ..Default::default()
    };
    let server = Server::new(config, device, registry, 0).unwrap();
    Fixture {
        server,
        switch,
        sensor,
        light,
        cover,
        fan,
        now: 0,
    }
}

fn fixture() -> Fixture {
    fixture_with(ServerConfig::default())
}

impl Fixture {
    fn connect_client(&mut self) -> Client {
        let (transport, peer) = MemoryTransport::pair("10.0.0.7:51000");
        self.server.accept(Box::new(transport), self.now);
        Client::new(peer)
    }

    fn tick(&mut self) -> TickOutcome {
        self.now += 10;
        self.server.tick(self.now)
    }

    fn tick_n(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Client that has completed hello and connect.
    fn authenticated_client(&mut self, password: &str) -> Client {
        let mut client = self.connect_client();
        client.send(&HelloRequest {
            client_info: "Test Controller".into(),
        });
        client.send(&ConnectRequest {
            password: password.into(),
        });
        self.tick();
        let frames = client.frames();
        assert_eq!(frames[0].0, MessageType::HelloResponse);
        let resp: ConnectResponse = decode(&frames[1]);
        assert!(!resp.invalid_password);
        client
    }
}

// ============================================================================
// Client side
// ============================================================================

type Frame = (MessageType, Vec<u8>);

struct Client {
    peer: MemoryPeer,
    codec: FrameCodec,
}

impl Client {
    fn new(peer: MemoryPeer) -> Self {
        Client {
            peer,
            codec: FrameCodec::new(),
        }
    }

    fn send<M: Message>(&self, msg: &M) {
        self.peer.send(&frame_bytes(msg));
    }

    /// Every complete frame the server has written since the last call.
    fn frames(&mut self) -> Vec<Frame> {
        self.codec.push(&self.peer.take_written());
        let mut out = Vec::new();
        while let Some(header) = self.codec.peek().unwrap() {
            let message_type = MessageType::from_u32(header.message_type).unwrap();
            out.push((message_type, self.codec.payload(&header).to_vec()));
            self.codec.consume(&header);
        }
        out
    }

    fn types(&mut self) -> Vec<MessageType> {
        self.frames().into_iter().map(|(t, _)| t).collect()
    }
}

fn frame_bytes<M: Message>(msg: &M) -> Vec<u8> {
    encode_frame(M::MESSAGE_TYPE.id(), &msg.encode_to_vec())
}

fn decode<M: Message>(frame: &Frame) -> M {
    assert_eq!(frame.0, M::MESSAGE_TYPE);
    M::decode(&frame.1).unwrap()
}

fn find<M: Message>(frames: &[Frame]) -> M {
    let frame = frames
        .iter()
        .find(|(t, _)| *t == M::MESSAGE_TYPE)
        .unwrap_or_else(|| panic!("no {:?} frame", M::MESSAGE_TYPE));
    decode(frame)
}

// ============================================================================
// Handshake
// ============================================================================

#[test]
fn test_handshake_and_device_info() {
    let mut fx = fixture_with(ServerConfig {
        password: "hunter2".into(),
        ..Default::default()
    });
    let mut client = fx.connect_client();

    client.send(&HelloRequest {
        client_info: "Test Controller".into(),
    });
    fx.tick();
    let hello: HelloResponse = decode(&client.frames()[0]);
    assert_eq!(hello.api_version_major, 1);
    assert_eq!(hello.api_version_minor, 0);
    assert!(hello.server_info.starts_with("kitchen"));
    assert_eq!(
        fx.server.connections()[0].client_info(),
        "Test Controller (10.0.0.7:51000)"
    );

    // Device info is allowed before authentication.
    client.send(&DeviceInfoRequest);
    fx.tick();
    let info: DeviceInfoResponse = decode(&client.frames()[0]);
    assert!(info.uses_password);
    assert_eq!(info.name, "kitchen");
    assert_eq!(info.mac_address, "AA:BB:CC:DD:EE:FF");

    client.send(&ConnectRequest {
        password: "hunter2".into(),
    });
    fx.tick();
    let resp: ConnectResponse = decode(&client.frames()[0]);
    assert!(!resp.invalid_password);
    assert_eq!(fx.server.connections()[0].state(), ConnectionState::Connected);
    assert!(fx.server.is_connected());
}

#[test]
fn test_wrong_password_keeps_session_locked() {
    let mut fx = fixture_with(ServerConfig {
        password: "hunter2".into(),
        ..Default::default()
    });
    let mut client = fx.connect_client();
    client.send(&HelloRequest::default());
    client.send(&ConnectRequest {
        password: "hunter3".into(),
    });
    fx.tick();

    let frames = client.frames();
    let resp: ConnectResponse = decode(&frames[1]);
    assert!(resp.invalid_password);
    assert_eq!(
        fx.server.connections()[0].state(),
        ConnectionState::WaitingForConnect
    );

    client.send(&ListEntitiesRequest);
    fx.tick();
    assert!(client.peer.is_closed());
    assert!(client.frames().is_empty());
    fx.tick();
    assert_eq!(fx.server.connection_count(), 0);
}

#[test]
fn test_command_before_hello_closes_connection() {
    let mut fx = fixture();
    let client = fx.connect_client();
    client.send(&SwitchCommandRequest {
        key: fx.switch.key(),
        state: true,
    });
    fx.tick();

    assert!(client.peer.is_closed());
    assert!(client.peer.take_written().is_empty());
    assert!(fx.switch.calls.lock().is_empty());
}

#[test]
fn test_second_hello_is_rejected() {
    let mut fx = fixture();
    let client = fx.connect_client();
    client.send(&HelloRequest::default());
    client.send(&HelloRequest::default());
    fx.tick();
    assert!(client.peer.is_closed());
}

#[test]
fn test_client_disconnect() {
    let mut fx = fixture();
    let mut client = fx.authenticated_client("");
    client.send(&DisconnectRequest {
        reason: "bye".into(),
    });
    fx.tick();
    assert_eq!(client.types(), vec![MessageType::DisconnectResponse]);
    assert!(client.peer.is_closed());
    fx.tick();
    assert_eq!(fx.server.connection_count(), 0);
}

#[test]
fn test_shutdown_requests_disconnect() {
    let mut fx = fixture();
    let mut client = fx.authenticated_client("");
    fx.server.shutdown("reboot");
    let req: DisconnectRequest = decode(&client.frames()[0]);
    assert_eq!(req.reason, "reboot");

    client.send(&DisconnectResponse);
    fx.tick();
    assert!(client.peer.is_closed());
}

// ============================================================================
// Entity listing
// ============================================================================

#[test]
fn test_list_entities_describes_visible_entities() {
    let mut fx = fixture();
    fx.server.register_user_service(UserService::new(
        "calibrate",
        vec![ServiceArg::new("offset", ServiceArgType::Float)],
        |_| {},
    ));
    let mut client = fx.authenticated_client("");

    client.send(&ListEntitiesRequest);
    fx.tick_n(30);
    let frames = client.frames();
    let types: Vec<_> = frames.iter().map(|(t, _)| *t).collect();
    assert_eq!(
        types,
        vec![
            MessageType::ListEntitiesBinarySensorResponse,
            MessageType::ListEntitiesLightResponse,
            MessageType::ListEntitiesSensorResponse,
            MessageType::ListEntitiesSwitchResponse,
            MessageType::ListEntitiesServicesResponse,
            MessageType::ListEntitiesDoneResponse,
        ]
    );

    let motion: ListEntitiesBinarySensorResponse = find(&frames);
    assert_eq!(motion.listing.unique_id, "hall-pir-1");
    assert_eq!(motion.device_class, "motion");

    let light: ListEntitiesLightResponse = find(&frames);
    assert_eq!(light.effects, vec!["None", "Rainbow"]);
    assert!(light.supports_brightness);
    assert!(!light.supports_rgb);

    let sensor: ListEntitiesSensorResponse = find(&frames);
    assert_eq!(sensor.listing.object_id, "outdoor_temperature");
    assert_eq!(sensor.listing.unique_id, "kitchensensoroutdoor_temperature");
    assert_eq!(sensor.listing.key, fx.sensor.key());
    assert_eq!(sensor.unit_of_measurement, "°C");
    assert_eq!(sensor.accuracy_decimals, 1);

    let switch: ListEntitiesSwitchResponse = find(&frames);
    assert_eq!(switch.listing.name, "Relay");
    assert_eq!(switch.icon, "mdi:power");

    let service: ListEntitiesServicesResponse = find(&frames);
    assert_eq!(service.name, "calibrate");
    assert_eq!(service.args[0].arg_type, ServiceArgType::Float);

    // A second request produces the same listing.
    client.send(&ListEntitiesRequest);
    fx.tick_n(30);
    assert_eq!(client.frames(), frames);
}

#[test]
fn test_listing_waits_for_transport_space() {
    let mut fx = fixture();
    let mut client = fx.authenticated_client("");
    client.peer.set_space(0);

    client.send(&ListEntitiesRequest);
    fx.tick_n(30);
    assert!(client.frames().is_empty());

    client.peer.set_space(4096);
    fx.tick_n(30);
    let types = client.types();
    assert_eq!(types.len(), 5);
    assert_eq!(types.last(), Some(&MessageType::ListEntitiesDoneResponse));
}

#[test]
fn test_fragmented_delivery_matches_whole() {
    let mut handshake = frame_bytes(&HelloRequest {
        client_info: "split".into(),
    });
    handshake.extend(frame_bytes(&ConnectRequest::default()));
    let mut requests = frame_bytes(&ListEntitiesRequest);
    requests.extend(frame_bytes(&SubscribeStatesRequest));

    let mut whole = fixture();
    let mut whole_client = whole.connect_client();
    whole_client.peer.send(&handshake);
    whole.tick();
    whole_client.peer.send(&requests);
    whole.tick_n(40);

    // Handshake split across ticks, requests split into one-byte chunks.
    let mut split = fixture();
    let mut split_client = split.connect_client();
    for b in &handshake {
        split_client.peer.send(&[*b]);
        split.tick();
    }
    for b in &requests {
        split_client.peer.send(&[*b]);
    }
    split.tick_n(40);

    let whole_frames = whole_client.frames();
    assert!(whole_frames.len() > 5);
    assert_eq!(split_client.frames(), whole_frames);
    assert_eq!(split.server.connections()[0].buffered_len(), 0);
}

// ============================================================================
// State streaming
// ============================================================================

#[test]
fn test_subscribe_states_dumps_known_states() {
    let mut fx = fixture();
    *fx.switch.state.lock() = true;
    let mut client = fx.authenticated_client("");

    client.send(&SubscribeStatesRequest);
    fx.tick_n(30);
    let frames = client.frames();
    let types: Vec<_> = frames.iter().map(|(t, _)| *t).collect();
    // No motion or temperature reading yet; the internal switch is skipped.
    assert_eq!(
        types,
        vec![
            MessageType::LightStateResponse,
            MessageType::SwitchStateResponse
        ]
    );

    let light: LightStateResponse = find(&frames);
    assert_eq!(light.key, fx.light.key());
    assert!(light.state);
    assert_eq!(light.brightness, 0.5);
    assert_eq!(light.red, 0.0);
    assert_eq!(light.effect, "Rainbow");

    let switch: SwitchStateResponse = find(&frames);
    assert!(switch.state);
}

#[test]
fn test_updates_reach_subscribed_clients_only() {
    let mut fx = fixture();
    let mut subscribed = fx.authenticated_client("");
    let mut idle = fx.authenticated_client("");
    subscribed.send(&SubscribeStatesRequest);
    fx.tick_n(30);
    subscribed.frames();

    *fx.sensor.state.lock() = Some(21.5);
    let sensor = fx.sensor.clone();
    fx.server.on_sensor_update(sensor.as_ref(), 21.5);

    let frames = subscribed.frames();
    assert_eq!(frames.len(), 1);
    let state: SensorStateResponse = decode(&frames[0]);
    assert_eq!(state.key, sensor.key());
    assert_eq!(state.state, 21.5);
    assert!(idle.frames().is_empty());
}

#[test]
fn test_switch_command_reaches_entity() {
    let mut fx = fixture();
    let client = fx.authenticated_client("");
    client.send(&SwitchCommandRequest {
        key: fx.switch.key(),
        state: true,
    });
    // Unknown keys are ignored.
    client.send(&SwitchCommandRequest {
        key: 0xDEAD_BEEF,
        state: true,
    });
    fx.tick();

    assert_eq!(fx.switch.calls.lock().as_slice(), &[SwitchCall { state: true }]);
    assert!(!client.peer.is_closed());
}

#[test]
fn test_light_command_reaches_entity() {
    let mut fx = fixture();
    let client = fx.authenticated_client("");
    client.send(&LightCommandRequest {
        key: fx.light.key(),
        has_state: true,
        state: false,
        has_brightness: true,
        brightness: 0.25,
        has_effect: true,
        effect: "None".into(),
        ..Default::default()
    });
    client.send(&LightCommandRequest {
        key: 0xDEAD_BEEF,
        has_state: true,
        ..Default::default()
    });
    fx.tick();

    assert_eq!(
        fx.light.calls.lock().as_slice(),
        &[LightCall {
            state: Some(false),
            brightness: Some(0.25),
            effect: Some("None".into()),
            ..Default::default()
        }]
    );
    let values = fx.light.values();
    assert!(!values.state);
    assert_eq!(values.brightness, 0.25);
    assert!(!client.peer.is_closed());
}

#[test]
fn test_fan_command_reaches_entity() {
    let mut fx = build_fixture(ServerConfig::default(), true);
    let client = fx.authenticated_client("");
    client.send(&FanCommandRequest {
        key: fx.fan.key(),
        has_state: true,
        state: true,
        has_speed: true,
        speed: FanSpeed::High as u32,
        ..Default::default()
    });
    client.send(&FanCommandRequest {
        key: fx.fan.key(),
        has_oscillating: true,
        oscillating: true,
        ..Default::default()
    });
    fx.tick();

    assert_eq!(
        fx.fan.calls.lock().as_slice(),
        &[
            FanCall {
                state: Some(true),
                speed: Some(FanSpeed::High),
                oscillating: None,
            },
            FanCall {
                state: None,
                speed: None,
                oscillating: Some(true),
            },
        ]
    );
}

#[test]
fn test_cover_command_reaches_entity() {
    let mut fx = build_fixture(ServerConfig::default(), true);
    let client = fx.authenticated_client("");
    client.send(&CoverCommandRequest {
        key: fx.cover.key(),
        has_state: true,
        command: CoverCommand::Close.as_u32(),
    });
    // No action flag, then an action the device does not know.
    client.send(&CoverCommandRequest {
        key: fx.cover.key(),
        has_state: false,
        command: CoverCommand::Open.as_u32(),
    });
    client.send(&CoverCommandRequest {
        key: fx.cover.key(),
        has_state: true,
        command: 9,
    });
    client.send(&CoverCommandRequest {
        key: 0xDEAD_BEEF,
        has_state: true,
        command: CoverCommand::Stop.as_u32(),
    });
    fx.tick();

    assert_eq!(
        fx.cover.calls.lock().as_slice(),
        &[CoverCall {
            command: CoverCommand::Close
        }]
    );
    assert!(fx.fan.calls.lock().is_empty());
    assert!(!client.peer.is_closed());
}

// ============================================================================
// Logs, services, time
// ============================================================================

#[test]
fn test_log_lines_follow_subscription_level() {
    let mut fx = fixture();
    let mut client = fx.authenticated_client("");
    fx.server.on_log_line(LogLevel::Error, "app", "before subscribing");
    assert!(client.frames().is_empty());

    client.send(&SubscribeLogsRequest {
        level: LogLevel::Warn,
        dump_config: true,
    });
    fx.tick();
    assert!(fx.server.take_dump_config_request());

    fx.server.on_log_line(LogLevel::Info, "app", "too detailed");
    fx.server.on_log_line(LogLevel::Warn, "sensor", "reading stale");
    let frames = client.frames();
    assert_eq!(frames.len(), 1);
    let line: SubscribeLogsResponse = decode(&frames[0]);
    assert_eq!(line.level, LogLevel::Warn);
    assert_eq!(line.tag, "sensor");
    assert_eq!(line.message, "reading stale");
    assert!(!line.send_failed);
}

#[test]
fn test_execute_service() {
    let mut fx = fixture();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let service = UserService::new(
        "set_target",
        vec![
            ServiceArg::new("target", ServiceArgType::Float),
            ServiceArg::new("boost", ServiceArgType::Bool),
        ],
        move |args| sink.lock().push(args.to_vec()),
    );
    let key = service.key();
    fx.server.register_user_service(service);
    let client = fx.authenticated_client("");

    client.send(&ExecuteServiceRequest {
        key,
        args: vec![
            ExecuteServiceArgument {
                float_: 19.5,
                ..Default::default()
            },
            ExecuteServiceArgument {
                bool_: true,
                ..Default::default()
            },
        ],
    });
    client.send(&ExecuteServiceRequest {
        key: key.wrapping_add(1),
        args: Vec::new(),
    });
    fx.tick();

    assert_eq!(
        seen.lock().as_slice(),
        &[vec![ServiceArgValue::Float(19.5), ServiceArgValue::Bool(true)]]
    );
    assert!(!client.peer.is_closed());
}

#[test]
fn test_service_calls_need_subscription() {
    let mut fx = fixture();
    let mut client = fx.authenticated_client("");
    let call = ServiceCallResponse {
        service: "notify.phone".into(),
        data: vec![KeyValue::new("message", "door open")],
        ..Default::default()
    };

    fx.server.send_service_call(&call);
    assert!(client.frames().is_empty());
    assert!(!fx.server.connections()[0].has_service_call_subscription());

    client.send(&SubscribeServiceCallsRequest);
    fx.tick();
    assert!(fx.server.connections()[0].has_service_call_subscription());
    fx.server.send_service_call(&call);
    let got: ServiceCallResponse = decode(&client.frames()[0]);
    assert_eq!(got, call);
}

#[test]
fn test_home_assistant_state_subscription() {
    let mut fx = fixture();
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = states.clone();
    fx.server
        .subscribe_home_assistant_state(HomeAssistantStateSubscription::new(
            "sun.sun",
            move |s| sink.lock().push(s.to_string()),
        ));
    let mut client = fx.authenticated_client("");

    client.send(&SubscribeHomeAssistantStatesRequest);
    fx.tick();
    let sub: SubscribeHomeAssistantStateResponse = decode(&client.frames()[0]);
    assert_eq!(sub.entity_id, "sun.sun");

    client.send(&HomeAssistantStateResponse {
        entity_id: "sun.sun".into(),
        state: "above_horizon".into(),
    });
    client.send(&HomeAssistantStateResponse {
        entity_id: "weather.home".into(),
        state: "rainy".into(),
    });
    fx.tick();
    assert_eq!(states.lock().as_slice(), &["above_horizon".to_string()]);
}

#[test]
fn test_time_sync() {
    let mut fx = fixture_with(ServerConfig {
        time_sync: true,
        ..Default::default()
    });
    let epoch = Arc::new(Mutex::new(None));
    let sink = epoch.clone();
    fx.server.set_time_listener(move |secs| *sink.lock() = Some(secs));

    let mut client = fx.connect_client();
    client.send(&HelloRequest::default());
    client.send(&ConnectRequest::default());
    fx.tick();
    assert_eq!(
        client.types(),
        vec![
            MessageType::HelloResponse,
            MessageType::ConnectResponse,
            MessageType::GetTimeRequest
        ]
    );

    client.send(&GetTimeResponse {
        epoch_seconds: 1_700_000_000,
    });
    fx.tick();
    assert_eq!(*epoch.lock(), Some(1_700_000_000));

    fx.server.request_time();
    assert_eq!(client.types(), vec![MessageType::GetTimeRequest]);
}

// ============================================================================
// Liveness
// ============================================================================

#[test]
fn test_keepalive_drops_silent_client() {
    let mut fx = fixture_with(ServerConfig {
        keepalive_ms: 1000,
        reboot_timeout_ms: 0,
        ..Default::default()
    });
    let mut client = fx.authenticated_client("");

    fx.tick_n(101);
    assert_eq!(client.types(), vec![MessageType::PingRequest]);
    assert!(fx.server.connections()[0].is_awaiting_pong());

    fx.tick_n(60);
    assert!(client.peer.is_closed());
    fx.tick();
    assert_eq!(fx.server.connection_count(), 0);
}

#[test]
fn test_reboot_after_idle_timeout() {
    let mut fx = fixture_with(ServerConfig {
        reboot_timeout_ms: 100,
        ..Default::default()
    });
    for _ in 0..10 {
        assert_eq!(fx.tick(), TickOutcome::Continue);
    }
    assert_eq!(fx.tick(), TickOutcome::RebootRequested);
}
