//! The device main loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use devapi_proto::ServiceArgType;
use devapi_server::{
    Clock, HomeAssistantStateSubscription, Server, ServiceArg, ServiceArgValue, SystemClock,
    TickOutcome, UserService,
};
use tracing::{info, warn};

use crate::config::RunnerConfig;
use crate::demo::{self, DemoDriver, EntityUpdate};
use crate::error::RunnerResult;
use crate::logging::LogLine;
use crate::tcp::TcpServer;

/// Ticks spent flushing disconnect requests on shutdown.
const SHUTDOWN_FLUSH_TICKS: usize = 10;

/// Why [`App::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Shutdown,
    RebootRequested,
}

/// Server, transports and demo entities wired together.
pub struct App {
    server: Server,
    driver: DemoDriver,
    updates: Receiver<EntityUpdate>,
    logs: Option<Receiver<LogLine>>,
    clock: SystemClock,
    tick_interval: Duration,
    config: RunnerConfig,
}

impl App {
    /// Build the server and demo entities from `config`.
    ///
    /// `logs` receives forwarded log lines; pass `None` to skip log
    /// forwarding.
    pub fn new(config: RunnerConfig, logs: Option<Receiver<LogLine>>) -> RunnerResult<Self> {
        let clock = SystemClock::new();
        let (registry, driver, updates) =
            demo::build(&config.entities, config.seed, config.sample_interval_ms)?;
        let mut server = Server::new(
            config.server.clone(),
            config.device.clone(),
            registry,
            clock.now_millis(),
        )?;

        server.register_user_service(UserService::new(
            "log_message",
            vec![ServiceArg::new("message", ServiceArgType::String)],
            |args| {
                if let Some(ServiceArgValue::String(message)) = args.first() {
                    info!("Controller says: {}", message);
                }
            },
        ));
        for entity_id in &config.follow_states {
            let id = entity_id.clone();
            server.subscribe_home_assistant_state(HomeAssistantStateSubscription::new(
                entity_id.clone(),
                move |state| info!("'{}' is now '{}'", id, state),
            ));
        }
        server.set_time_listener(|epoch| match DateTime::<Utc>::from_timestamp(i64::from(epoch), 0) {
            Some(time) => info!("Controller time is {}", time.to_rfc3339()),
            None => warn!("Controller sent an invalid time: {}", epoch),
        });

        Ok(App {
            server,
            driver,
            updates,
            logs,
            clock,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            config,
        })
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    /// One pass: forward logs and entity changes, then tick the server.
    pub fn step(&mut self, tcp: Option<&TcpServer>) -> TickOutcome {
        let now = self.clock.now_millis();

        if let Some(tcp) = tcp {
            while let Some(transport) = tcp.try_accept() {
                self.server.accept(Box::new(transport), now);
            }
        }

        if let Some(logs) = &self.logs {
            for line in logs.try_iter() {
                self.server.on_log_line(line.level, &line.tag, &line.message);
            }
        }

        self.driver.step(now);
        for update in self.updates.try_iter() {
            demo::apply_update(&mut self.server, update);
        }

        let outcome = self.server.tick(now);
        if self.server.take_dump_config_request() {
            self.dump_config();
        }
        outcome
    }

    /// Loop until `stop` is set or the server asks for a reboot.
    pub fn run(&mut self, tcp: &TcpServer, stop: &Arc<AtomicBool>) -> ExitReason {
        info!("Listening on {}", tcp.local_addr());
        loop {
            if stop.load(Ordering::Acquire) {
                self.server.shutdown("device shutting down");
                for _ in 0..SHUTDOWN_FLUSH_TICKS {
                    self.step(Some(tcp));
                    std::thread::sleep(self.tick_interval);
                }
                return ExitReason::Shutdown;
            }
            if self.step(Some(tcp)) == TickOutcome::RebootRequested {
                return ExitReason::RebootRequested;
            }
            std::thread::sleep(self.tick_interval);
        }
    }

    fn dump_config(&self) {
        let device = &self.config.device;
        info!("API server:");
        info!("  Device: {} ({})", device.name, device.model);
        info!("  Port: {}", self.config.server.port);
        info!("  Password: {}", if self.server.uses_password() { "YES" } else { "NO" });
        info!("  Entities: {}", self.server.context().registry().len());
        info!("  Reboot timeout: {} ms", self.config.server.reboot_timeout_ms);
    }
}
