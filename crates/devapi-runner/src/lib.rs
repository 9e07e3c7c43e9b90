//! Runs a devapi device: loads a device file, starts the TCP listener, and
//! drives the API server with demo entities from a synchronous main loop.

pub mod app;
pub mod config;
pub mod demo;
pub mod error;
pub mod logging;
pub mod tcp;

pub use app::{App, ExitReason};
pub use config::{Overrides, RunnerConfig};
pub use error::{ConfigError, ConfigResult, RunnerError, RunnerResult};
pub use tcp::{TcpServer, TcpTransport};
