//! Device side of the native API.
//!
//! A [`Server`] accepts client transports, walks each one through the
//! hello/connect handshake, describes the device's entities, streams their
//! state and forwards commands back to them. It never blocks: all work
//! happens inside [`Server::tick`], which the owner calls from its main loop
//! with the current time in milliseconds.
//!
//! ```no_run
//! use devapi_server::{DeviceInfo, EntityRegistry, Server, ServerConfig, TickOutcome};
//!
//! let mut server = Server::new(
//!     ServerConfig::default(),
//!     DeviceInfo::default(),
//!     EntityRegistry::new(),
//!     0,
//! )?;
//! if server.tick(10) == TickOutcome::RebootRequested {
//!     // restart the device
//! }
//! # Ok::<(), devapi_server::ServerError>(())
//! ```

pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod iterator;
pub mod server;
pub mod service;
pub mod transport;

pub use config::*;
pub use connection::{Connection, ConnectionState};
pub use entity::*;
pub use error::*;
pub use iterator::*;
pub use server::*;
pub use service::*;
pub use transport::*;
