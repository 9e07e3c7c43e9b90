//! Server configuration.

use devapi_proto::DEFAULT_PORT;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Default time without any client before a reboot is requested.
pub const DEFAULT_REBOOT_TIMEOUT_MS: u64 = 300_000;
/// Default idle time before the device pings a client.
pub const DEFAULT_KEEPALIVE_MS: u64 = 60_000;

/// API server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP port to listen on.
    pub port: u16,
    /// Password clients must present. Empty disables authentication.
    pub password: String,
    /// Request a reboot after this long without clients. 0 disables.
    pub reboot_timeout_ms: u64,
    /// Ping a client after this long without traffic. It is dropped if
    /// nothing arrives within one and a half intervals.
    pub keepalive_ms: u64,
    /// Ask each newly authenticated client for the current time.
    pub time_sync: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: DEFAULT_PORT,
            password: String::new(),
            reboot_timeout_ms: DEFAULT_REBOOT_TIMEOUT_MS,
            keepalive_ms: DEFAULT_KEEPALIVE_MS,
            time_sync: false,
        }
    }
}

impl ServerConfig {
    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> ServerResult<()> {
        if self.keepalive_ms == 0 {
            return Err(ServerError::InvalidConfig(
                "keepalive_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Silence after a ping before the client is dropped.
    pub fn pong_timeout_ms(&self) -> u64 {
        self.keepalive_ms.saturating_add(self.keepalive_ms / 2)
    }
}

/// Identity reported in the hello and device info responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    pub name: String,
    pub mac_address: String,
    pub version: String,
    pub compilation_time: String,
    pub model: String,
    pub has_deep_sleep: bool,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        DeviceInfo {
            name: "device".into(),
            mac_address: String::new(),
            version: env!("CARGO_PKG_VERSION").into(),
            compilation_time: String::new(),
            model: String::new(),
            has_deep_sleep: false,
        }
    }
}

impl DeviceInfo {
    /// Reject identities clients cannot use.
    pub fn validate(&self) -> ServerResult<()> {
        if self.name.is_empty() {
            return Err(ServerError::InvalidConfig("device name must not be empty".into()));
        }
        Ok(())
    }

    /// Text sent as `server_info` in the hello response.
    pub fn server_info(&self) -> String {
        format!("{} (devapi v{})", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 6053);
        assert_eq!(config.reboot_timeout_ms, 300_000);
        assert_eq!(config.pong_timeout_ms(), 90_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pong_timeout_saturates() {
        let config = ServerConfig {
            keepalive_ms: 1_001,
            ..Default::default()
        };
        assert_eq!(config.pong_timeout_ms(), 1_501);

        let config = ServerConfig {
            keepalive_ms: u64::MAX,
            ..Default::default()
        };
        assert_eq!(config.pong_timeout_ms(), u64::MAX);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"password": "hunter2", "time_sync": true}"#).unwrap();
        assert_eq!(config.password, "hunter2");
        assert!(config.time_sync);
        assert_eq!(config.keepalive_ms, DEFAULT_KEEPALIVE_MS);
    }

    #[test]
    fn test_validation() {
        let config = ServerConfig {
            keepalive_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ServerError::InvalidConfig(_))));

        let device = DeviceInfo {
            name: String::new(),
            ..Default::default()
        };
        assert!(device.validate().is_err());
    }

    #[test]
    fn test_server_info() {
        let device = DeviceInfo {
            name: "porch".into(),
            version: "1.2.0".into(),
            ..Default::default()
        };
        assert_eq!(device.server_info(), "porch (devapi v1.2.0)");
    }
}
