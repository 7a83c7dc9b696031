//! Bridge configuration
//!
//! The bridge needs very little: where the broker lives, how it identifies
//! itself, and how long the daemon's poll loop may block. Everything has a
//! default so the daemon runs without a config file at all.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Broker host used when no address is configured
pub const DEFAULT_HOST: &str = "localhost";
/// Plain MQTT port
pub const DEFAULT_PORT: u16 = 1883;
/// MQTT over TLS port, used for `mqtts://` addresses without a port
pub const DEFAULT_TLS_PORT: u16 = 8883;
/// Client identifier presented to the broker
pub const DEFAULT_CLIENT_ID: &str = "dagd";
/// Keep-alive interval in seconds
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 3600;
/// How long one poll may block waiting for broker activity
pub const DEFAULT_POLL_WAIT_MS: u64 = 200;

/// Top-level configuration file layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub broker: BrokerSection,
    #[serde(default)]
    pub poll: PollSection,
}

/// `[broker]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrokerSection {
    /// `host`, `host:port`, `mqtt://host:port` or `mqtts://host:port`
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

/// `[poll]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollSection {
    /// Upper bound for a blocking poll, in milliseconds
    #[serde(default = "default_poll_wait_ms")]
    pub wait_ms: u64,
}

fn default_address() -> String {
    format!("{DEFAULT_HOST}:{DEFAULT_PORT}")
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_keep_alive_secs() -> u64 {
    DEFAULT_KEEP_ALIVE_SECS
}

fn default_poll_wait_ms() -> u64 {
    DEFAULT_POLL_WAIT_MS
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            address: default_address(),
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            wait_ms: default_poll_wait_ms(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("invalid port \"{0}\"")]
    InvalidPort(String),
    #[error("Invalid broker address: {0}")]
    InvalidBrokerAddress(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Resolved broker endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl Default for BrokerAddress {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls: false,
        }
    }
}

impl BrokerAddress {
    /// Parse a broker address override.
    ///
    /// The plain form is `host[:port]`. An empty host selects
    /// [`DEFAULT_HOST`], a missing port selects [`DEFAULT_PORT`]. Anything
    /// containing `://` is parsed as an `mqtt`/`mqtts` URL.
    pub fn parse(address: &str) -> Result<Self, ConfigError> {
        if address.contains("://") {
            return Self::parse_url(address);
        }

        let (host, port) = match address.split_once(':') {
            Some((host, port)) => (host, parse_port(port)?),
            None => (address, DEFAULT_PORT),
        };
        let host = if host.is_empty() { DEFAULT_HOST } else { host };

        Ok(Self {
            host: host.to_string(),
            port,
            tls: false,
        })
    }

    fn parse_url(address: &str) -> Result<Self, ConfigError> {
        let url =
            Url::parse(address).map_err(|_| ConfigError::InvalidBrokerAddress(address.to_string()))?;

        let tls = match url.scheme() {
            "mqtt" | "tcp" => false,
            "mqtts" | "ssl" => true,
            _ => return Err(ConfigError::InvalidBrokerAddress(address.to_string())),
        };
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ConfigError::InvalidBrokerAddress(address.to_string()))?;
        let port = url
            .port()
            .unwrap_or(if tls { DEFAULT_TLS_PORT } else { DEFAULT_PORT });
        if port == 0 {
            return Err(ConfigError::InvalidPort(port.to_string()));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            tls,
        })
    }
}

impl std::fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = if self.tls { "mqtts" } else { "mqtt" };
        write!(f, "{scheme}://{}:{}", self.host, self.port)
    }
}

fn parse_port(port: &str) -> Result<u16, ConfigError> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidPort(port.to_string())),
        Ok(port) => Ok(port),
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: BridgeConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the configured broker address, e.g. from the command line
    pub fn with_broker_override(mut self, address: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(address) = address {
            BrokerAddress::parse(address)?;
            self.broker.address = address.to_string();
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.broker_address()?;

        if self.broker.client_id.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "broker.client_id must not be empty".to_string(),
            ));
        }

        // MQTT carries keep-alive as u16 seconds; rumqttc rejects very short intervals
        if self.broker.keep_alive_secs < 5 || self.broker.keep_alive_secs > u64::from(u16::MAX) {
            return Err(ConfigError::InvalidConfig(format!(
                "broker.keep_alive_secs must be between 5 and {}, got {}",
                u16::MAX,
                self.broker.keep_alive_secs
            )));
        }

        Ok(())
    }

    pub fn broker_address(&self) -> Result<BrokerAddress, ConfigError> {
        BrokerAddress::parse(&self.broker.address)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.broker.keep_alive_secs)
    }

    pub fn poll_wait(&self) -> Duration {
        Duration::from_millis(self.poll.wait_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.broker.address, "localhost:1883");
        assert_eq!(config.broker.client_id, "dagd");
        assert_eq!(config.keep_alive(), Duration::from_secs(3600));
        assert_eq!(config.poll_wait(), Duration::from_millis(200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_host_and_port() {
        let address = BrokerAddress::parse("broker.local:1884").unwrap();
        assert_eq!(address.host, "broker.local");
        assert_eq!(address.port, 1884);
        assert!(!address.tls);
    }

    #[test]
    fn test_parse_host_only_uses_default_port() {
        let address = BrokerAddress::parse("10.0.0.7").unwrap();
        assert_eq!(address.host, "10.0.0.7");
        assert_eq!(address.port, DEFAULT_PORT);
    }

    #[test]
    fn test_parse_empty_host_uses_localhost() {
        let address = BrokerAddress::parse(":2883").unwrap();
        assert_eq!(address.host, "localhost");
        assert_eq!(address.port, 2883);
    }

    #[test]
    fn test_malformed_port_is_rejected() {
        for bad in ["localhost:", "localhost:abc", "localhost:18x3", "localhost:0", "h:70000"] {
            let result = BrokerAddress::parse(bad);
            assert!(
                matches!(result, Err(ConfigError::InvalidPort(_))),
                "expected InvalidPort for {bad}"
            );
        }
    }

    #[test]
    fn test_invalid_port_message_names_the_port() {
        let err = BrokerAddress::parse("localhost:abc").unwrap_err();
        assert_eq!(err.to_string(), "invalid port \"abc\"");
    }

    #[test]
    fn test_parse_url_forms() {
        let plain = BrokerAddress::parse("mqtt://broker:1999").unwrap();
        assert_eq!(plain.host, "broker");
        assert_eq!(plain.port, 1999);
        assert!(!plain.tls);

        let tls = BrokerAddress::parse("mqtts://broker").unwrap();
        assert_eq!(tls.port, DEFAULT_TLS_PORT);
        assert!(tls.tls);
    }

    #[test]
    fn test_parse_url_rejects_unknown_scheme() {
        let result = BrokerAddress::parse("http://broker:80");
        assert!(matches!(result, Err(ConfigError::InvalidBrokerAddress(_))));
    }

    #[test]
    fn test_broker_override() {
        let config = BridgeConfig::default()
            .with_broker_override(Some("miner-hub:1885"))
            .unwrap();
        assert_eq!(config.broker.address, "miner-hub:1885");

        let unchanged = BridgeConfig::default().with_broker_override(None).unwrap();
        assert_eq!(unchanged.broker.address, "localhost:1883");

        assert!(BridgeConfig::default()
            .with_broker_override(Some("miner-hub:nope"))
            .is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: BridgeConfig = toml::from_str(
            r#"
[broker]
address = "10.1.1.1"
"#,
        )
        .unwrap();
        assert_eq!(config.broker.address, "10.1.1.1");
        assert_eq!(config.broker.client_id, "dagd");
        assert_eq!(config.poll.wait_ms, 200);
    }

    #[test]
    fn test_keep_alive_bounds() {
        let mut config = BridgeConfig::default();
        config.broker.keep_alive_secs = 1;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));

        config.broker.keep_alive_secs = 100_000;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_display_address() {
        let address = BrokerAddress::parse("broker:1884").unwrap();
        assert_eq!(address.to_string(), "mqtt://broker:1884");
    }
}
