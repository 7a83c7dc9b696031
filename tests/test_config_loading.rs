//! Configuration loading and validation tests
//!
//! Tests focus on what a daemon operator sees: which files load, which
//! overrides win, and which mistakes are rejected at startup.

use dagd_bridge::config::{BridgeConfig, BrokerAddress, ConfigError};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn config_file(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, "{content}").unwrap();
    temp_file
}

#[test]
fn test_config_loads_successfully_from_valid_toml() {
    let temp_file = config_file(
        r#"
[broker]
address = "broker.pool.internal:1884"
client_id = "dagd-rig-7"
keep_alive_secs = 120

[poll]
wait_ms = 50
"#,
    );

    let config = BridgeConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.broker.client_id, "dagd-rig-7");
    assert_eq!(config.keep_alive(), Duration::from_secs(120));
    assert_eq!(config.poll_wait(), Duration::from_millis(50));
    assert_eq!(
        config.broker_address().unwrap(),
        BrokerAddress {
            host: "broker.pool.internal".to_string(),
            port: 1884,
            tls: false,
        }
    );
}

#[test]
fn test_empty_file_gives_defaults() {
    let temp_file = config_file("");

    let config = BridgeConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config, BridgeConfig::default());
    assert_eq!(config.broker.client_id, "dagd");
    assert_eq!(config.keep_alive(), Duration::from_secs(3600));
    assert_eq!(config.poll_wait(), Duration::from_millis(200));
    assert_eq!(config.broker_address().unwrap().to_string(), "mqtt://localhost:1883");
}

#[test]
fn test_tls_url_in_file() {
    let temp_file = config_file(
        r#"
[broker]
address = "mqtts://broker.example.com"
"#,
    );

    let address = BridgeConfig::load_from_file(temp_file.path())
        .unwrap()
        .broker_address()
        .unwrap();

    assert!(address.tls);
    assert_eq!(address.port, 8883);
}

#[test]
fn test_malformed_port_in_file_is_rejected() {
    let temp_file = config_file(
        r#"
[broker]
address = "localhost:mqtt"
"#,
    );

    let result = BridgeConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::InvalidPort(port)) if port == "mqtt"));
}

#[test]
fn test_invalid_toml_is_rejected() {
    let temp_file = config_file("[broker\naddress = ");

    let result = BridgeConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_missing_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let result = BridgeConfig::load_from_file(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_keep_alive_out_of_range_is_rejected() {
    let temp_file = config_file(
        r#"
[broker]
keep_alive_secs = 1
"#,
    );

    let result = BridgeConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_command_line_override_wins() {
    let temp_file = config_file(
        r#"
[broker]
address = "file-host:1883"
"#,
    );

    let config = BridgeConfig::load_from_file(temp_file.path())
        .unwrap()
        .with_broker_override(Some("cli-host:2883"))
        .unwrap();

    let address = config.broker_address().unwrap();
    assert_eq!(address.host, "cli-host");
    assert_eq!(address.port, 2883);
}

#[test]
fn test_bad_override_is_rejected() {
    let result = BridgeConfig::default().with_broker_override(Some("host:99999"));
    assert!(matches!(result, Err(ConfigError::InvalidPort(_))));
}

#[test]
fn test_config_round_trips_through_toml() {
    let config = BridgeConfig::default();
    let text = toml::to_string_pretty(&config).unwrap();
    let back: BridgeConfig = toml::from_str(&text).unwrap();
    assert_eq!(back, config);
}
