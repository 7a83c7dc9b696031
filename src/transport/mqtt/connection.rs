//! Pure connection state and option handling for the MQTT link
//!
//! This module contains pure functions for connection state management and
//! translating the bridge configuration into rumqttc options.

use crate::config::{BridgeConfig, ConfigError};
use crate::protocol::Qos;
use rumqttc::v5::{mqttbytes::QoS, MqttOptions};
use rumqttc::Transport as RumqttcTransport;
use thiserror::Error;

/// Connection lifecycle state
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// Waiting for the broker to acknowledge a (re)connect
    Connecting,
    /// Session established and subscriptions issued
    Connected,
    /// Session lost, with reason; reconnection not yet requested
    Disconnected(String),
    /// Unrecoverable; the daemon is expected to exit
    Fatal(String),
}

/// MQTT transport errors
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("connect failed: {0}")]
    ConnectionRefused(String),
    #[error("initial connect to broker failed: {0}")]
    InitialConnectFailed(String),
    #[error("mqtt subscribe to {topic} failed")]
    SubscriptionFailed {
        topic: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("broker refused subscriptions: {0:?}")]
    SubscriptionRejected(Vec<u8>),
    #[error("mqtt publish ({topic}) failed")]
    PublishFailed {
        topic: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("mqtt reconnect failed: {0}")]
    ReconnectFailed(String),
    #[error("mqtt link closed: all request handles dropped")]
    LinkClosed,
    #[error("mqtt link halted after fatal error: {0}")]
    Halted(String),
    #[error("Invalid broker configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl From<Qos> for QoS {
    fn from(qos: Qos) -> Self {
        match qos {
            Qos::BestEffort => QoS::AtMostOnce,
            Qos::Acknowledged => QoS::AtLeastOnce,
            Qos::ExactlyOnce => QoS::ExactlyOnce,
        }
    }
}

/// Pure function to configure MQTT options from the bridge configuration
pub fn configure_mqtt_options(config: &BridgeConfig) -> Result<MqttOptions, MqttError> {
    config.validate()?;
    let address = config.broker_address()?;

    let mut mqtt_options = MqttOptions::new(
        config.broker.client_id.clone(),
        address.host.clone(),
        address.port,
    );

    if address.tls {
        mqtt_options.set_transport(RumqttcTransport::tls_with_default_config());
    }

    mqtt_options.set_keep_alive(config.keep_alive());

    Ok(mqtt_options)
}
