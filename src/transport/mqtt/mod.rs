//! MQTT link for the bridge
//!
//! Split the same way as the rest of the transport code: pure pieces that can
//! be tested without a broker, and one impure client.
//!
//! - [`connection`] - Connection state, errors, and rumqttc option setup
//! - [`message_handler`] - Pure routing of rumqttc events
//! - [`lifecycle`] - Subscribe-on-connect and reconnect-on-disconnect
//! - [`client`] - The rumqttc-backed [`BrokerLink`](crate::transport::BrokerLink)
//!
//! # Usage
//!
//! ```rust,no_run
//! use dagd_bridge::config::BridgeConfig;
//! use dagd_bridge::transport::mqtt::MqttClient;
//! use dagd_bridge::Bridge;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let link = MqttClient::new(&BridgeConfig::default())?;
//! let mut bridge = Bridge::new(link);
//! bridge.poll(Duration::from_millis(200)).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod lifecycle;
pub mod message_handler;

pub use client::MqttClient;
pub use connection::{configure_mqtt_options, ConnectionState, MqttError};
pub use lifecycle::{determine_next_state, ConnectionEvent, ConnectionLifecycle};
pub use message_handler::{EventRoute, MessageHandler};
