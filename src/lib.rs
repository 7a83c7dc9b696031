//! dagd-bridge - MQTT event bridge for the DAG mining daemon
//!
//! Keeps a mining daemon in step with the rest of the mining stack over an
//! MQTT broker. Three inbound topics drive a small piece of coordination
//! state (current algorithm and epoch, an upload hold flag, and a pending
//! shutdown flag); in-process listeners are told when it changes. One
//! retained outbound topic carries the daemon's status line.
//!
//! # Overview
//!
//! - [`Bridge`] - the poll driver that ties everything together
//! - [`protocol`] - topic names, payload decoding and the algorithm table
//! - [`state::CoordinationState`] - what the broker has told us so far
//! - [`notify`] - listener registration and dispatch
//! - [`transport`] - the broker link and its connection lifecycle
//!
//! # Quick Start
//!
//! ```rust
//! use dagd_bridge::testing::FakeLink;
//! use dagd_bridge::{Bridge, NotifyKind};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let link = FakeLink::new();
//! link.connack();
//! link.message("/mine/epoch", "412 etchash");
//!
//! let mut bridge = Bridge::new(link);
//! bridge.register(NotifyKind::Epoch, |state| {
//!     println!("epoch {} on {:?}", state.epoch(), state.algorithm());
//! });
//!
//! bridge.poll(Duration::ZERO).await.unwrap();
//! bridge.poll(Duration::ZERO).await.unwrap();
//! assert_eq!(bridge.state().epoch(), 412);
//! # });
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod notify;
pub mod observability;
pub mod protocol;
pub mod state;
pub mod testing;
pub mod transport;

pub use bridge::{Bridge, StatusPublisher};
pub use config::{BridgeConfig, BrokerAddress, ConfigError};
pub use error::{BridgeError, BridgeResult};
pub use notify::{Notification, NotifyKind, SubscriptionRegistry};
pub use protocol::{DagAlgo, DecodeError, TopicDecoder};
pub use state::CoordinationState;
pub use transport::mqtt::{ConnectionState, MqttClient};
pub use transport::{BrokerLink, MqttError};
