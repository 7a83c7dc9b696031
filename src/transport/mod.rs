//! Broker transport
//!
//! The bridge talks to the broker through [`BrokerLink`] so the connection
//! lifecycle can be driven by a scripted link in tests instead of a live
//! broker. [`mqtt::MqttClient`] is the rumqttc-backed implementation.

use crate::protocol::Qos;
use std::os::fd::RawFd;
use std::time::Duration;

pub mod mqtt;

pub use mqtt::{EventRoute, MqttError};

/// One live broker connection.
///
/// Implementations reconnect in place: after a disconnect the same link is
/// asked to [`reconnect`](BrokerLink::reconnect) and keeps delivering events
/// from the new session.
#[async_trait::async_trait]
pub trait BrokerLink: Send {
    /// Service the connection and return the next event, waiting at most
    /// `wait` for activity. `Ok(None)` means nothing happened in time.
    ///
    /// An `Err` means the link itself is unusable.
    async fn next_event(&mut self, wait: Duration) -> Result<Option<EventRoute>, MqttError>;

    /// Queue a subscription without waiting for the broker
    fn subscribe(&mut self, topic: &str, qos: Qos) -> Result<(), MqttError>;

    /// Queue a publish without waiting for the broker
    fn publish(&mut self, topic: &str, payload: &[u8], qos: Qos, retain: bool)
        -> Result<(), MqttError>;

    /// Ask the link to re-establish the session after a disconnect
    fn reconnect(&mut self) -> Result<(), MqttError>;

    /// Socket to wait on from an external event loop, if the link exposes one
    fn socket_fd(&self) -> Option<RawFd>;
}
