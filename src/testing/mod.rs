//! Testing utilities
//!
//! A scripted [`BrokerLink`](crate::transport::BrokerLink) so the bridge can
//! be exercised without an MQTT broker.

pub mod mocks;

pub use mocks::*;
