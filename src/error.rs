//! Top-level error type
//!
//! Protocol errors (bad payloads, unknown topics) never reach this type: the
//! bridge logs them and drops the message. What does surface here is fatal
//! and the daemon is expected to exit with the diagnostic.

use crate::config::ConfigError;
use crate::transport::mqtt::MqttError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] MqttError),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
