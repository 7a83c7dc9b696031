//! Connection lifecycle: subscribe on connect, reconnect on disconnect
//!
//! States run `Connecting -> Connected`, drop to `Disconnected` when the
//! session is lost and go straight back to `Connecting` once reconnection has
//! been requested. `Fatal` is terminal.
//!
//! Fatal conditions are configuration or provisioning problems: the broker
//! refusing the connection, never reaching the broker at startup, or a
//! subscription that cannot be issued or is rejected. Losing an established
//! session is never fatal.

use super::connection::{ConnectionState, MqttError};
use super::message_handler::MessageHandler;
use crate::protocol::topics::{Subscription, SUBSCRIPTIONS};
use crate::transport::BrokerLink;
use tracing::{debug, error, info, warn};

/// Inputs to the lifecycle state machine
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// Broker acknowledged the connection
    ConnAckReceived,
    /// Session lost, with reason
    Dropped(String),
    /// Reconnection requested from the link
    ReconnectRequested,
    /// Unrecoverable condition
    PermanentFailure(String),
}

/// Pure state transition for the lifecycle
pub fn determine_next_state(current: &ConnectionState, event: ConnectionEvent) -> ConnectionState {
    match (current, event) {
        (ConnectionState::Fatal(reason), _) => ConnectionState::Fatal(reason.clone()),
        (_, ConnectionEvent::PermanentFailure(reason)) => ConnectionState::Fatal(reason),
        (_, ConnectionEvent::ConnAckReceived) => ConnectionState::Connected,
        (_, ConnectionEvent::Dropped(reason)) => ConnectionState::Disconnected(reason),
        (_, ConnectionEvent::ReconnectRequested) => ConnectionState::Connecting,
    }
}

#[derive(Debug)]
pub struct ConnectionLifecycle {
    state: ConnectionState,
    subscriptions: &'static [Subscription],
    connect_count: u32,
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionLifecycle {
    /// Lifecycle issuing the standard [`SUBSCRIPTIONS`] table
    pub fn new() -> Self {
        Self::with_subscriptions(&SUBSCRIPTIONS)
    }

    pub fn with_subscriptions(subscriptions: &'static [Subscription]) -> Self {
        Self {
            state: ConnectionState::Connecting,
            subscriptions,
            connect_count: 0,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Number of accepted connections, the first one included
    pub fn connect_count(&self) -> u32 {
        self.connect_count
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.state, ConnectionState::Fatal(_))
    }

    fn transition(&mut self, event: ConnectionEvent) {
        let next = determine_next_state(&self.state, event);
        if next != self.state {
            debug!("MQTT connection state: {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }

    fn fail(&mut self, error: MqttError) -> MqttError {
        error!("{error}");
        self.transition(ConnectionEvent::PermanentFailure(error.to_string()));
        error
    }

    /// Broker accepted the connection: issue every subscription in the table
    pub fn on_connected<L: BrokerLink + ?Sized>(&mut self, link: &mut L) -> Result<(), MqttError> {
        for subscription in self.subscriptions {
            let topic = subscription.topic.name();
            if let Err(e) = link.subscribe(topic, subscription.qos) {
                return Err(self.fail(e));
            }
            debug!(topic, qos = subscription.qos.level(), "subscribed");
        }

        self.connect_count += 1;
        self.transition(ConnectionEvent::ConnAckReceived);
        if self.connect_count == 1 {
            info!("MQTT connection established");
        } else {
            info!(reconnects = self.connect_count - 1, "MQTT connection re-established");
        }
        Ok(())
    }

    /// Broker answered the connect with a failure code
    pub fn on_refused(&mut self, reason: &str) -> MqttError {
        self.fail(MqttError::ConnectionRefused(reason.to_string()))
    }

    /// Session lost or a connect attempt failed.
    ///
    /// Requests reconnection from the link. Only a failure to ever reach the
    /// broker is fatal; a failed reconnect request is logged and left to the
    /// next poll.
    pub fn on_disconnected<L: BrokerLink + ?Sized>(
        &mut self,
        link: &mut L,
        reason: &str,
    ) -> Result<(), MqttError> {
        if self.connect_count == 0 {
            return Err(self.fail(MqttError::InitialConnectFailed(reason.to_string())));
        }

        match self.state {
            ConnectionState::Connected => {
                warn!("reconnecting MQTT (disconnect reason {reason})");
            }
            _ => {
                warn!("MQTT reconnect attempt failed: {reason}");
            }
        }
        self.transition(ConnectionEvent::Dropped(reason.to_string()));

        if let Err(e) = link.reconnect() {
            error!("{e}");
            return Ok(());
        }
        self.transition(ConnectionEvent::ReconnectRequested);
        Ok(())
    }

    /// Check the broker's answer to the subscriptions
    pub fn on_subscription_confirmed(&mut self, return_codes: &[u8]) -> Result<(), MqttError> {
        MessageHandler::validate_subscription_success(return_codes)
            .map_err(|codes| self.fail(MqttError::SubscriptionRejected(codes)))
    }
}
