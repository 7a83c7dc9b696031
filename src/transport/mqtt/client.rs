//! Impure I/O for the MQTT link
//!
//! Wraps a rumqttc `AsyncClient`/`EventLoop` pair. The event loop is the one
//! connection handle for the life of the process: after a connection error
//! the next poll re-establishes the session on the same event loop.
//!
//! The event loop lives inside an in-flight poll future that survives across
//! calls. A `wait` that runs out leaves that future parked, so a connect
//! handshake or a half-flushed write resumes on the next call instead of being
//! cancelled and started over.

use super::connection::{configure_mqtt_options, MqttError};
use super::message_handler::{EventRoute, MessageHandler};
use crate::config::BridgeConfig;
use crate::protocol::Qos;
use crate::transport::BrokerLink;
use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::v5::{AsyncClient, ConnectionError, Event, EventLoop};
use std::future::Future;
use std::os::fd::RawFd;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info};

/// Capacity of the rumqttc request channel
const REQUEST_CAPACITY: usize = 10;

/// One `EventLoop::poll`, owning the event loop until it resolves
type PendingPoll =
    Pin<Box<dyn Future<Output = (EventLoop, Result<Event, ConnectionError>)> + Send>>;

fn poll_once(mut event_loop: EventLoop) -> PendingPoll {
    Box::pin(async move {
        let polled = event_loop.poll().await;
        (event_loop, polled)
    })
}

/// rumqttc-backed broker link
pub struct MqttClient {
    client: AsyncClient,
    pending: PendingPoll,
    broker: String,
    /// ConnAck seen and no error since
    session_up: bool,
    /// Last connect attempt failed; idle for one poll before the next
    retry_pending: bool,
}

impl MqttClient {
    pub fn new(config: &BridgeConfig) -> Result<Self, MqttError> {
        let mqtt_options = configure_mqtt_options(config)?;
        let broker = config.broker_address()?.to_string();

        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);
        info!(%broker, client_id = %config.broker.client_id, "MQTT link created");

        Ok(Self {
            client,
            pending: poll_once(event_loop),
            broker,
            session_up: false,
            retry_pending: false,
        })
    }

    pub fn broker(&self) -> &str {
        &self.broker
    }

    /// Fold a rumqttc connection error into a route, or fail if the link is dead
    fn route_connection_error(
        &mut self,
        error: ConnectionError,
    ) -> Result<Option<EventRoute>, MqttError> {
        let was_up = std::mem::replace(&mut self.session_up, false);
        match error {
            ConnectionError::RequestsDone => Err(MqttError::LinkClosed),
            ConnectionError::ConnectionRefused(code) => {
                Ok(Some(EventRoute::ConnectionRefused(format!("{code:?}"))))
            }
            other => {
                // A dropped session reconnects on the next poll; a failed
                // attempt waits out one poll first
                self.retry_pending = !was_up;
                Ok(Some(EventRoute::Disconnected(other.to_string())))
            }
        }
    }
}

#[async_trait]
impl BrokerLink for MqttClient {
    async fn next_event(&mut self, wait: Duration) -> Result<Option<EventRoute>, MqttError> {
        if self.retry_pending {
            self.retry_pending = false;
            tokio::time::sleep(wait).await;
            return Ok(None);
        }

        let (event_loop, polled) = match tokio::time::timeout(wait, &mut self.pending).await {
            Ok(done) => done,
            Err(_) => return Ok(None),
        };
        self.pending = poll_once(event_loop);

        match polled {
            Ok(event) => {
                let route = MessageHandler::route_mqtt_event(&event);
                match route {
                    EventRoute::ConnectionAcknowledged => self.session_up = true,
                    EventRoute::Disconnected(_) => self.session_up = false,
                    _ => {}
                }
                Ok(Some(route))
            }
            Err(error) => self.route_connection_error(error),
        }
    }

    fn subscribe(&mut self, topic: &str, qos: Qos) -> Result<(), MqttError> {
        self.client
            .try_subscribe(topic, qos.into())
            .map_err(|e| MqttError::SubscriptionFailed {
                topic: topic.to_string(),
                source: Box::new(e),
            })
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: Qos,
        retain: bool,
    ) -> Result<(), MqttError> {
        self.client
            .try_publish(topic, qos.into(), retain, Bytes::copy_from_slice(payload))
            .map_err(|e| MqttError::PublishFailed {
                topic: topic.to_string(),
                source: Box::new(e),
            })
    }

    fn reconnect(&mut self) -> Result<(), MqttError> {
        // rumqttc reconnects from inside the next poll of the same event loop
        debug!(broker = %self.broker, "reconnect requested");
        self.session_up = false;
        Ok(())
    }

    /// rumqttc owns its socket inside the event loop; callers integrate by
    /// awaiting the bridge's poll alongside their other futures
    fn socket_fd(&self) -> Option<RawFd> {
        None
    }
}
