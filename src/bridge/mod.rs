//! The bridge: one broker link, the coordination state it feeds, and the
//! listeners that react to it.
//!
//! Everything runs inline inside [`Bridge::poll`]. Each call waits for at most
//! one broker event, handles it to completion (lifecycle bookkeeping, payload
//! decoding, listener dispatch) and returns. Callers loop on `poll` and check
//! [`CoordinationState::shutdown_pending`] between iterations.

pub mod status;

pub use status::StatusPublisher;

use crate::error::BridgeResult;
use crate::mqtt_span;
use crate::notify::{Notification, NotifyKind, SubscriptionRegistry};
use crate::protocol::{DecodeError, TopicDecoder};
use crate::state::CoordinationState;
use crate::transport::mqtt::{ConnectionLifecycle, ConnectionState};
use crate::transport::{BrokerLink, EventRoute, MqttError};
use std::os::fd::RawFd;
use std::time::Duration;
use tracing::{error, trace, warn};

pub struct Bridge<L: BrokerLink> {
    link: L,
    lifecycle: ConnectionLifecycle,
    decoder: TopicDecoder,
    state: CoordinationState,
    registry: SubscriptionRegistry,
    status: StatusPublisher,
    /// Session state last announced to link-status listeners
    link_up: bool,
}

impl<L: BrokerLink> Bridge<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            lifecycle: ConnectionLifecycle::new(),
            decoder: TopicDecoder::new(),
            state: CoordinationState::new(),
            registry: SubscriptionRegistry::new(),
            status: StatusPublisher::new(),
            link_up: false,
        }
    }

    /// Replace the decoder, e.g. to resolve algorithm names elsewhere
    pub fn with_decoder(mut self, decoder: TopicDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: ConnectionLifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Register a listener for `kind`. Listeners run inline during `poll`.
    pub fn register<F>(&mut self, kind: NotifyKind, listener: F)
    where
        F: FnMut(&Notification<'_>) + Send + 'static,
    {
        self.registry.register(kind, listener);
    }

    pub fn state(&self) -> &CoordinationState {
        &self.state
    }

    pub fn status(&self) -> &StatusPublisher {
        &self.status
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Socket to wait on from an external event loop, when the link has one
    pub fn file_descriptor(&self) -> Option<RawFd> {
        self.link.socket_fd()
    }

    /// Publish a status line to the retained DAG cache topic.
    ///
    /// Throttled to one publish per second unless `flush` is set. Never
    /// fails; see [`StatusPublisher`].
    pub fn publish_status(&mut self, text: &str, flush: bool) -> bool {
        self.status.publish(&mut self.link, text, flush)
    }

    /// Service the link once, waiting up to `wait` for an event.
    ///
    /// Payload problems are logged and the message dropped. An `Err` is
    /// fatal: the broker refused us, a subscription could not be made, or
    /// the link is unusable. Once fatal, every later call fails too.
    pub async fn poll(&mut self, wait: Duration) -> BridgeResult<()> {
        if let ConnectionState::Fatal(reason) = self.lifecycle.state() {
            return Err(MqttError::Halted(reason.clone()).into());
        }

        let route = match self.link.next_event(wait).await {
            Ok(Some(route)) => route,
            Ok(None) => return Ok(()),
            Err(e) => {
                error!("{e}");
                return Err(e.into());
            }
        };

        let result = self.handle_route(route);
        self.sync_link_state();
        result.map_err(Into::into)
    }

    fn handle_route(&mut self, route: EventRoute) -> Result<(), MqttError> {
        match route {
            EventRoute::ConnectionAcknowledged => self.lifecycle.on_connected(&mut self.link),
            EventRoute::ConnectionRefused(reason) => Err(self.lifecycle.on_refused(&reason)),
            EventRoute::Disconnected(reason) => {
                self.lifecycle.on_disconnected(&mut self.link, &reason)
            }
            EventRoute::SubscriptionConfirmed { return_codes, .. } => {
                self.lifecycle.on_subscription_confirmed(&return_codes)
            }
            EventRoute::MessageReceived { topic, payload } => {
                self.handle_message(&topic, &payload);
                Ok(())
            }
            EventRoute::InfrastructureEvent(event) => {
                trace!(%event, "broker event");
                Ok(())
            }
            EventRoute::OutgoingEvent => Ok(()),
        }
    }

    fn handle_message(&mut self, topic: &str, payload: &[u8]) {
        let span = mqtt_span!(topic, bytes = payload.len());
        let _guard = span.enter();

        match self.decoder.apply(&mut self.state, topic, payload) {
            Ok(Some(kind)) => self.registry.dispatch(kind, &self.state),
            Ok(None) => {}
            Err(e @ DecodeError::UnrecognizedTopic(_)) => error!("{e}"),
            Err(e) => warn!("dropping message: {e}"),
        }
    }

    /// Tell link-status listeners when the session came up or went away
    fn sync_link_state(&mut self) {
        let next = self.lifecycle.state();
        let is_connected = *next == ConnectionState::Connected;
        if is_connected == self.link_up {
            return;
        }

        self.link_up = is_connected;
        self.registry.dispatch_link(&self.state, next);
    }
}

impl<L: BrokerLink + std::fmt::Debug> std::fmt::Debug for Bridge<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("link", &self.link)
            .field("state", &self.state)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
