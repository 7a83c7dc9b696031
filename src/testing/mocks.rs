//! Scripted broker link for testing
//!
//! `FakeLink` plays back a queue of events instead of talking to a broker and
//! records every subscribe, publish, and reconnect request made through it.
//! Clones share the same script and records, so a test can keep one handle
//! while the bridge owns the other.

use crate::protocol::Qos;
use crate::transport::{BrokerLink, EventRoute, MqttError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::os::fd::RawFd;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One publish recorded by [`FakeLink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: Qos,
    pub retain: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Subscribe,
    Publish,
    Reconnect,
}

#[derive(Debug, Default)]
struct FakeLinkInner {
    script: VecDeque<Result<EventRoute, MqttError>>,
    subscriptions: Vec<(String, Qos)>,
    published: Vec<PublishedMessage>,
    reconnects: u32,
    failing: Vec<FailureMode>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeLink {
    inner: Arc<Mutex<FakeLinkInner>>,
    fd: Option<RawFd>,
}

impl FakeLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `fd` as the link's socket
    pub fn with_fd(mut self, fd: RawFd) -> Self {
        self.fd = Some(fd);
        self
    }

    // A test that panicked while holding the lock must not hide later asserts
    fn lock(&self) -> MutexGuard<'_, FakeLinkInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push_event(&self, route: EventRoute) {
        self.lock().script.push_back(Ok(route));
    }

    pub fn push_error(&self, error: MqttError) {
        self.lock().script.push_back(Err(error));
    }

    pub fn connack(&self) {
        self.push_event(EventRoute::ConnectionAcknowledged);
    }

    pub fn disconnect(&self, reason: &str) {
        self.push_event(EventRoute::Disconnected(reason.to_string()));
    }

    pub fn message(&self, topic: &str, payload: impl AsRef<[u8]>) {
        self.push_event(EventRoute::message(topic, payload.as_ref().to_vec()));
    }

    /// Scripted events not yet delivered
    pub fn pending(&self) -> usize {
        self.lock().script.len()
    }

    pub fn subscriptions(&self) -> Vec<(String, Qos)> {
        self.lock().subscriptions.clone()
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.lock().published.clone()
    }

    pub fn reconnect_count(&self) -> u32 {
        self.lock().reconnects
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.set_failing(FailureMode::Subscribe, fail);
    }

    pub fn fail_publish(&self, fail: bool) {
        self.set_failing(FailureMode::Publish, fail);
    }

    pub fn fail_reconnect(&self, fail: bool) {
        self.set_failing(FailureMode::Reconnect, fail);
    }

    fn set_failing(&self, mode: FailureMode, fail: bool) {
        let mut inner = self.lock();
        inner.failing.retain(|m| *m != mode);
        if fail {
            inner.failing.push(mode);
        }
    }

    fn is_failing(&self, mode: FailureMode) -> bool {
        self.lock().failing.contains(&mode)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("injected {0:?} failure")]
pub struct InjectedFailure(pub FailureMode);

#[async_trait]
impl BrokerLink for FakeLink {
    async fn next_event(&mut self, _wait: Duration) -> Result<Option<EventRoute>, MqttError> {
        match self.lock().script.pop_front() {
            Some(Ok(route)) => Ok(Some(route)),
            Some(Err(error)) => Err(error),
            None => Ok(None),
        }
    }

    fn subscribe(&mut self, topic: &str, qos: Qos) -> Result<(), MqttError> {
        if self.is_failing(FailureMode::Subscribe) {
            return Err(MqttError::SubscriptionFailed {
                topic: topic.to_string(),
                source: Box::new(InjectedFailure(FailureMode::Subscribe)),
            });
        }
        self.lock().subscriptions.push((topic.to_string(), qos));
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: Qos,
        retain: bool,
    ) -> Result<(), MqttError> {
        if self.is_failing(FailureMode::Publish) {
            return Err(MqttError::PublishFailed {
                topic: topic.to_string(),
                source: Box::new(InjectedFailure(FailureMode::Publish)),
            });
        }
        self.lock().published.push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
            retain,
        });
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), MqttError> {
        if self.is_failing(FailureMode::Reconnect) {
            return Err(MqttError::ReconnectFailed(
                InjectedFailure(FailureMode::Reconnect).to_string(),
            ));
        }
        self.lock().reconnects += 1;
        Ok(())
    }

    fn socket_fd(&self) -> Option<RawFd> {
        self.fd
    }
}
