//! Notification fan-out to in-process listeners
//!
//! Listeners are registered once at startup and live for the life of the
//! bridge. A dispatch runs every listener registered for the kind, inline and
//! in registration order, handing each a [`Notification`]: a read-only view
//! of the coordination state plus, for link-status notices, the connection
//! state the bridge just moved to. There is no unsubscribe.

use crate::state::CoordinationState;
use crate::transport::mqtt::ConnectionState;
use std::ops::Deref;

/// What changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyKind {
    /// Algorithm or epoch changed
    Epoch,
    /// A mined-state report arrived (the hold flag may or may not have changed)
    MinedState,
    /// A shutdown report arrived
    Shutdown,
    /// The broker connection came up or went down
    LinkStatus,
}

/// What a listener is handed on dispatch.
///
/// Derefs to the coordination state, so listeners read `notice.epoch()` and
/// friends directly.
#[derive(Debug, Clone, Copy)]
pub struct Notification<'a> {
    kind: NotifyKind,
    state: &'a CoordinationState,
    link: Option<&'a ConnectionState>,
}

impl<'a> Notification<'a> {
    pub fn kind(&self) -> NotifyKind {
        self.kind
    }

    pub fn state(&self) -> &'a CoordinationState {
        self.state
    }

    /// Connection state behind a [`NotifyKind::LinkStatus`] notice, `None`
    /// for every other kind
    pub fn link_state(&self) -> Option<&'a ConnectionState> {
        self.link
    }

    pub fn is_link_up(&self) -> bool {
        self.link == Some(&ConnectionState::Connected)
    }
}

impl Deref for Notification<'_> {
    type Target = CoordinationState;

    fn deref(&self) -> &CoordinationState {
        self.state
    }
}

/// Callback invoked on dispatch; captured variables play the role of the
/// listener's context
pub type Listener = Box<dyn FnMut(&Notification<'_>) + Send>;

#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: Vec<(NotifyKind, Listener)>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener. Duplicates are allowed and each is invoked.
    pub fn register<F>(&mut self, kind: NotifyKind, listener: F)
    where
        F: FnMut(&Notification<'_>) + Send + 'static,
    {
        self.entries.push((kind, Box::new(listener)));
    }

    /// Invoke every listener registered for `kind`
    pub fn dispatch(&mut self, kind: NotifyKind, state: &CoordinationState) {
        self.notify(Notification {
            kind,
            state,
            link: None,
        });
    }

    /// Tell link-status listeners the connection moved to `link`
    pub fn dispatch_link(&mut self, state: &CoordinationState, link: &ConnectionState) {
        self.notify(Notification {
            kind: NotifyKind::LinkStatus,
            state,
            link: Some(link),
        });
    }

    fn notify(&mut self, notice: Notification<'_>) {
        for (_, listener) in self.entries.iter_mut().filter(|(k, _)| *k == notice.kind) {
            listener(&notice);
        }
    }

    pub fn listener_count(&self, kind: NotifyKind) -> usize {
        self.entries.iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(kind, _)| kind))
            .finish()
    }
}
