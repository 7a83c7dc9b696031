//! Coordination state shared between the bridge and the mining daemon
//!
//! Only the topic decoder writes to it; everyone else reads a
//! `&CoordinationState` handed to them by the bridge or through their
//! notification callback. Connection status is not part of it: listeners
//! learn about the link from [`NotifyKind::LinkStatus`] notices.
//!
//! [`NotifyKind::LinkStatus`]: crate::notify::NotifyKind::LinkStatus

use crate::protocol::algorithm::DagAlgo;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinationState {
    algorithm: Option<DagAlgo>,
    epoch: u32,
    hold: bool,
    shutdown_pending: bool,
}

impl CoordinationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current algorithm, `None` until the first epoch announcement
    pub fn algorithm(&self) -> Option<DagAlgo> {
        self.algorithm
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// True while the mined-state topic reports an epoch upload
    pub fn is_holding(&self) -> bool {
        self.hold
    }

    pub fn shutdown_pending(&self) -> bool {
        self.shutdown_pending
    }

    /// Status line for the DAG cache topic: `<epoch> <algorithm>`, once an
    /// epoch has been announced
    pub fn status_line(&self) -> Option<String> {
        self.algorithm
            .map(|algorithm| format!("{} {}", self.epoch, algorithm))
    }

    /// Update algorithm and epoch together.
    ///
    /// Returns `false` and leaves the state untouched when both already hold
    /// these values.
    pub(crate) fn set_epoch(&mut self, algorithm: DagAlgo, epoch: u32) -> bool {
        if self.algorithm == Some(algorithm) && self.epoch == epoch {
            return false;
        }
        self.algorithm = Some(algorithm);
        self.epoch = epoch;
        true
    }

    /// Set the hold flag, returning the previous value
    pub(crate) fn set_hold(&mut self, hold: bool) -> bool {
        std::mem::replace(&mut self.hold, hold)
    }

    pub(crate) fn set_shutdown_pending(&mut self, pending: bool) {
        self.shutdown_pending = pending;
    }
}
