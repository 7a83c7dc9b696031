//! Payload decoding for the inbound topics
//!
//! Payloads are untrusted byte ranges. Every scan is bounded by the payload
//! length and stops at the first NUL, so a sender padding a payload with a
//! terminator gets the same result as one that does not.
//!
//! Decoding is split in two: [`TopicDecoder::decode`] turns bytes into an
//! [`Update`] without touching anything, and [`TopicDecoder::apply`] folds the
//! update into the [`CoordinationState`] and says which notification, if any,
//! should fire.

use super::algorithm::{AlgorithmLookup, DagAlgo, KnownAlgorithms, UnknownAlgorithm};
use super::topics::{InboundTopic, HOLD_MARKER};
use crate::notify::NotifyKind;
use crate::state::CoordinationState;
use thiserror::Error;
use tracing::{debug, info};

/// A validated state change carried by one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    Epoch { epoch: u32, algorithm: DagAlgo },
    MinedState { hold: bool },
    Shutdown { requested: bool },
}

/// Reasons a single message is dropped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unrecognized topic '{0}'")]
    UnrecognizedTopic(String),
    #[error("bad number '{0}'")]
    BadNumber(String),
    #[error("algorithm name missing in epoch '{0}'")]
    MissingAlgorithm(String),
    #[error(transparent)]
    UnknownAlgorithm(#[from] UnknownAlgorithm),
}

pub struct TopicDecoder {
    lookup: Box<dyn AlgorithmLookup>,
}

impl Default for TopicDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TopicDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicDecoder").finish_non_exhaustive()
    }
}

impl TopicDecoder {
    /// Decoder resolving algorithm names against [`KnownAlgorithms`]
    pub fn new() -> Self {
        Self::with_lookup(KnownAlgorithms)
    }

    pub fn with_lookup<L: AlgorithmLookup + 'static>(lookup: L) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// Decode one message without touching any state
    pub fn decode(&self, topic: &str, payload: &[u8]) -> Result<Update, DecodeError> {
        let inbound = InboundTopic::from_topic(topic)
            .ok_or_else(|| DecodeError::UnrecognizedTopic(topic.to_string()))?;
        let payload = bounded(payload);

        match inbound {
            InboundTopic::MinedState => Ok(Update::MinedState {
                hold: payload.starts_with(HOLD_MARKER.as_bytes()),
            }),
            InboundTopic::Shutdown => {
                let (value, _) = parse_leading_number(payload)?;
                Ok(Update::Shutdown {
                    requested: value != 0,
                })
            }
            InboundTopic::Epoch => {
                let (epoch, rest) = parse_leading_number(payload)?;
                let algorithm = match rest.split_first() {
                    None => DagAlgo::default(),
                    Some((_, name)) => self.resolve_algorithm(payload, name)?,
                };
                Ok(Update::Epoch { epoch, algorithm })
            }
        }
    }

    /// Decode one message and fold it into `state`.
    ///
    /// Returns the notification to dispatch. Epoch announcements that repeat
    /// the current algorithm and epoch return `None`; mined-state and
    /// shutdown reports always return their kind, even when nothing changed.
    pub fn apply(
        &self,
        state: &mut CoordinationState,
        topic: &str,
        payload: &[u8],
    ) -> Result<Option<NotifyKind>, DecodeError> {
        let update = self.decode(topic, payload)?;
        Ok(apply_update(state, update))
    }

    fn resolve_algorithm(&self, payload: &[u8], name: &[u8]) -> Result<DagAlgo, DecodeError> {
        if name.is_empty() {
            return Err(DecodeError::MissingAlgorithm(lossy(payload)));
        }
        // Non-UTF-8 names cannot match any table entry
        std::str::from_utf8(name)
            .ok()
            .and_then(|name| self.lookup.code_for_name(name))
            .ok_or_else(|| DecodeError::UnknownAlgorithm(UnknownAlgorithm(lossy(name))))
    }
}

/// Fold a decoded update into the state, returning the notification to fire
pub fn apply_update(state: &mut CoordinationState, update: Update) -> Option<NotifyKind> {
    match update {
        Update::Epoch { epoch, algorithm } => {
            if !state.set_epoch(algorithm, epoch) {
                debug!(epoch, %algorithm, "epoch unchanged");
                return None;
            }
            info!(epoch, %algorithm, "epoch changed");
            Some(NotifyKind::Epoch)
        }
        Update::MinedState { hold } => {
            let was_holding = state.set_hold(hold);
            if was_holding != hold {
                debug!("{} holding", if hold { "begin" } else { "end" });
            }
            Some(NotifyKind::MinedState)
        }
        Update::Shutdown { requested } => {
            if requested {
                info!("shutdown requested");
            }
            state.set_shutdown_pending(requested);
            Some(NotifyKind::Shutdown)
        }
    }
}

/// Payload up to, not including, the first NUL
fn bounded(payload: &[u8]) -> &[u8] {
    match payload.iter().position(|&b| b == 0) {
        Some(end) => &payload[..end],
        None => payload,
    }
}

/// Parse a leading unsigned decimal number.
///
/// Leading whitespace is skipped. The number must be followed by the end of
/// the payload or a single space; the remainder (starting at that space) is
/// returned alongside the value.
fn parse_leading_number(payload: &[u8]) -> Result<(u32, &[u8]), DecodeError> {
    let bad_number = || DecodeError::BadNumber(lossy(payload));

    let start = payload
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(payload.len());
    let digits_end = payload[start..]
        .iter()
        .position(|b| !b.is_ascii_digit())
        .map_or(payload.len(), |n| start + n);

    if digits_end == start {
        return Err(bad_number());
    }
    let rest = &payload[digits_end..];
    if !(rest.is_empty() || rest[0] == b' ') {
        return Err(bad_number());
    }

    // Digits are ASCII, so this slice is valid UTF-8
    let value = std::str::from_utf8(&payload[start..digits_end])
        .ok()
        .and_then(|digits| digits.parse::<u32>().ok())
        .ok_or_else(bad_number)?;

    Ok((value, rest))
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
