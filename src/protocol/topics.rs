//! Topic names and the subscribe-on-connect table
//!
//! Topic names and payload grammars are shared with the rest of the mining
//! stack and must match byte for byte.

/// Current epoch announcement: `<decimal-epoch>[ <algorithm-name>]`
pub const TOPIC_EPOCH: &str = "/mine/epoch";
/// Mined-state report, free text
pub const TOPIC_MINED_STATE: &str = "/mine/mined-state";
/// Shutdown request: `<decimal-int>`, non-zero requests shutdown
pub const TOPIC_SHUTDOWN: &str = "/sys/shutdown";
/// Outbound, retained DAG cache status
pub const TOPIC_DAG_CACHE: &str = "/mine/dag-cache";

/// Mined-state prefix that puts the daemon on hold
pub const HOLD_MARKER: &str = "epoch_upload ";

/// Delivery guarantee requested for a subscription or publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qos {
    /// QoS 0
    BestEffort,
    /// QoS 1
    Acknowledged,
    /// QoS 2
    ExactlyOnce,
}

impl Qos {
    pub fn level(self) -> u8 {
        match self {
            Qos::BestEffort => 0,
            Qos::Acknowledged => 1,
            Qos::ExactlyOnce => 2,
        }
    }
}

/// Inbound topics the bridge understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundTopic {
    Epoch,
    MinedState,
    Shutdown,
}

impl InboundTopic {
    /// Exact-match lookup; wildcards are not supported
    pub fn from_topic(topic: &str) -> Option<Self> {
        match topic {
            TOPIC_EPOCH => Some(InboundTopic::Epoch),
            TOPIC_MINED_STATE => Some(InboundTopic::MinedState),
            TOPIC_SHUTDOWN => Some(InboundTopic::Shutdown),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InboundTopic::Epoch => TOPIC_EPOCH,
            InboundTopic::MinedState => TOPIC_MINED_STATE,
            InboundTopic::Shutdown => TOPIC_SHUTDOWN,
        }
    }
}

/// One row of the subscribe-on-connect table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub topic: InboundTopic,
    pub qos: Qos,
}

/// Subscriptions issued, in order, every time the broker accepts a connection
pub const SUBSCRIPTIONS: [Subscription; 3] = [
    Subscription {
        topic: InboundTopic::Epoch,
        qos: Qos::Acknowledged,
    },
    Subscription {
        topic: InboundTopic::MinedState,
        qos: Qos::BestEffort,
    },
    Subscription {
        topic: InboundTopic::Shutdown,
        qos: Qos::Acknowledged,
    },
];
