//! Rate-limited status publishing
//!
//! Status goes to the retained DAG cache topic so a late subscriber sees the
//! latest line immediately. At most one publish per wall-clock second unless
//! the caller forces a flush. Failures are logged and dropped.

use crate::protocol::topics::{Qos, TOPIC_DAG_CACHE};
use crate::transport::BrokerLink;
use chrono::Utc;
use tracing::{error, trace};

#[derive(Debug, Default)]
pub struct StatusPublisher {
    last_second: Option<i64>,
    published: u64,
}

impl StatusPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `text` unless a publish already succeeded this second.
    ///
    /// Returns whether the status was handed to the link.
    pub fn publish<L: BrokerLink + ?Sized>(&mut self, link: &mut L, text: &str, flush: bool) -> bool {
        self.publish_at(link, text, flush, Utc::now().timestamp())
    }

    /// [`publish`](Self::publish) with an explicit wall-clock second
    pub fn publish_at<L: BrokerLink + ?Sized>(
        &mut self,
        link: &mut L,
        text: &str,
        flush: bool,
        now: i64,
    ) -> bool {
        if !flush && self.last_second == Some(now) {
            trace!("status throttled");
            return false;
        }

        match link.publish(TOPIC_DAG_CACHE, text.as_bytes(), Qos::Acknowledged, true) {
            Ok(()) => {
                self.last_second = Some(now);
                self.published += 1;
                true
            }
            Err(e) => {
                match std::error::Error::source(&e) {
                    Some(cause) => error!("{e}: {cause}"),
                    None => error!("{e}"),
                }
                false
            }
        }
    }

    /// Wall-clock second of the last successful publish
    pub fn last_published_second(&self) -> Option<i64> {
        self.last_second
    }

    pub fn published_count(&self) -> u64 {
        self.published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLink;

    #[test]
    fn test_same_second_is_throttled() {
        let mut link = FakeLink::new();
        let mut status = StatusPublisher::new();

        assert!(status.publish_at(&mut link, "x", false, 1000));
        assert!(!status.publish_at(&mut link, "x", false, 1000));
        assert_eq!(link.published().len(), 1);
    }

    #[test]
    fn test_next_second_publishes() {
        let mut link = FakeLink::new();
        let mut status = StatusPublisher::new();

        assert!(status.publish_at(&mut link, "a", false, 1000));
        assert!(status.publish_at(&mut link, "b", false, 1001));
        assert_eq!(status.published_count(), 2);
        assert_eq!(status.last_published_second(), Some(1001));
    }

    #[test]
    fn test_flush_bypasses_throttle() {
        let mut link = FakeLink::new();
        let mut status = StatusPublisher::new();

        for _ in 0..3 {
            assert!(status.publish_at(&mut link, "x", true, 1000));
        }
        assert_eq!(link.published().len(), 3);
    }

    #[test]
    fn test_publish_is_retained_and_acknowledged() {
        let mut link = FakeLink::new();
        let mut status = StatusPublisher::new();
        status.publish_at(&mut link, "epoch 412 ready", false, 5);

        let published = link.published();
        assert_eq!(published[0].topic, "/mine/dag-cache");
        assert_eq!(published[0].payload, b"epoch 412 ready".to_vec());
        assert_eq!(published[0].qos, Qos::Acknowledged);
        assert!(published[0].retain);
    }

    #[test]
    fn test_failed_publish_does_not_consume_the_second() {
        let mut link = FakeLink::new();
        let mut status = StatusPublisher::new();

        link.fail_publish(true);
        assert!(!status.publish_at(&mut link, "x", false, 1000));
        assert_eq!(status.last_published_second(), None);

        link.fail_publish(false);
        assert!(status.publish_at(&mut link, "x", false, 1000));
        assert_eq!(link.published().len(), 1);
    }
}
