//! Status publishing tests
//!
//! The throttle is keyed on the wall-clock second, so these tests pin the
//! second with `publish_at` and only use the clock-reading path where the
//! outcome does not depend on timing.

use dagd_bridge::protocol::{Qos, TOPIC_DAG_CACHE};
use dagd_bridge::testing::FakeLink;
use dagd_bridge::{Bridge, StatusPublisher};

#[test]
fn test_two_publishes_in_one_second_send_once() {
    let mut link = FakeLink::new();
    let mut status = StatusPublisher::new();

    status.publish_at(&mut link, "x", false, 1_700_000_000);
    status.publish_at(&mut link, "x", false, 1_700_000_000);

    assert_eq!(link.published().len(), 1);
}

#[test]
fn test_forced_publishes_always_send() {
    let mut link = FakeLink::new();
    let mut status = StatusPublisher::new();

    status.publish_at(&mut link, "a", false, 10);
    status.publish_at(&mut link, "b", true, 10);
    status.publish_at(&mut link, "c", true, 10);

    let payloads: Vec<Vec<u8>> = link.published().into_iter().map(|m| m.payload).collect();
    assert_eq!(payloads, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn test_status_is_retained_on_cache_topic() {
    let mut link = FakeLink::new();
    let mut status = StatusPublisher::new();

    status.publish_at(&mut link, "412 etchash", true, 1);

    let message = &link.published()[0];
    assert_eq!(message.topic, TOPIC_DAG_CACHE);
    assert_eq!(message.qos, Qos::Acknowledged);
    assert!(message.retain);
}

#[test]
fn test_publish_failure_is_swallowed() {
    let mut link = FakeLink::new();
    let mut status = StatusPublisher::new();
    link.fail_publish(true);

    assert!(!status.publish_at(&mut link, "x", true, 1));
    assert_eq!(status.published_count(), 0);
    assert!(link.published().is_empty());
}

#[test]
fn test_bridge_forced_status_uses_clock() {
    let link = FakeLink::new();
    let mut bridge = Bridge::new(link.clone());

    assert!(bridge.publish_status("one", true));
    assert!(bridge.publish_status("two", true));

    assert_eq!(link.published().len(), 2);
    assert!(bridge.status().last_published_second().is_some());
}

#[tokio::test]
async fn test_routine_refresh_is_throttled_and_epoch_change_flushes() {
    let link = FakeLink::new();
    link.connack();
    link.message(dagd_bridge::protocol::TOPIC_EPOCH, "412 etchash");
    let mut bridge = Bridge::new(link.clone());
    while bridge.link().pending() > 0 {
        bridge.poll(std::time::Duration::ZERO).await.unwrap();
    }

    let mut status = StatusPublisher::new();
    let line = bridge.state().status_line().unwrap();
    let mut sink = link.clone();

    // Routine refreshes within one second, then the epoch changes
    status.publish_at(&mut sink, &line, false, 100);
    status.publish_at(&mut sink, &line, false, 100);
    status.publish_at(&mut sink, &line, false, 100);
    status.publish_at(&mut sink, "413 etchash", true, 100);

    let payloads: Vec<Vec<u8>> = link.published().into_iter().map(|m| m.payload).collect();
    assert_eq!(payloads, vec![b"412 etchash".to_vec(), b"413 etchash".to_vec()]);
}
