//! Poll timeout tests against a real socket
//!
//! A local listener accepts the TCP connection but never answers the MQTT
//! handshake, so the rumqttc link sits in its connect phase for as long as
//! rumqttc's own connection timeout allows.

use dagd_bridge::{Bridge, BridgeConfig, MqttClient};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::Instant;

/// Listener that accepts connections, counts them, and never writes a byte
async fn silent_broker() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let accepted = Arc::new(AtomicUsize::new(0));

    let count = accepted.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            count.fetch_add(1, Ordering::SeqCst);
            held.push(stream);
        }
    });

    (address, accepted)
}

fn bridge_for(address: &str) -> Bridge<MqttClient> {
    let config = BridgeConfig::default()
        .with_broker_override(Some(address))
        .unwrap();
    Bridge::new(MqttClient::new(&config).unwrap())
}

#[tokio::test]
async fn test_zero_wait_returns_while_connecting() {
    let (address, _accepted) = silent_broker().await;
    let mut bridge = bridge_for(&address);

    let started = Instant::now();
    bridge.poll(Duration::ZERO).await.unwrap();

    assert!(
        started.elapsed() < Duration::from_millis(500),
        "poll(0) blocked for {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_short_waits_are_honoured_while_connecting() {
    let (address, _accepted) = silent_broker().await;
    let mut bridge = bridge_for(&address);

    for _ in 0..5 {
        let started = Instant::now();
        bridge.poll(Duration::from_millis(20)).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}

#[tokio::test]
async fn test_timed_out_poll_keeps_connect_in_flight() {
    let (address, accepted) = silent_broker().await;
    let mut bridge = bridge_for(&address);

    bridge.poll(Duration::ZERO).await.unwrap();
    for _ in 0..10 {
        bridge.poll(Duration::from_millis(20)).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    // One handshake, resumed by every poll, never restarted
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}
