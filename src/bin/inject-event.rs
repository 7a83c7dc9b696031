//! dagd Event Injection Utility
//!
//! Publishes the coordination messages a running bridge listens for, for
//! trying things out against a live broker without the rest of the mining
//! stack.
//!
//! ## Usage
//!
//! ```bash
//! # Announce epoch 412 on etchash
//! inject-event epoch 412 etchash
//!
//! # Epoch only; the bridge assumes ethash
//! inject-event --broker 10.0.0.5:1883 epoch 413
//!
//! # Start and end an upload hold
//! inject-event mined-state --hold 412
//! inject-event mined-state
//!
//! # Ask the daemon to exit, then clear the request
//! inject-event shutdown
//! inject-event shutdown --clear
//! ```

use clap::{Parser, Subcommand};
use dagd_bridge::config::{BrokerAddress, DEFAULT_HOST, DEFAULT_PORT};
use dagd_bridge::protocol::{
    DagAlgo, Qos, HOLD_MARKER, TOPIC_EPOCH, TOPIC_MINED_STATE, TOPIC_SHUTDOWN,
};
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, Packet, QoS};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::{timeout, Duration};

#[derive(Parser)]
#[command(
    name = "inject-event",
    about = "Publish epoch, mined-state and shutdown events for dagd",
    long_about = "Publishes the coordination messages the dagd MQTT bridge listens for.\nUseful for exercising a running daemon by hand."
)]
struct Args {
    /// Broker address (host[:port] or mqtt://host:port)
    #[arg(long, env = "DAGD_BROKER", default_value_t = format!("{DEFAULT_HOST}:{DEFAULT_PORT}"))]
    broker: String,

    /// Ask the broker to retain the message
    #[arg(long)]
    retain: bool,

    /// Seconds to wait for the broker before giving up
    #[arg(long, default_value = "5")]
    timeout_secs: u64,

    #[command(subcommand)]
    event: EventArgs,
}

#[derive(Subcommand)]
enum EventArgs {
    /// Announce a new work epoch
    Epoch {
        epoch: u32,
        /// Algorithm name (ethash, etchash, ubqhash)
        algorithm: Option<DagAlgo>,
    },
    /// Report the miner's upload state
    MinedState {
        /// Report an epoch upload in progress
        #[arg(long)]
        hold: bool,
        /// Free text after the marker, or the whole report without --hold
        detail: Option<String>,
    },
    /// Request or clear a daemon shutdown
    Shutdown {
        #[arg(long)]
        clear: bool,
    },
}

impl EventArgs {
    /// Topic, payload and delivery level, matching what the bridge subscribes with
    fn message(&self) -> (&'static str, String, Qos) {
        match self {
            EventArgs::Epoch { epoch, algorithm } => {
                let payload = match algorithm {
                    Some(algorithm) => format!("{epoch} {algorithm}"),
                    None => epoch.to_string(),
                };
                (TOPIC_EPOCH, payload, Qos::Acknowledged)
            }
            EventArgs::MinedState { hold, detail } => {
                let detail = detail.as_deref().unwrap_or_default();
                let payload = if *hold {
                    format!("{HOLD_MARKER}{detail}")
                } else if detail.is_empty() {
                    "idle".to_string()
                } else {
                    detail.to_string()
                };
                (TOPIC_MINED_STATE, payload, Qos::BestEffort)
            }
            EventArgs::Shutdown { clear } => {
                let payload = if *clear { "0" } else { "1" };
                (TOPIC_SHUTDOWN, payload.to_string(), Qos::Acknowledged)
            }
        }
    }
}

fn to_mqtt_qos(qos: Qos) -> QoS {
    match qos {
        Qos::BestEffort => QoS::AtMostOnce,
        Qos::Acknowledged => QoS::AtLeastOnce,
        Qos::ExactlyOnce => QoS::ExactlyOnce,
    }
}

async fn inject(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let address = BrokerAddress::parse(&args.broker)?;
    if address.tls {
        return Err("TLS brokers are not supported by inject-event".into());
    }

    let client_id = format!(
        "inject-event-{}",
        SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs()
    );
    let mut options = MqttOptions::new(client_id, address.host.clone(), address.port);
    options.set_keep_alive(Duration::from_secs(60));

    let (client, mut eventloop) = AsyncClient::new(options, 10);

    let (topic, payload, qos) = args.event.message();
    println!("Publishing to {topic} on {address}");
    println!("   Payload: {payload:?}");

    client
        .publish(topic, to_mqtt_qos(qos), args.retain, payload.into_bytes())
        .await?;

    // Disconnect once the broker has the message: PubAck/PubComp for
    // acknowledged levels, the write itself for best effort
    let delivery = async {
        loop {
            match eventloop.poll().await? {
                Event::Incoming(Packet::ConnAck(_)) => println!("   Connected"),
                Event::Incoming(Packet::PubAck(_)) | Event::Incoming(Packet::PubComp(_)) => {
                    client.disconnect().await?;
                }
                Event::Outgoing(Outgoing::Publish(_)) if qos == Qos::BestEffort => {
                    client.disconnect().await?;
                }
                Event::Outgoing(Outgoing::Disconnect) => {
                    return Ok::<(), Box<dyn std::error::Error>>(());
                }
                _ => {}
            }
        }
    };

    let result: Result<(), Box<dyn std::error::Error>> =
        match timeout(Duration::from_secs(args.timeout_secs), delivery).await {
            Ok(result) => result,
            Err(_) => Err(format!("no answer from broker within {}s", args.timeout_secs).into()),
        };
    result?;

    println!("✓ Event published");
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = inject(&args).await {
        eprintln!("✗ Failed to publish event: {e}");
        std::process::exit(1);
    }
}
