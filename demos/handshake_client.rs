//! Connects to a `tick_server` and prints the assigned player id
//!
//! ```text
//! cargo run --example handshake_client -- 127.0.0.1:5000
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use ringwire::protocol::{MAX_PACKET_SIZE, TAG_SIZE, encode_frame, split_frame};
use ringwire::{
    Connect, ConstructPacket, Destination, Packet, PacketFactory, PacketReader, PacketWriter,
    TransportConfig, UdpTransport, WirePacket,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const ATTEMPTS: usize = 5;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let server: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:5000".to_owned())
        .parse()?;
    let config = TransportConfig {
        read_timeout: Some(Duration::from_millis(500)),
        ..TransportConfig::client()
    };
    let mut transport = UdpTransport::connect(&config, server)?;
    let mut factory = PacketFactory::new();

    let mut frame = [0u8; TAG_SIZE + Connect::WIRE_SIZE];
    encode_frame(&Connect::current(), &mut frame)?;

    let mut buf = [0u8; TAG_SIZE + MAX_PACKET_SIZE];
    for attempt in 1..=ATTEMPTS {
        transport.write(&frame, Destination::To(0))?;
        info!(%server, attempt, "connect sent");

        let outcome = match transport.read(&mut buf) {
            Ok(outcome) => outcome,
            Err(err) if err.is_transient() => continue,
            Err(err) => return Err(err.into()),
        };
        let (tag, payload) = split_frame(&buf[..outcome.bytes])?;
        match factory.construct(tag, payload) {
            Ok(Packet::ServerInitialResponse(response)) => {
                info!(
                    player = response.player_id,
                    major = response.major_version,
                    minor = response.minor_version,
                    "joined"
                );
                return Ok(());
            }
            Ok(other) => warn!(tag = ?other.tag(), "unexpected packet before handshake"),
            Err(err) => warn!(error = %err, "undecodable reply"),
        }
    }

    Err(format!("no response from {server} after {ATTEMPTS} attempts").into())
}
