//! Fixed-tick relay server
//!
//! Drains the socket once per tick, answers handshakes and time queries, and
//! relays movement to every other player straight out of the ring.
//!
//! ```text
//! RUST_LOG=ringwire=debug cargo run --example tick_server
//! ```

use std::thread;
use std::time::{Duration, Instant};

use ringwire::protocol::PROTOCOL_MAJOR;
use ringwire::{
    Destination, EngineConfig, NetError, Packet, PacketProcessor, ServerInitialResponse,
    TimeResponse, TransportConfig, UdpTransport,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const TICK: Duration = Duration::from_millis(16);

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let transport_config = TransportConfig {
        nonblocking: true,
        ..TransportConfig::default()
    };
    let mut transport = UdpTransport::bind(&transport_config)?;
    let mut engine: PacketProcessor =
        PacketProcessor::new(&EngineConfig::for_players(transport_config.connection_slots))?;
    info!(addr = %transport.local_addr()?, "server listening");

    let started = Instant::now();
    loop {
        let tick_start = Instant::now();
        let clock_ms = u32::try_from(started.elapsed().as_millis()).unwrap_or(u32::MAX);

        loop {
            match engine.read_packet(&mut transport) {
                Ok(_) => {}
                Err(NetError::Filtered) => continue,
                Err(err) if err.is_transient() => break,
                Err(err) => {
                    warn!(error = %err, "read failed");
                    break;
                }
            }

            let sender = engine.sender_id()?;
            let relay = match engine.process_packet() {
                Ok(Packet::Connect(connect)) if connect.major_version == PROTOCOL_MAJOR => {
                    if transport.connections_mut().promote(sender) {
                        info!(player = sender, "player joined");
                    }
                    engine.enqueue(
                        &ServerInitialResponse::current(sender),
                        Destination::To(sender),
                    )?;
                    false
                }
                Ok(Packet::Connect(connect)) => {
                    debug!(player = sender, major = connect.major_version, "version mismatch");
                    transport.connections_mut().purge_candidate(sender);
                    false
                }
                Ok(Packet::TimeQuery(query)) => {
                    engine.enqueue(&TimeResponse::answering(&query, clock_ms), Destination::To(sender))?;
                    false
                }
                Ok(Packet::PlayerPosition(_) | Packet::StarPiece(_)) => true,
                Ok(other) => {
                    debug!(player = sender, tag = ?other.tag(), "ignored");
                    false
                }
                Err(err) => {
                    debug!(player = sender, error = %err, "rejected");
                    transport.connections_mut().purge_candidate(sender);
                    false
                }
            };
            if !relay {
                engine.drop_current()?;
            }
            engine.finish_processing()?;
        }

        let sent = engine.flush_all(&mut transport)?;
        if sent > 0 {
            debug!(sent, "tick flushed");
        }

        if let Some(rest) = TICK.checked_sub(tick_start.elapsed()) {
            thread::sleep(rest);
        }
    }
}
