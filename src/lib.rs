//! Ringwire - ring-buffer packet engine for real-time UDP game networking
//!
//! Each socket endpoint owns one fixed-size arena that serves as both the
//! inbound staging area and the outbound send queue. Packets use a compact big-endian wire format with a fixed size per
//! message type.
//!
//! # Quick Start
//!
//! ```rust
//! use ringwire::{Ack, Destination, EngineConfig, PacketProcessor, PacketWriter, Result};
//!
//! struct Loopback(Vec<Vec<u8>>);
//!
//! impl PacketWriter for Loopback {
//!     fn write(&mut self, frame: &[u8], _destination: Destination) -> Result<usize> {
//!         self.0.push(frame.to_vec());
//!         Ok(frame.len())
//!     }
//! }
//!
//! let mut engine: PacketProcessor = PacketProcessor::new(&EngineConfig::default())?;
//! engine.enqueue(&Ack { seq_num: 7 }, Destination::Broadcast)?;
//!
//! let mut wire = Loopback(Vec::new());
//! assert_eq!(engine.flush_all(&mut wire)?, 1);
//! assert_eq!(wire.0[0], [0, 0, 0, 1, 0, 0, 0, 7]);
//! # Ok::<(), ringwire::NetError>(())
//! ```
//!
//! # Features
//!
//! - **Single arena** - no allocation after construction
//! - **In-place relay** - processed datagrams are forwarded without copying
//! - **Typed packets** - one struct per message, dispatched through an enum
//! - **Candidate gate** - unadmitted senders may only open a handshake

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod protocol;
pub mod ring;
pub mod transport;

pub use protocol::{
    Ack, Connect, ConstructPacket, Destination, ErrorKind, NetError, Packet, PacketFactory,
    PlayerPosition, ReliablePacketCode, Result, ServerInitialResponse, ServerTimestamp, StarPiece,
    StateFlags, Tag, TimeQuery, TimeResponse, Vec3, WirePacket,
};
pub use ring::{EngineConfig, InvariantPolicy, PacketHolder, PacketProcessor};
pub use transport::{PacketReader, PacketWriter, TransportConfig, UdpTransport};

/// Ringwire crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
