//! Ringwire wire protocol
//!
//! This module provides the packet catalogue, its fixed-size big-endian codec,
//! tag dispatch, and the shared error type.

mod codec;
mod error;
mod factory;
mod packets;
mod types;

pub use codec::{WirePacket, encode_frame, split_frame};
pub use error::{ErrorKind, NetError, Result};
pub use factory::{ConstructPacket, Packet, PacketFactory};
pub use packets::{
    Ack, CONNECT_MAGIC, Connect, PlayerPosition, ServerInitialResponse, StarPiece, TimeQuery,
    TimeResponse,
};
pub use types::{
    ClockTimestamp, Destination, ReliablePacketCode, ServerClock, ServerTimestamp, StateFlags,
    Tag, Vec3,
};

/// Protocol major version spoken by this crate
pub const PROTOCOL_MAJOR: u32 = 0;

/// Protocol minor version spoken by this crate
pub const PROTOCOL_MINOR: u32 = 0;

/// Tag word size in bytes
pub const TAG_SIZE: usize = 4;

/// Alignment of every staged slot in the ring arena
pub const PACKET_ALIGNMENT: usize = 16;

/// Largest payload a datagram may carry (excluding the tag)
pub const MAX_PACKET_SIZE: usize = 1200;

/// Round `n` up to the next multiple of [`PACKET_ALIGNMENT`].
#[must_use]
pub const fn align_up(n: usize) -> usize {
    (n + PACKET_ALIGNMENT - 1) & !(PACKET_ALIGNMENT - 1)
}

/// Round `n` down to a multiple of [`PACKET_ALIGNMENT`].
#[must_use]
pub const fn align_down(n: usize) -> usize {
    n & !(PACKET_ALIGNMENT - 1)
}
