//! Tag dispatch and the candidate admission gate

use tracing::debug;

use super::{
    Ack, Connect, NetError, PlayerPosition, Result, ServerInitialResponse, StarPiece, Tag,
    TimeQuery, TimeResponse, WirePacket,
};

/// A decoded packet of any known type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Packet {
    /// Client handshake opener
    Connect(Connect),
    /// Sequence acknowledgement
    Ack(Ack),
    /// Server handshake reply
    ServerInitialResponse(ServerInitialResponse),
    /// Player movement and animation state
    PlayerPosition(PlayerPosition),
    /// Clock synchronisation query
    TimeQuery(TimeQuery),
    /// Clock synchronisation reply
    TimeResponse(TimeResponse),
    /// Star piece throw
    StarPiece(StarPiece),
}

impl Packet {
    /// Wire tag of the contained packet
    #[must_use]
    pub const fn tag(&self) -> Tag {
        match self {
            Self::Connect(_) => Tag::Connect,
            Self::Ack(_) => Tag::Ack,
            Self::ServerInitialResponse(_) => Tag::ServerInitialResponse,
            Self::PlayerPosition(_) => Tag::PlayerPosition,
            Self::TimeQuery(_) => Tag::TimeQuery,
            Self::TimeResponse(_) => Tag::TimeResponse,
            Self::StarPiece(_) => Tag::StarPiece,
        }
    }
}

/// Turns a staged `(tag, payload)` pair into a typed value.
///
/// Implementations must honour candidate mode: while it is on, only the
/// handshake opener may be constructed.
pub trait ConstructPacket {
    /// Decoded representation
    type Output;

    /// Decode `payload` according to the host-order `tag`.
    fn construct(&mut self, tag: u32, payload: &[u8]) -> Result<Self::Output>;

    /// Restrict construction to handshake packets for the next datagram.
    fn set_candidate_mode(&mut self, on: bool);
}

/// Factory for the built-in [`Packet`] catalogue.
#[derive(Debug, Default)]
pub struct PacketFactory {
    candidate: bool,
}

impl PacketFactory {
    /// Create a factory with candidate mode off
    #[must_use]
    pub const fn new() -> Self {
        Self { candidate: false }
    }

    /// Whether candidate mode is on
    #[must_use]
    pub const fn is_candidate_mode(&self) -> bool {
        self.candidate
    }
}

impl ConstructPacket for PacketFactory {
    type Output = Packet;

    fn construct(&mut self, tag: u32, payload: &[u8]) -> Result<Packet> {
        let Some(tag) = Tag::from_u32(tag) else {
            debug!(tag, "unknown packet tag");
            return Err(NetError::invalid_data("unknown packet tag"));
        };

        if self.candidate && tag != Tag::Connect {
            debug!(%tag, "candidate sent a non-handshake packet");
            return Err(NetError::Filtered);
        }

        let packet = match tag {
            Tag::Connect => Packet::Connect(Connect::decode(payload)?),
            Tag::Ack => Packet::Ack(Ack::decode(payload)?),
            Tag::ServerInitialResponse => {
                Packet::ServerInitialResponse(ServerInitialResponse::decode(payload)?)
            }
            Tag::PlayerPosition => Packet::PlayerPosition(PlayerPosition::decode(payload)?),
            Tag::TimeQuery => Packet::TimeQuery(TimeQuery::decode(payload)?),
            Tag::TimeResponse => Packet::TimeResponse(TimeResponse::decode(payload)?),
            Tag::StarPiece => Packet::StarPiece(StarPiece::decode(payload)?),
        };
        Ok(packet)
    }

    fn set_candidate_mode(&mut self, on: bool) {
        self.candidate = on;
    }
}
