//! Packet catalogue
//!
//! One plain struct per message type, each implementing [`WirePacket`].
//!
//! # Wire Format
//!
//! Every datagram is `[tag (4, big-endian)] [payload]`; the payload layouts are
//! documented on each type. There is no length field: the datagram boundary is
//! authoritative.

use bytes::{Buf, BufMut};

use super::codec::{check_len, get_vec3, put_vec3};
use super::{
    NetError, PROTOCOL_MAJOR, PROTOCOL_MINOR, ReliablePacketCode, Result, ServerTimestamp,
    StateFlags, Tag, Vec3, WirePacket,
};

/// Magic prefix of every [`Connect`]: `"Connect\0"` as two big-endian words.
pub const CONNECT_MAGIC: u64 = 0x436F_6E6E_6563_7400;

/// Client handshake opener.
///
/// ```text
/// magic[8] ("Connect\0") | major u32 | minor u32
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Connect {
    /// Client protocol major version
    pub major_version: u32,
    /// Client protocol minor version
    pub minor_version: u32,
}

impl Connect {
    /// Create a connect request
    #[must_use]
    pub const fn new(major_version: u32, minor_version: u32) -> Self {
        Self {
            major_version,
            minor_version,
        }
    }

    /// Connect request for the protocol version this crate speaks
    #[must_use]
    pub const fn current() -> Self {
        Self::new(PROTOCOL_MAJOR, PROTOCOL_MINOR)
    }
}

impl WirePacket for Connect {
    const TAG: Tag = Tag::Connect;
    const WIRE_SIZE: usize = 16;

    fn encode(&self, out: &mut [u8]) -> Result<usize> {
        check_len(out.len(), Self::WIRE_SIZE)?;
        let mut cursor = &mut out[..Self::WIRE_SIZE];
        cursor.put_u64(CONNECT_MAGIC);
        cursor.put_u32(self.major_version);
        cursor.put_u32(self.minor_version);
        Ok(Self::WIRE_SIZE)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf.len(), Self::WIRE_SIZE)?;
        let mut buf = &buf[..Self::WIRE_SIZE];
        if buf.get_u64() != CONNECT_MAGIC {
            return Err(NetError::invalid_data("connect magic mismatch"));
        }
        let major_version = buf.get_u32();
        let minor_version = buf.get_u32();
        Ok(Self::new(major_version, minor_version))
    }
}

/// Sequence acknowledgement.
///
/// ```text
/// seq u32
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ack {
    /// Acknowledged sequence number
    pub seq_num: u32,
}

impl WirePacket for Ack {
    const TAG: Tag = Tag::Ack;
    const WIRE_SIZE: usize = 4;

    fn encode(&self, out: &mut [u8]) -> Result<usize> {
        check_len(out.len(), Self::WIRE_SIZE)?;
        (&mut out[..Self::WIRE_SIZE]).put_u32(self.seq_num);
        Ok(Self::WIRE_SIZE)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf.len(), Self::WIRE_SIZE)?;
        let seq_num = (&buf[..Self::WIRE_SIZE]).get_u32();
        Ok(Self { seq_num })
    }
}

/// Server handshake reply.
///
/// ```text
/// major u32 | minor u32 | player_id u8
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerInitialResponse {
    /// Server protocol major version
    pub major_version: u32,
    /// Server protocol minor version
    pub minor_version: u32,
    /// Player id assigned to the client
    pub player_id: u8,
}

impl ServerInitialResponse {
    /// Reply for the protocol version this crate speaks
    #[must_use]
    pub const fn current(player_id: u8) -> Self {
        Self {
            major_version: PROTOCOL_MAJOR,
            minor_version: PROTOCOL_MINOR,
            player_id,
        }
    }
}

impl WirePacket for ServerInitialResponse {
    const TAG: Tag = Tag::ServerInitialResponse;
    const WIRE_SIZE: usize = 9;

    fn encode(&self, out: &mut [u8]) -> Result<usize> {
        check_len(out.len(), Self::WIRE_SIZE)?;
        let mut cursor = &mut out[..Self::WIRE_SIZE];
        cursor.put_u32(self.major_version);
        cursor.put_u32(self.minor_version);
        cursor.put_u8(self.player_id);
        Ok(Self::WIRE_SIZE)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf.len(), Self::WIRE_SIZE)?;
        let mut buf = &buf[..Self::WIRE_SIZE];
        Ok(Self {
            major_version: buf.get_u32(),
            minor_version: buf.get_u32(),
            player_id: buf.get_u8(),
        })
    }
}

/// Player movement and animation state.
///
/// ```text
///  0: player_id u8 | state_flags u8 | padding[2]
///  4: timestamp i32
///  8: position  f32 x3
/// 20: velocity  f32 x3
/// 32: direction f32 x3
/// 44: current_animation i32
/// 48: default_animation i32
/// 52: animation_speed f32
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerPosition {
    /// Player this update describes
    pub player_id: u8,
    /// Movement state bits
    pub state_flags: StateFlags,
    /// Server time the update applies to
    pub timestamp: ServerTimestamp,
    /// World position
    pub position: Vec3,
    /// Velocity
    pub velocity: Vec3,
    /// Facing direction
    pub direction: Vec3,
    /// Animation currently playing
    pub current_animation: i32,
    /// Animation to fall back to
    pub default_animation: i32,
    /// Playback rate of `current_animation`
    pub animation_speed: f32,
}

impl WirePacket for PlayerPosition {
    const TAG: Tag = Tag::PlayerPosition;
    const WIRE_SIZE: usize = 56;

    fn encode(&self, out: &mut [u8]) -> Result<usize> {
        check_len(out.len(), Self::WIRE_SIZE)?;
        let mut cursor = &mut out[..Self::WIRE_SIZE];
        cursor.put_u8(self.player_id);
        cursor.put_u8(self.state_flags.as_u8());
        cursor.put_bytes(0, 2);
        cursor.put_i32(self.timestamp.millis());
        put_vec3(&mut cursor, self.position);
        put_vec3(&mut cursor, self.velocity);
        put_vec3(&mut cursor, self.direction);
        cursor.put_i32(self.current_animation);
        cursor.put_i32(self.default_animation);
        cursor.put_f32(self.animation_speed);
        Ok(Self::WIRE_SIZE)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf.len(), Self::WIRE_SIZE)?;
        let mut buf = &buf[..Self::WIRE_SIZE];
        let player_id = buf.get_u8();
        let state_flags = StateFlags::from_u8(buf.get_u8());
        buf.advance(2);
        Ok(Self {
            player_id,
            state_flags,
            timestamp: ServerTimestamp::from_millis(buf.get_i32()),
            position: get_vec3(&mut buf),
            velocity: get_vec3(&mut buf),
            direction: get_vec3(&mut buf),
            current_animation: buf.get_i32(),
            default_animation: buf.get_i32(),
            animation_speed: buf.get_f32(),
        })
    }
}

/// Clock synchronisation query, received by the server.
///
/// ```text
/// time_ms u32 | reliability_code u32
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeQuery {
    /// Sender's clock when the query left
    pub time_ms: u32,
    /// Code the response must echo
    pub check: ReliablePacketCode,
}

impl WirePacket for TimeQuery {
    const TAG: Tag = Tag::TimeQuery;
    const WIRE_SIZE: usize = 8;

    fn encode(&self, _out: &mut [u8]) -> Result<usize> {
        Err(NetError::Misuse {
            reason: "time queries are receive-only on this endpoint",
        })
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf.len(), Self::WIRE_SIZE)?;
        let mut buf = &buf[..Self::WIRE_SIZE];
        Ok(Self {
            time_ms: buf.get_u32(),
            check: ReliablePacketCode(buf.get_u32()),
        })
    }
}

/// Clock synchronisation reply.
///
/// ```text
/// time_ms u32 | reliability_code u32
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeResponse {
    /// Responder's clock when the reply left
    pub time_ms: u32,
    /// Code echoed from the query
    pub check: ReliablePacketCode,
}

impl TimeResponse {
    /// Reply to `query` stamped with the responder's clock.
    #[must_use]
    pub const fn answering(query: &TimeQuery, time_ms: u32) -> Self {
        Self {
            time_ms,
            check: query.check,
        }
    }

    /// Whether this reply belongs to `query`.
    #[must_use]
    pub const fn answers(&self, query: &TimeQuery) -> bool {
        self.check.verifies(query.check)
    }
}

impl WirePacket for TimeResponse {
    const TAG: Tag = Tag::TimeResponse;
    const WIRE_SIZE: usize = 8;

    fn encode(&self, out: &mut [u8]) -> Result<usize> {
        check_len(out.len(), Self::WIRE_SIZE)?;
        let mut cursor = &mut out[..Self::WIRE_SIZE];
        cursor.put_u32(self.time_ms);
        cursor.put_u32(self.check.0);
        Ok(Self::WIRE_SIZE)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf.len(), Self::WIRE_SIZE)?;
        let mut buf = &buf[..Self::WIRE_SIZE];
        Ok(Self {
            time_ms: buf.get_u32(),
            check: ReliablePacketCode(buf.get_u32()),
        })
    }
}

/// Star piece thrown along a line.
///
/// ```text
///  0: player_id u8 | padding[3]
///  4: timestamp i32
///  8: line_start f32 x3
/// 20: line_end   f32 x3
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StarPiece {
    /// Thrower
    pub player_id: u8,
    /// Server time of the throw
    pub timestamp: ServerTimestamp,
    /// Start of the initial flight line
    pub line_start: Vec3,
    /// End of the initial flight line
    pub line_end: Vec3,
}

impl WirePacket for StarPiece {
    const TAG: Tag = Tag::StarPiece;
    const WIRE_SIZE: usize = 32;

    fn encode(&self, out: &mut [u8]) -> Result<usize> {
        check_len(out.len(), Self::WIRE_SIZE)?;
        let mut cursor = &mut out[..Self::WIRE_SIZE];
        cursor.put_u8(self.player_id);
        cursor.put_bytes(0, 3);
        cursor.put_i32(self.timestamp.millis());
        put_vec3(&mut cursor, self.line_start);
        put_vec3(&mut cursor, self.line_end);
        Ok(Self::WIRE_SIZE)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf.len(), Self::WIRE_SIZE)?;
        let mut buf = &buf[..Self::WIRE_SIZE];
        let player_id = buf.get_u8();
        buf.advance(3);
        Ok(Self {
            player_id,
            timestamp: ServerTimestamp::from_millis(buf.get_i32()),
            line_start: get_vec3(&mut buf),
            line_end: get_vec3(&mut buf),
        })
    }
}
