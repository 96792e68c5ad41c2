//! Packet tags, destinations and the small value types carried by packets

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign};

/// Wire discriminant identifying a packet's format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum Tag {
    /// Client -> server handshake opener
    Connect = 0,
    /// Sequence acknowledgement
    Ack = 1,
    /// Server -> client handshake reply carrying the assigned player id
    ServerInitialResponse = 2,
    /// Player movement and animation state
    PlayerPosition = 3,
    /// Clock synchronisation query
    TimeQuery = 4,
    /// Clock synchronisation reply
    TimeResponse = 5,
    /// Star piece thrown along a line
    StarPiece = 6,
}

impl Tag {
    /// Exclusive upper bound of the tag range.
    pub const COUNT: u32 = 7;

    /// Convert from the host-order wire word
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Connect),
            1 => Some(Self::Ack),
            2 => Some(Self::ServerInitialResponse),
            3 => Some(Self::PlayerPosition),
            4 => Some(Self::TimeQuery),
            5 => Some(Self::TimeResponse),
            6 => Some(Self::StarPiece),
            _ => None,
        }
    }

    /// Convert to the host-order wire word
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Big-endian bytes as they appear at the head of a datagram.
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; 4] {
        (self as u32).to_be_bytes()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "Connect",
            Self::Ack => "Ack",
            Self::ServerInitialResponse => "ServerInitialResponse",
            Self::PlayerPosition => "PlayerPosition",
            Self::TimeQuery => "TimeQuery",
            Self::TimeResponse => "TimeResponse",
            Self::StarPiece => "StarPiece",
        };
        write!(f, "{name}")
    }
}

/// Where a queued packet goes, encoded in one byte of its control record.
///
/// ```text
/// 0xFF            broadcast to every active connection
/// 1xxx_xxxx       unicast to connection id xxx_xxxx
/// 0xxx_xxxx       every active connection except id xxx_xxxx
/// ```
///
/// Inbound records store the sender id in the same byte, so a received packet
/// left undropped relays to everyone but its sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Destination {
    /// Every active connection
    Broadcast,
    /// A single connection id
    To(u8),
    /// Every active connection except this id
    AllExcept(u8),
}

impl Destination {
    /// Mask byte for broadcast
    pub const BROADCAST_MASK: u8 = 0xFF;
    /// High bit selecting unicast
    pub const UNICAST_BIT: u8 = 0x80;
    /// Largest connection id a mask can address.
    pub const MAX_ID: u8 = 0x7E;

    /// Decode a mask byte.
    #[must_use]
    pub const fn from_mask(mask: u8) -> Self {
        if mask == Self::BROADCAST_MASK {
            Self::Broadcast
        } else if mask & Self::UNICAST_BIT != 0 {
            Self::To(mask & !Self::UNICAST_BIT)
        } else {
            Self::AllExcept(mask)
        }
    }

    /// Encode as a mask byte.
    #[must_use]
    pub const fn mask(self) -> u8 {
        match self {
            Self::Broadcast => Self::BROADCAST_MASK,
            Self::To(id) => {
                debug_assert!(id <= Self::MAX_ID, "unicast id collides with broadcast");
                Self::UNICAST_BIT | (id & !Self::UNICAST_BIT)
            }
            Self::AllExcept(id) => id & !Self::UNICAST_BIT,
        }
    }

    /// Whether the mask byte can carry this destination without aliasing
    /// another one.
    #[must_use]
    pub const fn is_addressable(self) -> bool {
        match self {
            Self::Broadcast => true,
            Self::To(id) => id <= Self::MAX_ID,
            Self::AllExcept(id) => id & Self::UNICAST_BIT == 0,
        }
    }

    /// Whether connection `id` is addressed.
    #[must_use]
    pub const fn includes(self, id: u8) -> bool {
        match self {
            Self::Broadcast => true,
            Self::To(target) => target == id,
            Self::AllExcept(excluded) => excluded != id,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadcast => write!(f, "broadcast"),
            Self::To(id) => write!(f, "to #{id}"),
            Self::AllExcept(id) => write!(f, "all except #{id}"),
        }
    }
}

/// Three-component float vector.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Create a vector
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The zero vector
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Euclidean length
    #[must_use]
    pub fn magnitude(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Whether `other` lies within `tolerance` of `self`.
    #[must_use]
    pub fn approx_eq(self, other: Self, tolerance: f32) -> bool {
        (self - other).magnitude() <= tolerance
    }

    /// Same direction, rescaled to `length`. The zero vector stays zero.
    #[must_use]
    pub fn with_length(self, length: f32) -> Self {
        let magnitude = self.magnitude();
        if magnitude == 0.0 {
            return self;
        }
        self * (length / magnitude)
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign<f32> for Vec3 {
    fn mul_assign(&mut self, scalar: f32) {
        *self = *self * scalar;
    }
}

/// Clock domain of timestamps issued by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerClock;

/// Millisecond timestamp bound to the clock domain `C`.
///
/// Timestamps from different domains are distinct types and cannot be compared
/// or mixed by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTimestamp<C> {
    millis: i32,
    clock: PhantomData<C>,
}

impl<C> ClockTimestamp<C> {
    /// Raw value marking an unset timestamp.
    pub const EMPTY_MILLIS: i32 = i32::MIN;

    /// Timestamp at `millis` in this domain
    #[must_use]
    pub const fn from_millis(millis: i32) -> Self {
        Self {
            millis,
            clock: PhantomData,
        }
    }

    /// The unset timestamp
    #[must_use]
    pub const fn empty() -> Self {
        Self::from_millis(Self::EMPTY_MILLIS)
    }

    /// Raw milliseconds
    #[must_use]
    pub const fn millis(self) -> i32 {
        self.millis
    }

    /// Whether this is the unset timestamp
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.millis == Self::EMPTY_MILLIS
    }
}

impl<C> Default for ClockTimestamp<C> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Timestamp on the server's clock.
pub type ServerTimestamp = ClockTimestamp<ServerClock>;

/// Sequence number correlating a query with its response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReliablePacketCode(pub u32);

impl ReliablePacketCode {
    /// Whether `other` answers the packet that carried `self`.
    #[must_use]
    pub const fn verifies(self, other: Self) -> bool {
        self.0 == other.0
    }

    /// The code for the next query.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Player state bits carried by [`PlayerPosition`](super::PlayerPosition).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateFlags(u8);

impl StateFlags {
    /// Player is performing a hip drop
    pub const HIPDROP: u8 = 1 << 0;

    /// Create empty flags
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Create from byte. Unknown bits are preserved for forward compatibility.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        Self(value)
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Set a flag
    #[must_use]
    pub const fn with(mut self, flag: u8) -> Self {
        self.0 |= flag;
        self
    }

    /// Check if flag is set
    #[must_use]
    pub const fn has(self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }

    /// Check if hip dropping
    #[must_use]
    pub const fn is_hipdrop(self) -> bool {
        self.has(Self::HIPDROP)
    }
}
