//! In-band control records
//!
//! Every slot in the arena starts with a 16-byte record:
//!
//! ```text
//!  0: kind u8 | peer u8 | flags u8 | reserved u8
//!  4: payload_len u32
//!  8: next_read u32   forward distance to the physical successor
//! 12: next_send u32   forward distance to the chain successor
//! ```
//!
//! Records never leave the process, so the words are little-endian.

use bytes::{Buf, BufMut};

/// Size of a control record in bytes
pub const CONTROL_SIZE: usize = 16;

/// What a slot currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum RecordKind {
    /// Live datagram: staged inbound, or queued outbound
    Packet = 0,
    /// Retired datagram or alignment filler
    Skip = 1,
}

impl RecordKind {
    pub(crate) const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Packet),
            1 => Some(Self::Skip),
            _ => None,
        }
    }
}

/// Record state bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RecordFlags(u8);

impl RecordFlags {
    /// Still reachable from the send cursor
    pub(crate) const LINKED: u8 = 1 << 0;
    /// Received from an unadmitted sender
    pub(crate) const CANDIDATE: u8 = 1 << 1;
    /// Alignment padding rather than a retired datagram
    pub(crate) const FILLER: u8 = 1 << 2;

    pub(crate) const fn from_u8(value: u8) -> Self {
        Self(value)
    }

    pub(crate) const fn as_u8(self) -> u8 {
        self.0
    }

    pub(crate) const fn with(mut self, flag: u8) -> Self {
        self.0 |= flag;
        self
    }

    pub(crate) const fn without(mut self, flag: u8) -> Self {
        self.0 &= !flag;
        self
    }

    pub(crate) const fn has(self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }
}

/// Decoded control record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Control {
    pub(crate) kind: RecordKind,
    pub(crate) peer: u8,
    pub(crate) flags: RecordFlags,
    pub(crate) payload_len: u32,
    pub(crate) next_read: u32,
    pub(crate) next_send: u32,
}

impl Control {
    /// Record for a fresh datagram whose physical and chain successors coincide.
    pub(crate) const fn packet(peer: u8, flags: RecordFlags, payload_len: u32, span: u32) -> Self {
        Self {
            kind: RecordKind::Packet,
            peer,
            flags,
            payload_len,
            next_read: span,
            next_send: span,
        }
    }

    /// Filler covering `span` bytes.
    pub(crate) const fn filler(span: u32, linked: bool) -> Self {
        let flags = if linked {
            RecordFlags::from_u8(RecordFlags::FILLER | RecordFlags::LINKED)
        } else {
            RecordFlags::from_u8(RecordFlags::FILLER)
        };
        Self {
            kind: RecordKind::Skip,
            peer: 0,
            flags,
            payload_len: 0,
            next_read: span,
            next_send: span,
        }
    }

    pub(crate) const fn is_linked(&self) -> bool {
        self.flags.has(RecordFlags::LINKED)
    }

    pub(crate) const fn is_candidate(&self) -> bool {
        self.flags.has(RecordFlags::CANDIDATE)
    }

    pub(crate) const fn is_filler(&self) -> bool {
        self.flags.has(RecordFlags::FILLER)
    }

    /// Read the record at `at`. `None` if the kind byte is corrupt.
    pub(crate) fn read(arena: &[u8], at: usize) -> Option<Self> {
        let mut buf = &arena[at..at + CONTROL_SIZE];
        let kind = RecordKind::from_u8(buf.get_u8())?;
        let peer = buf.get_u8();
        let flags = RecordFlags::from_u8(buf.get_u8());
        buf.advance(1);
        Some(Self {
            kind,
            peer,
            flags,
            payload_len: buf.get_u32_le(),
            next_read: buf.get_u32_le(),
            next_send: buf.get_u32_le(),
        })
    }

    /// Write the record at `at`.
    pub(crate) fn write(&self, arena: &mut [u8], at: usize) {
        let mut buf = &mut arena[at..at + CONTROL_SIZE];
        buf.put_u8(self.kind as u8);
        buf.put_u8(self.peer);
        buf.put_u8(self.flags.as_u8());
        buf.put_u8(0);
        buf.put_u32_le(self.payload_len);
        buf.put_u32_le(self.next_read);
        buf.put_u32_le(self.next_send);
    }
}
