//! Fixed-size connection table mapping peer addresses to small ids

use std::net::SocketAddr;

use tracing::{debug, trace};

use super::Admission;
use crate::protocol::{Destination, NetError, Result};

/// Occupancy of one connection slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlotState {
    /// Unused
    #[default]
    Free,
    /// Seen once, handshake pending
    Candidate(SocketAddr),
    /// Established
    Active(SocketAddr),
}

impl SlotState {
    /// Address held by the slot
    #[must_use]
    pub const fn address(&self) -> Option<SocketAddr> {
        match self {
            Self::Free => None,
            Self::Candidate(addr) | Self::Active(addr) => Some(*addr),
        }
    }
}

/// Address table indexed by connection id.
///
/// Lookup is a linear scan and new peers take the first free slot. There is
/// no eviction: a full table filters unknown senders until a slot is purged.
#[derive(Debug, Clone)]
pub struct ConnectionTable {
    slots: Vec<SlotState>,
}

impl ConnectionTable {
    /// Largest table a destination mask can address
    pub const MAX_SLOTS: usize = Destination::MAX_ID as usize + 1;

    /// Create a table with `capacity` free slots, capped at [`Self::MAX_SLOTS`].
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![SlotState::Free; capacity.min(Self::MAX_SLOTS)],
        }
    }

    /// Number of slots
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// State of slot `id`
    #[must_use]
    pub fn slot(&self, id: u8) -> Option<SlotState> {
        self.slots.get(usize::from(id)).copied()
    }

    /// Address of connection `id`
    #[must_use]
    pub fn address(&self, id: u8) -> Option<SocketAddr> {
        self.slot(id).and_then(|slot| slot.address())
    }

    /// Whether slot `id` is established
    #[must_use]
    pub fn is_active(&self, id: u8) -> bool {
        matches!(self.slot(id), Some(SlotState::Active(_)))
    }

    /// Whether slot `id` is a pending candidate
    #[must_use]
    pub fn is_candidate(&self, id: u8) -> bool {
        matches!(self.slot(id), Some(SlotState::Candidate(_)))
    }

    /// Number of established connections
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, SlotState::Active(_)))
            .count()
    }

    /// Map a sender address to its id, claiming a candidate slot for
    /// unknown addresses.
    pub fn resolve(&mut self, addr: SocketAddr) -> Result<(u8, Admission)> {
        if let Some((id, slot)) = self.find(addr) {
            let admission = match slot {
                SlotState::Active(_) => Admission::Active,
                _ => Admission::Candidate,
            };
            return Ok((id, admission));
        }

        let id = self.claim(SlotState::Candidate(addr))?;
        debug!(id, %addr, "new connection candidate");
        Ok((id, Admission::Candidate))
    }

    /// Register a trusted peer as active, returning its id.
    pub fn admit(&mut self, addr: SocketAddr) -> Result<u8> {
        if let Some((id, _)) = self.find(addr) {
            self.slots[usize::from(id)] = SlotState::Active(addr);
            return Ok(id);
        }
        let id = self.claim(SlotState::Active(addr))?;
        debug!(id, %addr, "admitted connection");
        Ok(id)
    }

    /// Turn candidate `id` into an active connection. Returns whether it was
    /// a candidate.
    pub fn promote(&mut self, id: u8) -> bool {
        match self.slot(id) {
            Some(SlotState::Candidate(addr)) => {
                self.slots[usize::from(id)] = SlotState::Active(addr);
                debug!(id, %addr, "candidate promoted");
                true
            }
            _ => false,
        }
    }

    /// Free slot `id` if it holds a candidate.
    pub fn purge_candidate(&mut self, id: u8) {
        if self.is_candidate(id) {
            self.slots[usize::from(id)] = SlotState::Free;
            trace!(id, "candidate purged");
        }
    }

    /// Free slot `id` whatever it holds.
    pub fn purge(&mut self, id: u8) {
        if let Some(slot) = self.slots.get_mut(usize::from(id)) {
            *slot = SlotState::Free;
            trace!(id, "connection purged");
        }
    }

    /// Addresses a destination reaches.
    ///
    /// Broadcast and all-except only reach established connections; unicast
    /// also reaches a candidate so the handshake reply can get through.
    pub fn recipients(&self, destination: Destination) -> impl Iterator<Item = SocketAddr> + '_ {
        self.slots
            .iter()
            .zip(0u8..)
            .filter_map(move |(slot, id)| match (*slot, destination) {
                (SlotState::Active(addr), dest) if dest.includes(id) => Some(addr),
                (SlotState::Candidate(addr), Destination::To(target)) if target == id => {
                    Some(addr)
                }
                _ => None,
            })
    }

    fn find(&self, addr: SocketAddr) -> Option<(u8, SlotState)> {
        self.slots
            .iter()
            .zip(0u8..)
            .find(|(slot, _)| slot.address() == Some(addr))
            .map(|(slot, id)| (id, *slot))
    }

    fn claim(&mut self, state: SlotState) -> Result<u8> {
        let free = self
            .slots
            .iter()
            .zip(0u8..)
            .find(|(slot, _)| **slot == SlotState::Free)
            .map(|(_, id)| id);
        let Some(id) = free else {
            debug!(capacity = self.slots.len(), "connection table full");
            return Err(NetError::Filtered);
        };
        self.slots[usize::from(id)] = state;
        Ok(id)
    }
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new(8)
    }
}
