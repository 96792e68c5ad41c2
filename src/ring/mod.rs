//! Ring-buffer packet engine
//!
//! One fixed arena per socket serves as inbound staging area, outbound queue
//! and retirement log at once. Four cursors walk it:
//!
//! ```text
//!            read_boundary           send    process      pending_read
//!                  |                   |        |              |
//!   free ... [ outbound | retired | relays ... | staged inbound ] free ...
//! ```
//!
//! Outbound packets grow the live region backwards from `read_boundary`,
//! inbound datagrams grow it forwards from `pending_read`. The send chain
//! threads every record from `send` to `pending_read` in transmission order.

mod control;
mod holder;
mod processor;
mod stats;

use tracing::error;

use crate::protocol::{MAX_PACKET_SIZE, NetError, PACKET_ALIGNMENT, TAG_SIZE, align_up};

pub use control::CONTROL_SIZE;
pub use holder::{Cursors, PacketHolder, PacketView};
pub use processor::PacketProcessor;
pub use stats::RingStats;

/// Bytes between a slot's start and its payload: control record plus tag, aligned
pub const SLOT_HEADER: usize = align_up(CONTROL_SIZE + TAG_SIZE);

/// Worst-case slot reserved for one inbound datagram
pub const INBOUND_SLOT: usize = SLOT_HEADER + align_up(MAX_PACKET_SIZE);

/// Smallest arena that can stage a datagram
pub const MIN_ARENA_SIZE: usize = INBOUND_SLOT + PACKET_ALIGNMENT;

/// Default player count used to size the arena
pub const DEFAULT_PLAYERS: usize = 8;

/// Reaction to a broken engine invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InvariantPolicy {
    /// Panic on the spot
    Abort,
    /// Log and return [`NetError::InvalidState`]
    Report,
}

impl Default for InvariantPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Abort
        } else {
            Self::Report
        }
    }
}

impl InvariantPolicy {
    pub(crate) fn violation(self, what: &'static str) -> NetError {
        error!(what, "ring invariant violated");
        if self == Self::Abort {
            panic!("ring invariant violated: {what}");
        }
        NetError::InvalidState { what }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Arena size in bytes, rounded up to [`PACKET_ALIGNMENT`]
    pub arena_size: usize,
    /// What to do when an invariant breaks
    #[cfg_attr(feature = "serde", serde(default))]
    pub invariant_policy: InvariantPolicy,
}

impl EngineConfig {
    /// Arena with one worst-case inbound slot per player.
    #[must_use]
    pub fn for_players(players: usize) -> Self {
        Self {
            arena_size: INBOUND_SLOT * players + PACKET_ALIGNMENT,
            invariant_policy: InvariantPolicy::default(),
        }
    }

    /// Override the arena size
    #[must_use]
    pub fn with_arena_size(mut self, arena_size: usize) -> Self {
        self.arena_size = arena_size;
        self
    }

    /// Override the invariant policy
    #[must_use]
    pub fn with_invariant_policy(mut self, policy: InvariantPolicy) -> Self {
        self.invariant_policy = policy;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_players(DEFAULT_PLAYERS)
    }
}
