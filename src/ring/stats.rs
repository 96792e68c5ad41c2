//! Per-engine packet counters

/// Counters kept by one [`PacketHolder`](super::PacketHolder).
///
/// The engine has a single owner, so these are plain integers rather than
/// atomics. Copy the struct out to take a snapshot.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RingStats {
    /// Datagrams staged by `read_packet`
    pub received: u64,
    /// Datagrams handed to a writer, relays included
    pub sent: u64,
    /// Retired records stepped over by the send cursor
    pub skipped: u64,
    /// Staged datagrams dropped by the application
    pub dropped: u64,
    /// Packets queued by `enqueue`
    pub enqueued: u64,
    /// Reservations refused for lack of space
    pub space_exhausted: u64,
}

impl RingStats {
    /// Received datagrams that were neither dropped nor still staged count as relays.
    #[must_use]
    pub fn relayed(&self, staged: u64) -> u64 {
        self.received.saturating_sub(self.dropped + staged)
    }

    /// Fraction of reservations refused, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn refusal_ratio(&self) -> f64 {
        let attempts = self.received + self.enqueued + self.space_exhausted;
        if attempts == 0 {
            return 0.0;
        }
        self.space_exhausted as f64 / attempts as f64
    }
}
