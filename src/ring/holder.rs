//! The packet holder: one arena, four cursors
//!
//! # Slot layout
//!
//! ```text
//! +0   control record (16)
//! +16  unused (12)
//! +28  tag, big-endian (4)
//! +32  payload, padded to PACKET_ALIGNMENT
//! ```
//!
//! Tag and payload are contiguous so a staged datagram can be handed back to
//! the transport without copying.

use std::fmt;

use bytes::Buf;
use tracing::{debug, trace};

use super::control::{Control, RecordFlags, RecordKind};
use super::{EngineConfig, INBOUND_SLOT, InvariantPolicy, MIN_ARENA_SIZE, RingStats, SLOT_HEADER};
use crate::protocol::{
    Destination, NetError, PACKET_ALIGNMENT, Result, TAG_SIZE, WirePacket, align_up,
};
use crate::transport::{Admission, PacketReader, PacketWriter};

const TAG_OFFSET: usize = SLOT_HEADER - TAG_SIZE;

/// Snapshot of the ring cursors, as byte offsets into the arena.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursors {
    /// Next record to transmit
    pub send: usize,
    /// Next staged record the application will see
    pub process: usize,
    /// Where the next inbound datagram lands
    pub pending_read: usize,
    /// Oldest live record
    pub read_boundary: usize,
    /// Bytes in the live region `[read_boundary, pending_read)`
    pub used: usize,
    /// Record whose chain successor is `process`, if any precedes it
    send_tail: Option<usize>,
}

/// Borrowed view of the staged datagram at the process cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketView<'a> {
    /// Host-order tag word
    pub tag: u32,
    /// Payload bytes following the tag
    pub payload: &'a [u8],
    /// Sender id
    pub peer: u8,
    /// Whether the sender is still a candidate
    pub candidate: bool,
}

enum Flushed {
    Idle,
    Sent(usize),
    Skipped,
}

/// Fixed-size ring arena holding both the inbound staging area and the send
/// queue of one socket.
///
/// # Ownership
///
/// Every mutator takes `&mut self` and the holder takes no locks. Drive it from
/// a single tick loop; there is nothing to gain from sharing it across threads.
pub struct PacketHolder {
    arena: Box<[u8]>,
    cursors: Cursors,
    policy: InvariantPolicy,
    stats: RingStats,
}

impl PacketHolder {
    /// Allocate the arena described by `config`.
    ///
    /// The size is rounded up to [`PACKET_ALIGNMENT`]. Arenas smaller than
    /// [`MIN_ARENA_SIZE`] are refused with [`NetError::NotEnoughSpace`].
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let size = config
            .arena_size
            .checked_next_multiple_of(PACKET_ALIGNMENT)
            .filter(|&size| u32::try_from(size).is_ok())
            .ok_or(NetError::Misuse {
                reason: "arena size exceeds 32-bit offsets",
            })?;
        if size < MIN_ARENA_SIZE {
            return Err(NetError::NotEnoughSpace {
                required: MIN_ARENA_SIZE,
            });
        }

        debug!(size, "allocating packet arena");
        Ok(Self {
            arena: vec![0u8; size].into_boxed_slice(),
            cursors: Cursors::default(),
            policy: config.invariant_policy,
            stats: RingStats::default(),
        })
    }

    /// Arena size in bytes
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    /// Bytes held by live records
    #[must_use]
    pub const fn used(&self) -> usize {
        self.cursors.used
    }

    /// Bytes outside the live region
    #[must_use]
    pub fn free(&self) -> usize {
        self.capacity() - self.cursors.used
    }

    /// Whether the live region is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cursors.used == 0
    }

    /// Whether a staged datagram awaits processing
    #[must_use]
    pub const fn has_staged(&self) -> bool {
        self.cursors.process != self.cursors.pending_read
    }

    /// Whether records await transmission
    #[must_use]
    pub const fn has_outbound(&self) -> bool {
        self.cursors.send != self.cursors.process
    }

    /// Current cursor positions
    #[must_use]
    pub const fn cursors(&self) -> Cursors {
        self.cursors
    }

    /// Packet counters
    #[must_use]
    pub const fn stats(&self) -> RingStats {
        self.stats
    }

    /// Invariant policy in force
    #[must_use]
    pub const fn policy(&self) -> InvariantPolicy {
        self.policy
    }

    /// Queue `packet` for `destination`, returning the frame size.
    ///
    /// The packet is placed immediately below the read boundary, wrapping once
    /// to the top of the arena when it does not fit there, and joins the send
    /// chain ahead of every staged datagram. Nothing changes if the packet
    /// fails to encode or `destination` names an id no mask byte can hold.
    pub fn enqueue<P: WirePacket>(&mut self, packet: &P, destination: Destination) -> Result<usize> {
        if !destination.is_addressable() {
            debug!(%destination, "destination id out of range");
            return Err(NetError::invalid_data("destination id out of range"));
        }
        self.reclaim()?;

        let size = packet.wire_size();
        let slot = SLOT_HEADER + align_up(size);
        let boundary = self.cursors.read_boundary;
        let wraps = boundary < slot;
        let gap = if wraps { boundary } else { 0 };
        let required = slot + gap;
        if required >= self.free() {
            self.stats.space_exhausted += 1;
            debug!(required, free = self.free(), tag = %P::TAG, "no room to enqueue");
            return Err(NetError::NotEnoughSpace { required });
        }

        let start = if wraps {
            self.capacity() - slot
        } else {
            boundary - slot
        };
        let payload_at = start + SLOT_HEADER;
        let written = match packet.encode(&mut self.arena[payload_at..payload_at + size]) {
            Ok(written) => written,
            Err(NetError::NotEnoughSpace { .. }) => {
                return Err(self.policy.violation("reserved slot smaller than the wire size"));
            }
            Err(err) => return Err(err),
        };

        self.arena[start + TAG_OFFSET..payload_at].copy_from_slice(&P::TAG.to_be_bytes());
        if gap > 0 {
            self.store(0, &Control::filler(offset(gap), false));
        }
        let record = Control {
            kind: RecordKind::Packet,
            peer: destination.mask(),
            flags: RecordFlags::default().with(RecordFlags::LINKED),
            payload_len: offset(written),
            next_read: offset(slot),
            next_send: offset(self.forward(start, self.cursors.process)),
        };
        self.store(start, &record);

        match self.cursors.send_tail {
            Some(tail) => {
                let mut tail_record = self.control(tail)?;
                tail_record.next_send = offset(self.forward(tail, start));
                self.store(tail, &tail_record);
            }
            None => self.cursors.send = start,
        }
        self.cursors.send_tail = Some(start);
        self.cursors.read_boundary = start;
        self.cursors.used += required;
        self.stats.enqueued += 1;

        trace!(at = start, slot, gap, tag = %P::TAG, %destination, "enqueued");
        Ok(TAG_SIZE + written)
    }

    /// Stage one datagram from `reader`, returning the bytes received.
    ///
    /// A worst-case slot is reserved at the pending-read cursor, wrapping to
    /// the start of the arena behind a filler when the tail is too short. The
    /// reader writes tag and payload in place. If it fails, or delivers less
    /// than a tag, every cursor is restored to its value on entry.
    pub fn read_packet<R>(&mut self, reader: &mut R) -> Result<usize>
    where
        R: PacketReader + ?Sized,
    {
        let entry = self.cursors;
        self.reclaim()?;
        let reclaimed = entry.used - self.cursors.used;

        let at = self.cursors.pending_read;
        let filler = if at + INBOUND_SLOT > self.capacity() {
            self.capacity() - at
        } else {
            0
        };
        let needed = filler + INBOUND_SLOT;
        if needed >= self.free() {
            self.stats.space_exhausted += 1;
            debug!(needed, free = self.free(), "no room for an inbound slot");
            return Err(NetError::NotEnoughSpace { required: needed });
        }

        let start = if filler > 0 { 0 } else { at };
        let window = start + TAG_OFFSET..start + INBOUND_SLOT;
        let window_len = window.len();
        let outcome = match reader.read(&mut self.arena[window]) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.rollback(entry, reclaimed);
                return Err(err);
            }
        };
        let rejected = if outcome.bytes < TAG_SIZE {
            debug!(bytes = outcome.bytes, "datagram shorter than a tag");
            Some("datagram shorter than a tag")
        } else if outcome.bytes > window_len {
            Some("reader reported more bytes than its buffer")
        } else if outcome.sender & Destination::UNICAST_BIT != 0 {
            Some("sender id out of range")
        } else {
            None
        };
        if let Some(reason) = rejected {
            self.rollback(entry, reclaimed);
            return Err(NetError::invalid_data(reason));
        }

        if filler > 0 {
            self.store(at, &Control::filler(offset(filler), true));
        }
        let payload_len = outcome.bytes - TAG_SIZE;
        let span = SLOT_HEADER + align_up(payload_len);
        let mut flags = RecordFlags::default().with(RecordFlags::LINKED);
        if outcome.admission == Admission::Candidate {
            flags = flags.with(RecordFlags::CANDIDATE);
        }
        self.store(
            start,
            &Control::packet(outcome.sender, flags, offset(payload_len), offset(span)),
        );
        self.cursors.used += filler + span;
        self.cursors.pending_read = self.wrap(start + span);
        self.stats.received += 1;

        trace!(at = start, bytes = outcome.bytes, sender = outcome.sender, filler, "staged");
        self.settle_process()?;
        Ok(outcome.bytes)
    }

    /// View the staged datagram at the process cursor.
    pub fn extract_current(&self) -> Result<PacketView<'_>> {
        let at = self.cursors.process;
        if at == self.cursors.pending_read {
            return Err(self.policy.violation("no staged packet to extract"));
        }
        let record = self.control(at)?;
        if record.kind != RecordKind::Packet {
            return Err(self.policy.violation("current record is not a packet"));
        }

        let payload_at = at + SLOT_HEADER;
        let tag = (&self.arena[at + TAG_OFFSET..payload_at]).get_u32();
        Ok(PacketView {
            tag,
            payload: &self.arena[payload_at..payload_at + record.payload_len as usize],
            peer: record.peer,
            candidate: record.is_candidate(),
        })
    }

    /// Retire the current datagram so it is not relayed. Links are untouched.
    pub fn drop_current(&mut self) -> Result<()> {
        let at = self.cursors.process;
        if at == self.cursors.pending_read {
            return Err(self.policy.violation("no staged packet to drop"));
        }
        let mut record = self.control(at)?;
        if record.kind == RecordKind::Packet {
            record.kind = RecordKind::Skip;
            self.store(at, &record);
            self.stats.dropped += 1;
            trace!(at, "dropped");
        }
        Ok(())
    }

    /// Move the process cursor to the next staged datagram.
    ///
    /// The finished record stays on the send chain: relayed to everyone but
    /// its sender, or stepped over if it was dropped.
    pub fn finish_processing(&mut self) -> Result<()> {
        let at = self.cursors.process;
        if at == self.cursors.pending_read {
            return Err(self.policy.violation("no staged packet to finish"));
        }
        let record = self.control(at)?;
        self.cursors.process = self.wrap(at + record.next_send as usize);
        self.cursors.send_tail = Some(at);
        self.settle_process()
    }

    /// Sender id of the current datagram.
    pub fn sender_id(&self) -> Result<u8> {
        let at = self.cursors.process;
        if at == self.cursors.pending_read {
            return Err(NetError::invalid_data("no staged packet"));
        }
        let record = self.control(at)?;
        if record.kind != RecordKind::Packet {
            return Err(NetError::invalid_data("current record is not a packet"));
        }
        Ok(record.peer)
    }

    /// Transmit the record at the send cursor.
    ///
    /// Returns the writer's byte count for a packet, `1` for a retired record
    /// that was stepped over, and `0` when nothing is ready. A writer error
    /// leaves the packet queued.
    pub fn flush_one<W>(&mut self, writer: &mut W) -> Result<usize>
    where
        W: PacketWriter + ?Sized,
    {
        Ok(match self.flush_step(writer)? {
            Flushed::Idle => 0,
            Flushed::Sent(written) => written,
            Flushed::Skipped => 1,
        })
    }

    /// Drain the send queue, returning the number of datagrams written.
    pub fn flush_all<W>(&mut self, writer: &mut W) -> Result<usize>
    where
        W: PacketWriter + ?Sized,
    {
        let mut datagrams = 0;
        loop {
            match self.flush_step(writer)? {
                Flushed::Idle => return Ok(datagrams),
                Flushed::Sent(_) => datagrams += 1,
                Flushed::Skipped => {}
            }
        }
    }

    fn flush_step<W>(&mut self, writer: &mut W) -> Result<Flushed>
    where
        W: PacketWriter + ?Sized,
    {
        let at = self.cursors.send;
        if at == self.cursors.process {
            return Ok(Flushed::Idle);
        }

        let mut record = self.control(at)?;
        let flushed = match record.kind {
            RecordKind::Packet => {
                let end = at + SLOT_HEADER + record.payload_len as usize;
                let destination = Destination::from_mask(record.peer);
                let written = writer.write(&self.arena[at + TAG_OFFSET..end], destination)?;
                record.kind = RecordKind::Skip;
                self.stats.sent += 1;
                trace!(at, written, %destination, "sent");
                Flushed::Sent(written)
            }
            RecordKind::Skip => {
                self.stats.skipped += 1;
                trace!(at, "stepped over retired record");
                Flushed::Skipped
            }
        };

        record.flags = record.flags.without(RecordFlags::LINKED);
        self.store(at, &record);
        self.cursors.send = self.wrap(at + record.next_send as usize);
        if self.cursors.send == self.cursors.process {
            self.cursors.send_tail = None;
        }
        Ok(flushed)
    }

    /// Release unlinked retired records at the read boundary.
    fn reclaim(&mut self) -> Result<()> {
        while self.cursors.used > 0 {
            let at = self.cursors.read_boundary;
            let record = self.control(at)?;
            if record.kind != RecordKind::Skip || record.is_linked() {
                break;
            }
            let span = record.next_read as usize;
            if span == 0 || span > self.cursors.used {
                return Err(self.policy.violation("retired record overruns the live region"));
            }
            self.cursors.read_boundary = self.wrap(at + span);
            self.cursors.used -= span;
            trace!(at, span, "reclaimed");
        }

        if self.cursors.used == 0 && self.cursors != Cursors::default() {
            trace!("ring empty, cursors reset");
            self.cursors = Cursors::default();
        }
        Ok(())
    }

    /// Put the cursors back to `entry` after a failed read.
    ///
    /// Space released by the leading reclamation may already hold reader
    /// bytes, so it is re-covered by one retired filler spanning all of it.
    fn rollback(&mut self, entry: Cursors, reclaimed: usize) {
        if reclaimed > 0 {
            self.store(entry.read_boundary, &Control::filler(offset(reclaimed), false));
        }
        self.cursors = entry;
        trace!(reclaimed, "read rolled back");
    }

    /// Step the process cursor over wrap fillers so it rests on a packet or at
    /// the pending-read cursor.
    fn settle_process(&mut self) -> Result<()> {
        while self.cursors.process != self.cursors.pending_read {
            let at = self.cursors.process;
            let mut record = self.control(at)?;
            if !(record.kind == RecordKind::Skip && record.is_filler()) {
                break;
            }
            self.cursors.process = self.wrap(at + record.next_send as usize);
            if self.cursors.send == at {
                record.flags = record.flags.without(RecordFlags::LINKED);
                self.store(at, &record);
                self.cursors.send = self.cursors.process;
            } else {
                self.cursors.send_tail = Some(at);
            }
        }
        Ok(())
    }

    fn control(&self, at: usize) -> Result<Control> {
        Control::read(&self.arena, at).ok_or_else(|| self.policy.violation("corrupt control record"))
    }

    fn store(&mut self, at: usize, record: &Control) {
        record.write(&mut self.arena, at);
    }

    fn wrap(&self, pos: usize) -> usize {
        if pos >= self.capacity() {
            pos - self.capacity()
        } else {
            pos
        }
    }

    /// Forward distance from `from` to `to` around the ring.
    fn forward(&self, from: usize, to: usize) -> usize {
        (to + self.capacity() - from) % self.capacity()
    }
}

/// Narrow an in-arena distance. The arena never exceeds `u32::MAX` bytes.
#[allow(clippy::cast_possible_truncation)]
const fn offset(distance: usize) -> u32 {
    distance as u32
}

impl fmt::Debug for PacketHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketHolder")
            .field("capacity", &self.capacity())
            .field("cursors", &self.cursors)
            .field("policy", &self.policy)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Ack, PlayerPosition, TimeQuery};
    use crate::transport::ReadOutcome;
    use std::collections::VecDeque;
    use std::io;

    #[derive(Default)]
    struct ScriptedReader {
        datagrams: VecDeque<(Vec<u8>, u8, Admission)>,
        overreport: bool,
    }

    impl ScriptedReader {
        fn push(&mut self, frame: &[u8], sender: u8) {
            self.datagrams
                .push_back((frame.to_vec(), sender, Admission::Active));
        }
    }

    impl PacketReader for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
            let Some((frame, sender, admission)) = self.datagrams.pop_front() else {
                return Err(io::Error::from(io::ErrorKind::WouldBlock).into());
            };
            buf[..frame.len()].copy_from_slice(&frame);
            let bytes = if self.overreport {
                buf.len() + 1
            } else {
                frame.len()
            };
            Ok(ReadOutcome {
                bytes,
                sender,
                admission,
            })
        }
    }

    #[derive(Default)]
    struct RecordingWriter {
        sent: Vec<(Vec<u8>, Destination)>,
    }

    impl PacketWriter for RecordingWriter {
        fn write(&mut self, frame: &[u8], destination: Destination) -> Result<usize> {
            self.sent.push((frame.to_vec(), destination));
            Ok(frame.len())
        }
    }

    fn ack_frame(seq_num: u32) -> Vec<u8> {
        let mut frame = vec![0, 0, 0, 1];
        frame.extend_from_slice(&seq_num.to_be_bytes());
        frame
    }

    fn holder(arena_size: usize) -> PacketHolder {
        let config = EngineConfig::default()
            .with_arena_size(arena_size)
            .with_invariant_policy(InvariantPolicy::Report);
        PacketHolder::new(&config).unwrap()
    }

    #[test]
    fn test_arena_sizing() {
        let err = PacketHolder::new(&EngineConfig::default().with_arena_size(100)).unwrap_err();
        assert!(matches!(err, NetError::NotEnoughSpace { required } if required == MIN_ARENA_SIZE));

        assert_eq!(holder(MIN_ARENA_SIZE - 1).capacity(), MIN_ARENA_SIZE);
        assert_eq!(
            PacketHolder::new(&EngineConfig::default()).unwrap().capacity(),
            EngineConfig::default().arena_size
        );
    }

    #[test]
    fn test_enqueue_then_flush_once() {
        let mut ring = holder(MIN_ARENA_SIZE);
        let mut writer = RecordingWriter::default();

        let len = ring
            .enqueue(&Ack { seq_num: 7 }, Destination::Broadcast)
            .unwrap();
        assert_eq!(len, 8);

        assert_eq!(ring.flush_one(&mut writer).unwrap(), 8);
        assert_eq!(writer.sent, vec![(ack_frame(7), Destination::Broadcast)]);

        assert_eq!(ring.flush_one(&mut writer).unwrap(), 0);
        assert_eq!(writer.sent.len(), 1);
    }

    #[test]
    fn test_fifo_drain() {
        let mut ring = holder(MIN_ARENA_SIZE);
        for seq_num in 1..=3 {
            ring.enqueue(&Ack { seq_num }, Destination::To(seq_num as u8))
                .unwrap();
        }

        let mut writer = RecordingWriter::default();
        assert_eq!(ring.flush_all(&mut writer).unwrap(), 3);
        let order: Vec<_> = writer.sent.iter().map(|(frame, _)| frame[7]).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(writer.sent[1].1, Destination::To(2));
        assert!(!ring.has_outbound());
    }

    #[test]
    fn test_short_read_keeps_cursors() {
        let mut ring = holder(MIN_ARENA_SIZE);
        let mut reader = ScriptedReader::default();
        reader.push(&[0, 0, 1], 2);

        let before = ring.cursors();
        let err = ring.read_packet(&mut reader).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidData);
        assert_eq!(ring.cursors(), before);
    }

    #[test]
    fn test_reader_error_keeps_cursors() {
        let mut ring = holder(EngineConfig::default().arena_size);
        ring.enqueue(&Ack { seq_num: 1 }, Destination::Broadcast)
            .unwrap();
        let before = ring.cursors();

        let err = ring.read_packet(&mut ScriptedReader::default()).unwrap_err();
        assert!(err.is_transient());
        assert_eq!(ring.cursors(), before);
    }

    #[test]
    fn test_overlong_read_rejected() {
        let mut ring = holder(MIN_ARENA_SIZE);
        let mut reader = ScriptedReader {
            overreport: true,
            ..ScriptedReader::default()
        };
        reader.push(&ack_frame(1), 2);

        let before = ring.cursors();
        let err = ring.read_packet(&mut reader).unwrap_err();
        assert!(matches!(err, NetError::InvalidData { .. }));
        assert_eq!(ring.cursors(), before);
    }

    #[test]
    fn test_short_read_after_reclaim_keeps_cursors() {
        let mut ring = holder(EngineConfig::default().arena_size);
        let mut writer = RecordingWriter::default();
        ring.enqueue(&Ack { seq_num: 7 }, Destination::Broadcast)
            .unwrap();
        ring.flush_all(&mut writer).unwrap();
        let before = ring.cursors();
        assert!(before.used > 0);

        let mut reader = ScriptedReader::default();
        reader.push(&[0, 0, 1], 2);
        let err = ring.read_packet(&mut reader).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidData);
        assert_eq!(ring.cursors(), before);

        // The retired Ack is still reclaimable and the ring keeps working.
        reader.push(&ack_frame(9), 2);
        ring.read_packet(&mut reader).unwrap();
        assert_eq!(ring.extract_current().unwrap().payload, &[0, 0, 0, 9]);
        ring.finish_processing().unwrap();
        assert_eq!(ring.flush_all(&mut writer).unwrap(), 1);
        assert_eq!(writer.sent[1], (ack_frame(9), Destination::AllExcept(2)));
    }

    #[test]
    fn test_reader_error_after_reclaim_keeps_cursors() {
        let mut ring = holder(MIN_ARENA_SIZE);
        let mut writer = RecordingWriter::default();
        let mut reader = ScriptedReader::default();
        reader.push(&ack_frame(3), 1);
        ring.read_packet(&mut reader).unwrap();
        ring.finish_processing().unwrap();
        ring.flush_all(&mut writer).unwrap();
        let before = ring.cursors();

        let err = ring.read_packet(&mut reader).unwrap_err();
        assert!(err.is_transient());
        assert_eq!(ring.cursors(), before);
    }

    #[test]
    fn test_stage_extract_and_relay() {
        let mut ring = holder(MIN_ARENA_SIZE);
        let mut reader = ScriptedReader::default();
        reader.push(&ack_frame(42), 5);

        assert_eq!(ring.read_packet(&mut reader).unwrap(), 8);
        assert!(ring.has_staged());
        assert_eq!(ring.sender_id().unwrap(), 5);

        let view = ring.extract_current().unwrap();
        assert_eq!(view.tag, 1);
        assert_eq!(view.payload, &42u32.to_be_bytes());
        assert_eq!(view.peer, 5);
        assert!(!view.candidate);

        let mut writer = RecordingWriter::default();
        assert_eq!(ring.flush_one(&mut writer).unwrap(), 0);

        ring.finish_processing().unwrap();
        assert!(!ring.has_staged());
        assert_eq!(ring.flush_all(&mut writer).unwrap(), 1);
        assert_eq!(writer.sent, vec![(ack_frame(42), Destination::AllExcept(5))]);
    }

    #[test]
    fn test_dropped_packet_not_relayed() {
        let mut ring = holder(MIN_ARENA_SIZE);
        let mut reader = ScriptedReader::default();
        reader.push(&ack_frame(1), 3);
        ring.read_packet(&mut reader).unwrap();

        ring.drop_current().unwrap();
        assert!(ring.extract_current().is_err());
        assert!(matches!(ring.sender_id(), Err(NetError::InvalidData { .. })));
        ring.finish_processing().unwrap();

        let mut writer = RecordingWriter::default();
        assert_eq!(ring.flush_one(&mut writer).unwrap(), 1);
        assert_eq!(ring.flush_one(&mut writer).unwrap(), 0);
        assert!(writer.sent.is_empty());

        let stats = ring.stats();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_drop_survives_interleaved_read() {
        let mut ring = holder(EngineConfig::default().arena_size);
        let mut reader = ScriptedReader::default();
        reader.push(&ack_frame(1), 1);
        reader.push(&ack_frame(2), 2);

        ring.read_packet(&mut reader).unwrap();
        ring.drop_current().unwrap();
        ring.read_packet(&mut reader).unwrap();
        ring.finish_processing().unwrap();

        assert_eq!(ring.sender_id().unwrap(), 2);
    }

    #[test]
    fn test_enqueued_packets_precede_staged() {
        let mut ring = holder(EngineConfig::default().arena_size);
        let mut reader = ScriptedReader::default();
        reader.push(&ack_frame(100), 4);
        ring.read_packet(&mut reader).unwrap();

        ring.enqueue(&Ack { seq_num: 1 }, Destination::To(4))
            .unwrap();
        let mut writer = RecordingWriter::default();
        assert_eq!(ring.flush_all(&mut writer).unwrap(), 1);
        assert_eq!(writer.sent[0], (ack_frame(1), Destination::To(4)));

        ring.finish_processing().unwrap();
        ring.enqueue(&Ack { seq_num: 2 }, Destination::Broadcast)
            .unwrap();
        assert_eq!(ring.flush_all(&mut writer).unwrap(), 2);
        assert_eq!(writer.sent[1], (ack_frame(100), Destination::AllExcept(4)));
        assert_eq!(writer.sent[2], (ack_frame(2), Destination::Broadcast));
    }

    #[test]
    fn test_candidate_flag_propagates() {
        let mut ring = holder(MIN_ARENA_SIZE);
        let mut reader = ScriptedReader::default();
        reader
            .datagrams
            .push_back((ack_frame(1), 6, Admission::Candidate));
        ring.read_packet(&mut reader).unwrap();
        assert!(ring.extract_current().unwrap().candidate);
    }

    #[test]
    fn test_inbound_space_exhaustion_recovers() {
        let mut ring = holder(MIN_ARENA_SIZE);
        let mut reader = ScriptedReader::default();
        reader.push(&ack_frame(1), 1);
        reader.push(&ack_frame(2), 1);

        ring.read_packet(&mut reader).unwrap();
        let err = ring.read_packet(&mut reader).unwrap_err();
        assert!(matches!(err, NetError::NotEnoughSpace { .. }));
        assert!(err.byte_count() >= INBOUND_SLOT);
        assert_eq!(ring.stats().space_exhausted, 1);

        ring.drop_current().unwrap();
        ring.finish_processing().unwrap();
        ring.flush_all(&mut RecordingWriter::default()).unwrap();

        assert_eq!(ring.read_packet(&mut reader).unwrap(), 8);
    }

    #[test]
    fn test_outbound_capacity() {
        let mut ring = holder(MIN_ARENA_SIZE);
        let slot = SLOT_HEADER + align_up(PlayerPosition::WIRE_SIZE);
        let fits = (MIN_ARENA_SIZE - 1) / slot;

        for _ in 0..fits {
            ring.enqueue(&PlayerPosition::default(), Destination::Broadcast)
                .unwrap();
        }
        let err = ring
            .enqueue(&PlayerPosition::default(), Destination::Broadcast)
            .unwrap_err();
        assert!(matches!(err, NetError::NotEnoughSpace { required } if required == slot));

        let mut writer = RecordingWriter::default();
        assert_eq!(ring.flush_all(&mut writer).unwrap(), fits);
        ring.enqueue(&PlayerPosition::default(), Destination::Broadcast)
            .unwrap();
    }

    #[test]
    fn test_encode_failure_leaves_ring_untouched() {
        let mut ring = holder(MIN_ARENA_SIZE);
        ring.enqueue(&Ack { seq_num: 1 }, Destination::Broadcast)
            .unwrap();
        let before = ring.cursors();

        let err = ring
            .enqueue(&TimeQuery::default(), Destination::Broadcast)
            .unwrap_err();
        assert!(matches!(err, NetError::Misuse { .. }));
        assert_eq!(ring.cursors(), before);
    }

    #[test]
    fn test_enqueue_wraps_behind_filler() {
        let arena = 2 * INBOUND_SLOT + PACKET_ALIGNMENT;
        let mut ring = holder(arena);
        let mut reader = ScriptedReader::default();
        let mut writer = RecordingWriter::default();
        reader.push(&ack_frame(1), 1);
        reader.push(&ack_frame(2), 2);

        ring.read_packet(&mut reader).unwrap();
        ring.read_packet(&mut reader).unwrap();
        ring.finish_processing().unwrap();
        assert_eq!(ring.flush_all(&mut writer).unwrap(), 1);

        // The relayed record is reclaimed, leaving the boundary one small slot in.
        ring.enqueue(&PlayerPosition::default(), Destination::Broadcast)
            .unwrap();
        let slot = SLOT_HEADER + align_up(PlayerPosition::WIRE_SIZE);
        let cursors = ring.cursors();
        assert_eq!(cursors.read_boundary, arena - slot);
        assert_eq!(cursors.used, 48 + slot + 48);

        assert_eq!(ring.flush_all(&mut writer).unwrap(), 1);
        assert_eq!(writer.sent[1].0.len(), TAG_SIZE + PlayerPosition::WIRE_SIZE);

        ring.finish_processing().unwrap();
        assert_eq!(ring.flush_all(&mut writer).unwrap(), 1);
        ring.enqueue(&Ack { seq_num: 3 }, Destination::Broadcast)
            .unwrap();
        assert_eq!(ring.used(), 48);
    }

    #[test]
    fn test_inbound_wraps_behind_filler() {
        let mut ring = holder(2528);
        let mut reader = ScriptedReader::default();
        let mut writer = RecordingWriter::default();
        let mut full = ack_frame(0);
        full.resize(TAG_SIZE + crate::protocol::MAX_PACKET_SIZE, 0xEE);
        reader.push(&full, 1);
        reader.push(&ack_frame(1), 1);
        reader.push(&ack_frame(2), 2);
        reader.push(&ack_frame(3), 3);

        for _ in 0..3 {
            ring.read_packet(&mut reader).unwrap();
        }
        for _ in 0..2 {
            ring.drop_current().unwrap();
            ring.finish_processing().unwrap();
        }
        assert_eq!(ring.flush_all(&mut writer).unwrap(), 0);

        // Too close to the end for a full slot: the datagram lands at zero.
        ring.read_packet(&mut reader).unwrap();
        let cursors = ring.cursors();
        assert_eq!(cursors.read_boundary, 1280);
        assert_eq!(cursors.pending_read, 48);
        assert_eq!(ring.sender_id().unwrap(), 2);

        ring.finish_processing().unwrap();
        assert_eq!(ring.sender_id().unwrap(), 3);
        ring.finish_processing().unwrap();
        assert!(!ring.has_staged());

        assert_eq!(ring.flush_all(&mut writer).unwrap(), 2);
        let destinations: Vec<_> = writer.sent.iter().map(|(_, dest)| *dest).collect();
        assert_eq!(
            destinations,
            vec![Destination::AllExcept(2), Destination::AllExcept(3)]
        );
    }

    #[test]
    fn test_empty_ring_resets_cursors() {
        let mut ring = holder(MIN_ARENA_SIZE);
        let mut writer = RecordingWriter::default();
        ring.enqueue(&Ack { seq_num: 1 }, Destination::Broadcast)
            .unwrap();
        ring.flush_all(&mut writer).unwrap();
        assert!(!ring.is_empty());

        let mut reader = ScriptedReader::default();
        reader.push(&ack_frame(9), 1);
        ring.read_packet(&mut reader).unwrap();
        let cursors = ring.cursors();
        assert_eq!(cursors.read_boundary, 0);
        assert_eq!(cursors.send, 0);
        assert_eq!(cursors.used, 48);
    }

    #[test]
    fn test_report_policy_on_empty_extract() {
        let mut ring = holder(MIN_ARENA_SIZE);
        assert!(matches!(
            ring.extract_current(),
            Err(NetError::InvalidState { .. })
        ));
        assert!(matches!(
            ring.finish_processing(),
            Err(NetError::InvalidState { .. })
        ));
        assert!(matches!(ring.sender_id(), Err(NetError::InvalidData { .. })));
    }

    #[test]
    #[should_panic(expected = "ring invariant violated")]
    fn test_abort_policy_on_empty_extract() {
        let config = EngineConfig::default().with_invariant_policy(InvariantPolicy::Abort);
        let ring = PacketHolder::new(&config).unwrap();
        let _ = ring.extract_current();
    }

    #[test]
    fn test_unaddressable_destination_rejected() {
        let mut ring = holder(MIN_ARENA_SIZE);
        for destination in [Destination::To(0x7F), Destination::To(200), Destination::AllExcept(200)] {
            let err = ring.enqueue(&Ack { seq_num: 1 }, destination).unwrap_err();
            assert!(matches!(err, NetError::InvalidData { .. }));
        }
        assert!(ring.is_empty());
        assert_eq!(ring.stats().enqueued, 0);
    }

    #[test]
    fn test_out_of_range_sender_rejected() {
        let mut ring = holder(MIN_ARENA_SIZE);
        let mut reader = ScriptedReader::default();
        reader.push(&ack_frame(1), 0x80);
        assert!(matches!(
            ring.read_packet(&mut reader),
            Err(NetError::InvalidData { .. })
        ));
        assert!(!ring.has_staged());
    }
}
