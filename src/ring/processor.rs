//! Engine front-end pairing a holder with a packet factory

use super::{EngineConfig, PacketHolder, RingStats};
use crate::protocol::{ConstructPacket, Destination, PacketFactory, Result, WirePacket};
use crate::transport::{PacketReader, PacketWriter};

/// Ring engine that decodes staged datagrams through a [`ConstructPacket`]
/// implementation.
#[derive(Debug)]
pub struct PacketProcessor<F = PacketFactory> {
    holder: PacketHolder,
    factory: F,
}

impl<F: ConstructPacket + Default> PacketProcessor<F> {
    /// Create an engine with a default factory
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self::with_factory(PacketHolder::new(config)?, F::default()))
    }
}

impl<F: ConstructPacket> PacketProcessor<F> {
    /// Wrap an existing holder
    #[must_use]
    pub const fn with_factory(holder: PacketHolder, factory: F) -> Self {
        Self { holder, factory }
    }

    /// Decode the datagram at the process cursor.
    ///
    /// Datagrams from candidate senders go through the factory in candidate
    /// mode, which rejects everything but the handshake opener.
    pub fn process_packet(&mut self) -> Result<F::Output> {
        let view = self.holder.extract_current()?;
        self.factory.set_candidate_mode(view.candidate);
        let constructed = self.factory.construct(view.tag, view.payload);
        self.factory.set_candidate_mode(false);
        constructed
    }

    /// See [`PacketHolder::read_packet`].
    pub fn read_packet<R: PacketReader + ?Sized>(&mut self, reader: &mut R) -> Result<usize> {
        self.holder.read_packet(reader)
    }

    /// See [`PacketHolder::drop_current`].
    pub fn drop_current(&mut self) -> Result<()> {
        self.holder.drop_current()
    }

    /// See [`PacketHolder::finish_processing`].
    pub fn finish_processing(&mut self) -> Result<()> {
        self.holder.finish_processing()
    }

    /// See [`PacketHolder::sender_id`].
    pub fn sender_id(&self) -> Result<u8> {
        self.holder.sender_id()
    }

    /// See [`PacketHolder::enqueue`].
    pub fn enqueue<P: WirePacket>(&mut self, packet: &P, destination: Destination) -> Result<usize> {
        self.holder.enqueue(packet, destination)
    }

    /// See [`PacketHolder::flush_one`].
    pub fn flush_one<W: PacketWriter + ?Sized>(&mut self, writer: &mut W) -> Result<usize> {
        self.holder.flush_one(writer)
    }

    /// See [`PacketHolder::flush_all`].
    pub fn flush_all<W: PacketWriter + ?Sized>(&mut self, writer: &mut W) -> Result<usize> {
        self.holder.flush_all(writer)
    }

    /// Whether a staged datagram awaits processing
    #[must_use]
    pub const fn has_staged(&self) -> bool {
        self.holder.has_staged()
    }

    /// Packet counters
    #[must_use]
    pub const fn stats(&self) -> RingStats {
        self.holder.stats()
    }

    /// Underlying holder
    #[must_use]
    pub const fn holder(&self) -> &PacketHolder {
        &self.holder
    }

    /// Underlying factory
    #[must_use]
    pub const fn factory(&self) -> &F {
        &self.factory
    }
}
