//! Datagram transport
//!
//! The ring engine talks to the network only through [`PacketReader`] and
//! [`PacketWriter`]. [`UdpTransport`] implements both over a blocking or
//! non-blocking UDP socket, resolving peers through a [`ConnectionTable`].

mod connection;
mod socket;
mod udp;

pub use connection::{ConnectionTable, SlotState};
pub use socket::SocketBinding;
pub use udp::{TransportConfig, UdpTransport};

use crate::protocol::{Destination, Result};

/// Admission state of a datagram's sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Admission {
    /// Established connection
    Active,
    /// Provisionally admitted, pending handshake
    Candidate,
}

/// Result of one successful read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes written into the buffer, tag included
    pub bytes: usize,
    /// Connection id of the sender
    pub sender: u8,
    /// Whether the sender is active or a candidate
    pub admission: Admission,
}

/// Source of inbound datagrams.
pub trait PacketReader {
    /// Receive one datagram into `buf`.
    ///
    /// Rejected senders surface as [`NetError::Filtered`](crate::NetError::Filtered),
    /// OS failures as [`NetError::Io`](crate::NetError::Io).
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome>;
}

/// Sink for outbound datagrams.
pub trait PacketWriter {
    /// Send `frame` (`[tag][payload]`) to `destination`, returning the bytes
    /// accepted.
    fn write(&mut self, frame: &[u8], destination: Destination) -> Result<usize>;
}

impl<T: PacketReader + ?Sized> PacketReader for &mut T {
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        (**self).read(buf)
    }
}

impl<T: PacketWriter + ?Sized> PacketWriter for &mut T {
    fn write(&mut self, frame: &[u8], destination: Destination) -> Result<usize> {
        (**self).write(frame, destination)
    }
}
