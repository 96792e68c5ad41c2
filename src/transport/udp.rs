//! UDP transport over a connection table

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tracing::{debug, instrument, trace};

use super::{ConnectionTable, PacketReader, PacketWriter, ReadOutcome, SocketBinding};
use crate::protocol::{Destination, Result};

/// Default server port
pub const DEFAULT_PORT: u16 = 5000;

/// Transport configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransportConfig {
    /// Local address to bind.
    pub bind_addr: SocketAddr,
    /// Number of connection slots.
    pub connection_slots: usize,
    /// Optional read timeout for blocking sockets.
    pub read_timeout: Option<Duration>,
    /// Optional write timeout for blocking sockets.
    pub write_timeout: Option<Duration>,
    /// Whether reads return immediately when no datagram is queued.
    pub nonblocking: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            connection_slots: 8,
            read_timeout: None,
            write_timeout: None,
            nonblocking: false,
        }
    }
}

impl TransportConfig {
    /// Client configuration bound to an ephemeral port.
    #[must_use]
    pub fn client() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            connection_slots: 1,
            ..Self::default()
        }
    }
}

/// UDP socket plus the table resolving its peers.
#[derive(Debug)]
pub struct UdpTransport {
    socket: SocketBinding,
    connections: ConnectionTable,
}

impl UdpTransport {
    /// Bind a server endpoint.
    pub fn bind(config: &TransportConfig) -> Result<Self> {
        let socket = SocketBinding::bind(config)?;
        debug!(addr = %socket.local_addr()?, slots = config.connection_slots, "transport bound");
        Ok(Self {
            socket,
            connections: ConnectionTable::new(config.connection_slots),
        })
    }

    /// Bind a client endpoint with `server` pre-admitted as connection 0.
    pub fn connect(config: &TransportConfig, server: SocketAddr) -> Result<Self> {
        let mut transport = Self::bind(config)?;
        let id = transport.connections.admit(server)?;
        debug!(id, %server, "server admitted");
        Ok(transport)
    }

    /// Local socket address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Connection table
    #[must_use]
    pub const fn connections(&self) -> &ConnectionTable {
        &self.connections
    }

    /// Mutable connection table, for promotion and purging
    pub fn connections_mut(&mut self) -> &mut ConnectionTable {
        &mut self.connections
    }
}

impl PacketReader for UdpTransport {
    #[instrument(level = "trace", skip(self, buf))]
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let (bytes, addr) = self.socket.recv_datagram(buf)?;
        let (sender, admission) = self.connections.resolve(addr).inspect_err(|_| {
            debug!(%addr, "datagram from filtered sender");
        })?;
        trace!(bytes, sender, ?admission, "datagram received");
        Ok(ReadOutcome {
            bytes,
            sender,
            admission,
        })
    }
}

impl PacketWriter for UdpTransport {
    /// Fan the frame out to every recipient. Per-peer send failures are logged
    /// and skipped so one unreachable peer cannot stall the queue.
    #[instrument(level = "trace", skip(self, frame))]
    fn write(&mut self, frame: &[u8], destination: Destination) -> Result<usize> {
        for addr in self.connections.recipients(destination) {
            if let Err(err) = self.socket.send_datagram(frame, addr) {
                debug!(%addr, error = %err, "send failed");
            }
        }
        Ok(frame.len())
    }
}
