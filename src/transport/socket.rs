//! Minimal UDP socket wrapper for the ringwire transport.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread;

use tracing::trace;

use super::TransportConfig;
use crate::protocol::Result;

/// Binding for a UDP socket.
#[derive(Debug, Clone)]
pub struct SocketBinding {
    socket: Arc<UdpSocket>,
    nonblocking: bool,
}

impl SocketBinding {
    /// Bind to `config.bind_addr` and apply its timeouts and blocking mode.
    pub fn bind(config: &TransportConfig) -> Result<Self> {
        let socket = UdpSocket::bind(config.bind_addr)?;
        socket.set_nonblocking(config.nonblocking)?;
        socket.set_read_timeout(config.read_timeout)?;
        socket.set_write_timeout(config.write_timeout)?;
        Ok(Self {
            socket: Arc::new(socket),
            nonblocking: config.nonblocking,
        })
    }

    /// Whether reads return `WouldBlock` instead of waiting.
    #[must_use]
    pub const fn is_nonblocking(&self) -> bool {
        self.nonblocking
    }

    /// Send one datagram, retrying while the socket buffer is full.
    pub fn send_datagram(&self, frame: &[u8], addr: SocketAddr) -> Result<usize> {
        loop {
            match self.socket.send_to(frame, addr) {
                Ok(sent) => return Ok(sent),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    trace!(%addr, "send buffer full, retrying");
                    thread::yield_now();
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Receive one datagram into `buf`.
    ///
    /// `WouldBlock` and timeouts surface as transient I/O errors.
    pub fn recv_datagram(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        loop {
            match self.socket.recv_from(buf) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                other => return Ok(other?),
            }
        }
    }

    /// Access the local address for this binding.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}
