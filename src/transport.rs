//! Connect-mode datagram transport the query engine talks through.

use anyhow::Context;
use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    time::Duration,
};
use tracing::trace;

/// A connected datagram channel to a single peer.
///
/// The connection is released when the value is dropped.
pub trait Transport {
    fn send(&mut self, data: &[u8]) -> io::Result<()>;
    /// Blocks until one datagram arrives or the receive timeout expires.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Opens a fresh, exclusively owned transport per query.
pub trait Connector {
    type Transport: Transport;

    fn connect(&self, addr: SocketAddr, timeout: Duration) -> anyhow::Result<Self::Transport>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UdpConnector;

impl Connector for UdpConnector {
    type Transport = UdpTransport;

    fn connect(&self, addr: SocketAddr, timeout: Duration) -> anyhow::Result<UdpTransport> {
        let local: SocketAddr = match addr {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).context("Failed to bind UDP socket")?;
        socket
            .set_read_timeout(Some(timeout))
            .context("Failed to set receive timeout")?;
        socket
            .connect(addr)
            .with_context(|| format!("Failed to connect UDP socket to {}", addr))?;
        trace!("Opened connection to {}", addr);

        Ok(UdpTransport { socket, peer: addr })
    }
}

#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl Transport for UdpTransport {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        trace!("Sending data to {}: {}", self.peer, hex::encode(data));
        let sent = self.socket.send(data)?;
        if sent != data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sent {} of {} bytes", sent, data.len()),
            ));
        }
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.socket.recv(buf)?;
        trace!("Received data from {}: {}", self.peer, hex::encode(&buf[..len]));
        Ok(len)
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        trace!("Closing connection to {}", self.peer);
    }
}
