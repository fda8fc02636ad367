//! Non-blocking UDP sockets

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use tracing::trace;

/// One non-blocking IPv4 datagram socket.
///
/// Dropping the transport closes the socket.
#[derive(Debug)]
pub struct Transport {
    socket: UdpSocket,
}

impl Transport {
    /// Bind to `port` on all interfaces (0 picks an ephemeral port).
    pub fn bind(port: u16, broadcast: bool) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        if broadcast {
            socket.set_broadcast(true)?;
        }
        socket.set_nonblocking(true)?;

        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
        socket.bind(&addr.into())?;

        Ok(Self {
            socket: socket.into(),
        })
    }

    /// Ephemeral socket, used by joining and browsing clients.
    pub fn ephemeral(broadcast: bool) -> io::Result<Self> {
        Self::bind(0, broadcast)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Read at most one datagram.
    ///
    /// `Ok(None)` means nothing is waiting; that is not an error.
    pub fn recv(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buf) {
            Ok((len, from)) => {
                trace!("Received {} bytes from {}", len, from);
                Ok(Some((len, from)))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Send one datagram. A short write is reported as an error.
    pub fn send_to(&self, datagram: &[u8], to: SocketAddr) -> io::Result<()> {
        let sent = self.socket.send_to(datagram, to)?;
        if sent != datagram.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("partial send: {} of {} bytes", sent, datagram.len()),
            ));
        }
        Ok(())
    }
}
