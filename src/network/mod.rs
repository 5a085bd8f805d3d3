//! UDP datagram transport
//!
//! The sessions only need an unreliable datagram channel; the trait keeps
//! them testable without sockets.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::NetworkError;

/// Unreliable datagram channel, UDP semantics as-is.
pub trait DatagramChannel {
    /// Block until a datagram arrives; returns its length and the peer address.
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Send one datagram to the configured destination.
    fn send(&self, data: &[u8]) -> io::Result<usize>;
}

/// UDP socket channel
pub struct UdpChannel {
    socket: UdpSocket,
}

impl UdpChannel {
    /// Bind a receive socket. `SO_REUSEADDR` is set so a restarted receiver
    /// can rebind immediately.
    pub fn bind(addr: SocketAddr) -> Result<Self, NetworkError> {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
            .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
        socket
            .bind(&addr.into())
            .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
        Ok(Self {
            socket: socket.into(),
        })
    }

    /// Create a send socket connected to `remote`.
    pub fn connect(remote: SocketAddr) -> Result<Self, NetworkError> {
        let local: SocketAddr = if remote.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };
        let socket =
            UdpSocket::bind(local).map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        socket
            .connect(remote)
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        Ok(Self { socket })
    }

    /// Set a receive timeout so a blocked receiver can observe a stop request.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), NetworkError> {
        self.socket
            .set_read_timeout(timeout)
            .map_err(|e| NetworkError::ReceiveFailed(e.to_string()))
    }

    /// Local address the socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl DatagramChannel for UdpChannel {
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf)
    }

    fn send(&self, data: &[u8]) -> io::Result<usize> {
        self.socket.send(data)
    }
}
