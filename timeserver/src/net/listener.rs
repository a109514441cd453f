use super::socket::Socket;
use crate::reactor::poller::platform::{
    domain_of, sys_accept, sys_bind, sys_close, sys_ipv6_is_necessary, sys_listen,
    sys_set_reuseaddr, sys_socket, sys_sockname,
};

use std::io;
use std::net::SocketAddr;
use std::os::fd::RawFd;

/// A non-blocking TCP listening socket.
pub(crate) struct Listener {
    /// File descriptor of the listening socket.
    fd: RawFd,
}

impl Listener {
    /// Binds a listener to `addr`.
    ///
    /// This function:
    /// - creates a non-blocking socket,
    /// - enables `SO_REUSEADDR`,
    /// - configures IPv6 dual-stack if applicable,
    /// - binds and starts listening with the given backlog.
    pub(crate) fn bind(addr: SocketAddr, backlog: i32) -> io::Result<Self> {
        let domain = domain_of(&addr);
        let listener = Self {
            fd: sys_socket(domain)?,
        };

        sys_set_reuseaddr(listener.fd)?;
        sys_ipv6_is_necessary(listener.fd, domain)?;
        sys_bind(listener.fd, &addr)?;
        sys_listen(listener.fd, backlog)?;

        Ok(listener)
    }

    /// Accepts one pending connection.
    ///
    /// Returns [`io::ErrorKind::WouldBlock`] when the queue is empty.
    pub(crate) fn accept(&self) -> io::Result<(Socket, SocketAddr)> {
        let (fd, peer) = sys_accept(self.fd)?;

        Ok((Socket::from_raw(fd), peer))
    }

    /// Returns the local socket address of this listener.
    pub(crate) fn local_addr(&self) -> io::Result<SocketAddr> {
        sys_sockname(self.fd)
    }

    pub(crate) fn fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        sys_close(self.fd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_an_ephemeral_port() {
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();

        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[test]
    fn accept_without_pending_connection_would_block() {
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), 16).unwrap();

        let err = listener.accept().err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn accepts_a_queued_connection() {
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = std::net::TcpStream::connect(addr).unwrap();

        let mut accepted = None;
        for _ in 0..100 {
            match listener.accept() {
                Ok(pair) => {
                    accepted = Some(pair);
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(std::time::Duration::from_millis(10));
                }
                Err(e) => panic!("accept failed: {e}"),
            }
        }

        let (_socket, peer) = accepted.expect("connection was never accepted");
        assert_eq!(peer, client.local_addr().unwrap());
    }

    #[test]
    fn binding_a_used_port_fails() {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();

        assert!(Listener::bind(addr, 16).is_err());
    }
}
