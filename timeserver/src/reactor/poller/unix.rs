use libc::{
    AF_INET, AF_INET6, F_GETFL, F_SETFL, IPPROTO_IPV6, IPV6_V6ONLY, O_NONBLOCK, SO_REUSEADDR,
    SOCK_STREAM, SOL_SOCKET, accept, bind, c_int, close, fcntl, getsockname, listen, read, send,
    setsockopt, sockaddr, sockaddr_in, sockaddr_in6, sockaddr_storage, socket, socklen_t, write,
};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::fd::RawFd;
use std::{io, mem};

#[cfg(target_os = "linux")]
const SEND_FLAGS: c_int = libc::MSG_NOSIGNAL;

#[cfg(not(target_os = "linux"))]
const SEND_FLAGS: c_int = 0;

fn cvt(rc: isize) -> io::Result<usize> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc as usize)
    }
}

/// Performs a single `read(2)` into the given buffer.
///
/// The file descriptor **must** be non-blocking.
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> io::Result<usize> {
    cvt(unsafe { read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()) })
}

/// Performs a single `write(2)` of the given buffer.
pub(crate) fn sys_write(fd: RawFd, buffer: &[u8]) -> io::Result<usize> {
    cvt(unsafe { write(fd, buffer.as_ptr() as *const _, buffer.len()) })
}

/// Performs a single `send(2)` on a connected socket.
///
/// A peer that went away surfaces as `EPIPE` instead of raising `SIGPIPE`.
pub(crate) fn sys_send(fd: RawFd, buffer: &[u8]) -> io::Result<usize> {
    cvt(unsafe { send(fd, buffer.as_ptr() as *const _, buffer.len(), SEND_FLAGS) })
}

/// Closes a file descriptor, ignoring errors.
pub(crate) fn sys_close(fd: RawFd) {
    unsafe { close(fd) };
}

/// Closes a file descriptor and reports the outcome.
pub(crate) fn sys_try_close(fd: RawFd) -> io::Result<()> {
    let rc = unsafe { close(fd) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Sets a file descriptor to non-blocking mode.
pub(crate) fn sys_set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(fd, F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    let rc = unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Sets `FD_CLOEXEC` on a file descriptor.
#[cfg(not(target_os = "linux"))]
fn sys_set_cloexec(fd: RawFd) -> io::Result<()> {
    let rc = unsafe { fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Creates the descriptor pair backing the poller wake-up source.
#[cfg(target_os = "linux")]
pub(crate) fn sys_waker_pair() -> io::Result<(RawFd, RawFd)> {
    let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok((fd, fd))
}

/// Creates the descriptor pair backing the poller wake-up source.
#[cfg(not(target_os = "linux"))]
pub(crate) fn sys_waker_pair() -> io::Result<(RawFd, RawFd)> {
    let mut fds = [0 as c_int; 2];

    if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
        return Err(io::Error::last_os_error());
    }

    for fd in fds {
        if let Err(e) = sys_set_nonblocking(fd).and_then(|_| sys_set_cloexec(fd)) {
            sys_close(fds[0]);
            sys_close(fds[1]);
            return Err(e);
        }
    }

    Ok((fds[0], fds[1]))
}

/// Creates a non-blocking stream socket.
pub(crate) fn sys_socket(domain: c_int) -> io::Result<RawFd> {
    let fd = unsafe { socket(domain, SOCK_STREAM, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    if let Err(e) = sys_set_nonblocking(fd) {
        sys_close(fd);
        return Err(e);
    }

    Ok(fd)
}

/// Binds a socket to an address.
pub(crate) fn sys_bind(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    let (storage, len) = socketaddr_to_storage(addr);

    let rc = unsafe { bind(fd, &storage as *const _ as *const sockaddr, len) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Marks a socket as a listening socket with the given backlog.
pub(crate) fn sys_listen(fd: RawFd, backlog: c_int) -> io::Result<()> {
    let rc = unsafe { listen(fd, backlog) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Accepts one pending connection.
///
/// The returned client socket is already non-blocking.
pub(crate) fn sys_accept(fd: RawFd) -> io::Result<(RawFd, SocketAddr)> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    let client_fd = unsafe { accept(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) };

    if client_fd < 0 {
        return Err(io::Error::last_os_error());
    }

    let configured = sys_set_nonblocking(client_fd)
        .and_then(|_| sys_set_nosigpipe(client_fd))
        .and_then(|_| sockaddr_storage_to_socketaddr(&storage));

    match configured {
        Ok(addr) => Ok((client_fd, addr)),
        Err(e) => {
            sys_close(client_fd);
            Err(e)
        }
    }
}

/// Returns the local address of a socket.
pub(crate) fn sys_sockname(fd: RawFd) -> io::Result<SocketAddr> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    let rc = unsafe { getsockname(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) };

    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        sockaddr_storage_to_socketaddr(&storage)
    }
}

fn sys_setsockopt(fd: RawFd, level: c_int, name: c_int, value: c_int) -> io::Result<()> {
    let rc = unsafe {
        setsockopt(
            fd,
            level,
            name,
            &value as *const _ as *const _,
            mem::size_of::<c_int>() as socklen_t,
        )
    };

    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Enables `SO_REUSEADDR` on a socket.
pub(crate) fn sys_set_reuseaddr(fd: RawFd) -> io::Result<()> {
    sys_setsockopt(fd, SOL_SOCKET, SO_REUSEADDR, 1)
}

/// Suppresses `SIGPIPE` for writes on this socket where `MSG_NOSIGNAL`
/// is unavailable.
#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
pub(crate) fn sys_set_nosigpipe(fd: RawFd) -> io::Result<()> {
    sys_setsockopt(fd, SOL_SOCKET, libc::SO_NOSIGPIPE, 1)
}

#[cfg(not(any(target_os = "macos", target_os = "ios", target_os = "freebsd")))]
pub(crate) fn sys_set_nosigpipe(_fd: RawFd) -> io::Result<()> {
    Ok(())
}

/// Enables IPv6 dual-stack support when binding an IPv6 address.
pub(crate) fn sys_ipv6_is_necessary(fd: RawFd, domain: c_int) -> io::Result<()> {
    if domain == AF_INET6 {
        sys_setsockopt(fd, IPPROTO_IPV6, IPV6_V6ONLY, 0)?;
    }
    Ok(())
}

/// Returns the socket domain matching an address.
pub(crate) fn domain_of(addr: &SocketAddr) -> c_int {
    match addr {
        SocketAddr::V4(_) => AF_INET,
        SocketAddr::V6(_) => AF_INET6,
    }
}

/// Converts a `sockaddr_storage` to a Rust `SocketAddr`.
pub(crate) fn sockaddr_storage_to_socketaddr(storage: &sockaddr_storage) -> io::Result<SocketAddr> {
    match storage.ss_family as c_int {
        AF_INET => {
            let addr = unsafe { &*(storage as *const _ as *const sockaddr_in) };
            let ip = Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr));
            let port = u16::from_be(addr.sin_port);

            Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
        }

        AF_INET6 => {
            let addr = unsafe { &*(storage as *const _ as *const sockaddr_in6) };
            let ip = Ipv6Addr::from(addr.sin6_addr.s6_addr);
            let port = u16::from_be(addr.sin6_port);

            Ok(SocketAddr::V6(SocketAddrV6::new(
                ip,
                port,
                addr.sin6_flowinfo,
                addr.sin6_scope_id,
            )))
        }

        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "unsupported address family",
        )),
    }
}

/// Converts a `SocketAddr` to a `sockaddr_storage`.
pub(crate) fn socketaddr_to_storage(addr: &SocketAddr) -> (sockaddr_storage, socklen_t) {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };

    match addr {
        SocketAddr::V4(v4) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in) };
            sa.sin_family = AF_INET as _;
            sa.sin_port = v4.port().to_be();
            sa.sin_addr.s_addr = u32::from(*v4.ip()).to_be();

            (storage, mem::size_of::<sockaddr_in>() as socklen_t)
        }

        SocketAddr::V6(v6) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in6) };
            sa.sin6_family = AF_INET6 as _;
            sa.sin6_port = v6.port().to_be();
            sa.sin6_addr.s6_addr = v6.ip().octets();
            sa.sin6_flowinfo = v6.flowinfo();
            sa.sin6_scope_id = v6.scope_id();

            (storage, mem::size_of::<sockaddr_in6>() as socklen_t)
        }
    }
}
