use crate::reactor::poller::platform::{sys_close, sys_read, sys_send};

use std::io;
use std::os::fd::RawFd;

/// An accepted, non-blocking TCP connection.
pub(crate) struct Socket {
    fd: RawFd,
}

impl Socket {
    /// Takes ownership of a connected, non-blocking descriptor.
    pub(crate) fn from_raw(fd: RawFd) -> Self {
        Self { fd }
    }

    /// One non-blocking read. `Ok(0)` is the end of stream.
    pub(crate) fn read(&self, buffer: &mut [u8]) -> io::Result<usize> {
        sys_read(self.fd, buffer)
    }

    /// One non-blocking write; may accept fewer bytes than offered.
    pub(crate) fn write(&self, buffer: &[u8]) -> io::Result<usize> {
        sys_send(self.fd, buffer)
    }

    pub(crate) fn fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        sys_close(self.fd);
    }
}
