use super::platform::{sys_close, sys_read, sys_waker_pair, sys_write};

use std::io;
use std::os::fd::RawFd;

/// The set of readiness notifications a descriptor is registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Interest {
    pub(crate) read: bool,
    pub(crate) write: bool,
}

impl Interest {
    /// Read readiness only. Every accepted connection starts here.
    pub(crate) const READ: Self = Self {
        read: true,
        write: false,
    };

    /// Read and write readiness, used while output is still queued.
    pub(crate) const READ_WRITE: Self = Self {
        read: true,
        write: true,
    };
}

/// Wake-up source registered with the poller.
///
/// Writing to it makes a blocked `poll` return immediately. On Linux both
/// ends are the same `eventfd`; elsewhere they are the two ends of a
/// non-blocking pipe. The descriptors are owned by the waker rather than the
/// poller, so waking after the poller has been closed is harmless.
pub(crate) struct Waker {
    read: RawFd,
    write: RawFd,
}

impl Waker {
    pub(crate) fn new() -> io::Result<Self> {
        let (read, write) = sys_waker_pair()?;

        Ok(Self { read, write })
    }

    /// Descriptor the poller watches for read readiness.
    pub(crate) fn fd(&self) -> RawFd {
        self.read
    }

    /// Wake the poller.
    ///
    /// A full pipe or a saturated eventfd already guarantees a pending
    /// wake-up, so a failed write is ignored.
    pub(crate) fn wake(&self) {
        let buf = 1u64.to_ne_bytes();
        let len = if self.read == self.write { 8 } else { 1 };

        let _ = sys_write(self.write, &buf[..len]);
    }

    /// Consume pending wake-ups so the descriptor stops reporting readiness.
    pub(crate) fn drain(&self) {
        let mut buf = [0u8; 64];

        while matches!(sys_read(self.read, &mut buf), Ok(n) if n > 0) {}
    }
}

impl Drop for Waker {
    fn drop(&mut self) {
        sys_close(self.read);

        if self.write != self.read {
            sys_close(self.write);
        }
    }
}
