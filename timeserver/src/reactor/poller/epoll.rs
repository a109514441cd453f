//! Linux `epoll`-based poller implementation.
//!
//! Registrations are level-triggered: a descriptor keeps reporting
//! readiness until the condition is consumed, so work left over from one
//! wake-up (a second queued connection, unread bytes) is reported again on
//! the next one.
//!
//! This backend is selected automatically on Linux targets.

use super::common::{Interest, Waker};
use super::platform::sys_try_close;
use crate::reactor::event::Event;

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLERR, EPOLLHUP, EPOLLIN,
    EPOLLOUT, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::time::Duration;

/// Reserved token used internally for the wake-up event.
///
/// This value must never collide with tokens produced by the slab.
pub(crate) const WAKE_TOKEN: usize = usize::MAX;

/// Maximum number of readiness events drained per wake-up.
const EVENT_CAPACITY: usize = 64;

/// Linux `epoll` poller.
///
/// This poller owns the `epoll` instance and a reusable event buffer, and
/// shares the wake-up source with any [`StopHandle`](crate::StopHandle).
pub(crate) struct EpollPoller {
    /// Epoll file descriptor, `-1` once closed.
    epoll: RawFd,

    /// Reusable buffer for epoll events.
    events: Vec<epoll_event>,

    /// Wake-up source registered under [`WAKE_TOKEN`].
    waker: Arc<Waker>,
}

impl EpollPoller {
    /// Create a new `EpollPoller` with its wake-up source registered.
    pub(crate) fn new() -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        let poller = Self {
            epoll,
            events: Vec::with_capacity(EVENT_CAPACITY),
            waker: Arc::new(Waker::new()?),
        };

        poller.ctl(
            EPOLL_CTL_ADD,
            poller.waker.fd(),
            WAKE_TOKEN,
            Interest::READ,
        )?;

        Ok(poller)
    }

    /// Return the poller waker.
    pub(crate) fn waker(&self) -> Arc<Waker> {
        self.waker.clone()
    }

    fn ctl(&self, op: i32, fd: RawFd, token: usize, interest: Interest) -> io::Result<()> {
        let mut flags = 0;

        if interest.read {
            flags |= EPOLLIN;
        }
        if interest.write {
            flags |= EPOLLOUT;
        }

        let mut event = epoll_event {
            events: flags as u32,
            u64: token as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll, op, fd, &mut event) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    /// Register a file descriptor with the poller.
    ///
    /// Registering a descriptor that is already present updates its
    /// interest instead.
    pub(crate) fn register(&self, fd: RawFd, token: usize, interest: Interest) -> io::Result<()> {
        match self.ctl(EPOLL_CTL_ADD, fd, token, interest) {
            Err(e) if e.raw_os_error() == Some(libc::EEXIST) => {
                self.ctl(EPOLL_CTL_MOD, fd, token, interest)
            }
            result => result,
        }
    }

    /// Update interest flags for a registered descriptor.
    ///
    /// A descriptor that is not registered yet is added.
    pub(crate) fn reregister(&self, fd: RawFd, token: usize, interest: Interest) -> io::Result<()> {
        match self.ctl(EPOLL_CTL_MOD, fd, token, interest) {
            Err(e) if e.raw_os_error() == Some(libc::ENOENT) => {
                self.ctl(EPOLL_CTL_ADD, fd, token, interest)
            }
            result => result,
        }
    }

    /// Remove a file descriptor from the poller. Absent descriptors are ignored.
    pub(crate) fn deregister(&self, fd: RawFd) -> io::Result<()> {
        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
        if rc == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ENOENT) {
            Ok(())
        } else {
            Err(err)
        }
    }

    /// Poll for I/O readiness events.
    ///
    /// Blocks until a registered descriptor becomes ready, the waker fires,
    /// or the timeout expires. `events` is cleared first; a signal
    /// interruption yields an empty batch.
    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<Event>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        events.clear();

        let timeout_ms = timeout.map(timeout_millis).unwrap_or(-1);

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        for ev in &self.events {
            let token = ev.u64 as usize;

            if token == WAKE_TOKEN {
                self.waker.drain();
                continue;
            }

            let readable = ev.events & ((EPOLLIN | EPOLLERR | EPOLLHUP) as u32) != 0;
            let writable = ev.events & (EPOLLOUT as u32) != 0;

            events.push(Event {
                token,
                readable,
                writable,
            });
        }

        Ok(())
    }

    /// Close the epoll instance.
    ///
    /// Every registration is dropped with it.
    pub(crate) fn close(mut self) -> io::Result<()> {
        let epoll = std::mem::replace(&mut self.epoll, -1);

        sys_try_close(epoll)
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        if self.epoll >= 0 {
            let _ = sys_try_close(self.epoll);
        }
    }
}

/// Converts a timeout to whole milliseconds, rounding up so a short
/// non-zero timeout never turns into a busy poll.
fn timeout_millis(timeout: Duration) -> i32 {
    let millis = timeout.as_nanos().div_ceil(1_000_000);

    millis.min(i32::MAX as u128) as i32
}
