//! macOS `kqueue`-based poller implementation.
//!
//! Exposes the same interface as the Linux `epoll` backend. Read and write
//! readiness are separate filters in kqueue; the write filter stays
//! attached to a descriptor and is toggled with `EV_ENABLE`/`EV_DISABLE`,
//! which keeps interest updates free of "not found" errors.

use super::common::{Interest, Waker};
use super::platform::sys_try_close;
use crate::reactor::event::Event;

use libc::{
    EV_ADD, EV_DELETE, EV_DISABLE, EV_ENABLE, EV_EOF, EV_ERROR, EVFILT_READ, EVFILT_WRITE, kevent,
    kqueue, timespec,
};
use std::io;
use std::os::unix::io::RawFd;
use std::ptr;
use std::sync::Arc;
use std::time::Duration;

/// Reserved token used internally for the wake-up event.
pub(crate) const WAKE_TOKEN: usize = usize::MAX;

/// Maximum number of readiness events drained per wake-up.
const EVENT_CAPACITY: usize = 64;

/// macOS `kqueue` poller.
pub(crate) struct KqueuePoller {
    /// Kqueue file descriptor, `-1` once closed.
    queue: RawFd,

    /// Reusable buffer for kevents.
    events: Vec<kevent>,

    /// Wake-up source registered under [`WAKE_TOKEN`].
    waker: Arc<Waker>,
}

// The raw `udata` pointers in the buffer only ever carry tokens.
unsafe impl Send for KqueuePoller {}

fn change(fd: RawFd, filter: i16, flags: u16, token: usize) -> kevent {
    kevent {
        ident: fd as usize,
        filter,
        flags,
        fflags: 0,
        data: 0,
        udata: token as *mut _,
    }
}

impl KqueuePoller {
    /// Create a new `KqueuePoller` with its wake-up source registered.
    pub(crate) fn new() -> io::Result<Self> {
        let queue = unsafe { kqueue() };
        if queue < 0 {
            return Err(io::Error::last_os_error());
        }

        let poller = Self {
            queue,
            events: Vec::with_capacity(EVENT_CAPACITY),
            waker: Arc::new(Waker::new()?),
        };

        poller.apply(&[change(
            poller.waker.fd(),
            EVFILT_READ,
            EV_ADD | EV_ENABLE,
            WAKE_TOKEN,
        )])?;

        Ok(poller)
    }

    /// Return the poller waker.
    pub(crate) fn waker(&self) -> Arc<Waker> {
        self.waker.clone()
    }

    fn apply(&self, changes: &[kevent]) -> io::Result<()> {
        let rc = unsafe {
            kevent(
                self.queue,
                changes.as_ptr(),
                changes.len() as i32,
                ptr::null_mut(),
                0,
                ptr::null(),
            )
        };

        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn changes(fd: RawFd, token: usize, interest: Interest) -> [kevent; 2] {
        let toggle = |on: bool| if on { EV_ENABLE } else { EV_DISABLE };

        [
            change(fd, EVFILT_READ, EV_ADD | toggle(interest.read), token),
            change(fd, EVFILT_WRITE, EV_ADD | toggle(interest.write), token),
        ]
    }

    /// Register a file descriptor with the poller.
    ///
    /// `EV_ADD` on an existing filter modifies it, so registering twice is
    /// the same as updating the interest.
    pub(crate) fn register(&self, fd: RawFd, token: usize, interest: Interest) -> io::Result<()> {
        self.apply(&Self::changes(fd, token, interest))
    }

    /// Update interest flags for a descriptor, adding it if absent.
    pub(crate) fn reregister(&self, fd: RawFd, token: usize, interest: Interest) -> io::Result<()> {
        self.apply(&Self::changes(fd, token, interest))
    }

    /// Remove a file descriptor from the poller. Absent descriptors are ignored.
    pub(crate) fn deregister(&self, fd: RawFd) -> io::Result<()> {
        for filter in [EVFILT_READ, EVFILT_WRITE] {
            match self.apply(&[change(fd, filter, EV_DELETE, 0)]) {
                Err(e) if e.raw_os_error() != Some(libc::ENOENT) => return Err(e),
                _ => {}
            }
        }

        Ok(())
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

        let ts = timeout.map(|t| timespec {
            tv_sec: t.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
            tv_nsec: t.subsec_nanos() as _,
        });
        let ts_ptr = ts.as_ref().map_or(ptr::null(), |t| t as *const timespec);

        let n = unsafe {
            kevent(
                self.queue,
                ptr::null(),
                0,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                ts_ptr,
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
            let token = ev.udata as usize;

            if token == WAKE_TOKEN {
                self.waker.drain();
                continue;
            }

            let readable =
                ev.filter == EVFILT_READ || ev.flags & (EV_EOF | EV_ERROR) != 0;
            let writable = ev.filter == EVFILT_WRITE;

            if let Some(e) = events.iter_mut().find(|e| e.token == token) {
                e.readable |= readable;
                e.writable |= writable;
            } else {
                events.push(Event {
                    token,
                    readable,
                    writable,
                });
            }
        }

        Ok(())
    }

    /// Close the kqueue instance.
    ///
    /// Every registration is dropped with it.
    pub(crate) fn close(mut self) -> io::Result<()> {
        let queue = std::mem::replace(&mut self.queue, -1);

        sys_try_close(queue)
    }
}

impl Drop for KqueuePoller {
    fn drop(&mut self) {
        if self.queue >= 0 {
            let _ = sys_try_close(self.queue);
        }
    }
}
