//! Platform-specific readiness multiplexer.
//!
//! This module provides a unified interface over the operating system's
//! readiness notification primitive (epoll on Linux, kqueue on macOS).
//!
//! The poller is used by the reactor to:
//! - register sockets for read and write readiness,
//! - block for a bounded time waiting for readiness,
//! - be woken early when a stop is requested.
//!
//! The concrete implementation is selected at compile time
//! depending on the target operating system.

pub(crate) mod common;

pub(crate) use common::{Interest, Waker};

#[cfg(target_os = "macos")]
mod kqueue;

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "macos")]
pub(crate) type Poller = kqueue::KqueuePoller;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(target_os = "macos")]
pub(crate) use kqueue::WAKE_TOKEN;

#[cfg(target_os = "linux")]
pub(crate) use epoll::WAKE_TOKEN;

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;
