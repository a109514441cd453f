//! Single-threaded readiness reactor.
//!
//! The reactor owns the readiness poller, the listening socket and every
//! accepted connection. Each wake-up it:
//! - handles readiness on existing connections (read, answer, flush),
//! - accepts at most one new connection,
//! - keeps each connection's write interest tied to its pending output.
//!
//! A fault on one connection closes that connection and nothing else.

mod connection;
mod core;
mod event;

pub(crate) mod poller;

pub use self::core::{Reactor, StopHandle};
