//! TCP sockets driven by the reactor.
//!
//! - [`Listener`]: the bound, non-blocking listening socket.
//! - [`Socket`]: an accepted, non-blocking connection.
//!
//! Both own their descriptor and close it on drop. Neither blocks: every
//! call is a single non-blocking attempt, and "would block" is reported
//! back to the caller as [`std::io::ErrorKind::WouldBlock`].

mod listener;
mod socket;

pub(crate) use listener::Listener;
pub(crate) use socket::Socket;
