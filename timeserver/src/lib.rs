//! # timeserver
//!
//! A TCP time server driven by a single-threaded readiness reactor.
//!
//! One thread owns everything: the readiness poller (epoll on Linux,
//! kqueue on macOS), the listening socket and every accepted connection.
//! Each wake-up the [`Reactor`] handles the ready sockets inline:
//!
//! - **Accept** one pending connection and register it for read readiness
//! - **Read** once, decode the bytes into a request, answer it and try to
//!   write the reply straight away
//! - **Write** whatever the socket would not take earlier, holding write
//!   interest only while output is queued
//!
//! A fault on one connection closes that connection and nothing else. The
//! loop stops when its [`StopHandle`] is raised.
//!
//! The bytes-to-answer step sits behind the [`Protocol`] trait;
//! [`TimeProtocol`] answers `QUERY TIME ORDER` with the current time and
//! anything else with `BAD ORDER`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use timeserver::{Reactor, ServerConfig, TimeProtocol};
//!
//! fn main() -> Result<(), timeserver::ServerError> {
//!     let config = ServerConfig::default();
//!     let reactor = Reactor::bind(&config, TimeProtocol::new())?;
//!
//!     let stop = reactor.stop_handle();
//!     std::thread::spawn(move || {
//!         std::thread::sleep(std::time::Duration::from_secs(60));
//!         stop.stop();
//!     });
//!
//!     reactor.run()
//! }
//! ```

mod net;
mod reactor;
mod utils;

pub mod codec;
pub mod config;
pub mod error;
pub mod logging;

pub use codec::{BAD_ORDER, Protocol, QUERY_TIME_ORDER, TimeProtocol};
pub use config::{ServerConfig, parse_port};
pub use error::{CodecError, ConnectionError, ServerError};
pub use logging::init_tracing;
pub use reactor::{Reactor, StopHandle};
