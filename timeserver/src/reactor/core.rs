use super::connection::{Connection, ReadOutcome};
use super::event::Event;
use super::poller::{Interest, Poller, WAKE_TOKEN, Waker};
use crate::codec::Protocol;
use crate::config::ServerConfig;
use crate::error::{ConnectionError, Result, ServerError};
use crate::net::{Listener, Socket};
use crate::utils::Slab;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Token of the listening socket, next to the poller's reserved wake token.
const LISTENER_TOKEN: usize = WAKE_TOKEN - 1;

/// Requests a running [`Reactor`] to stop.
///
/// The flag is checked once per wake-up; [`stop`](Self::stop) also wakes
/// the poller so a stop is noticed without waiting out the poll interval.
#[derive(Clone)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.waker.wake();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// What a connection looks like after handling one event.
#[derive(Clone, Copy)]
enum Status {
    Open,
    Closed,
}

/// Single-threaded readiness reactor.
///
/// Owns the poller, the listening socket and every accepted connection.
/// Connections live in a slab whose keys are the poller tokens, so a
/// readiness event maps directly onto the connection state.
pub struct Reactor<P> {
    poller: Poller,
    events: Vec<Event>,

    listener: Listener,
    accept: fn(&Listener) -> io::Result<(Socket, SocketAddr)>,
    /// Set while the listener is deregistered after descriptor exhaustion.
    accept_paused_until: Option<Instant>,
    connections: Slab<Connection>,

    protocol: P,
    poll_interval: Duration,
    read_chunk: usize,

    stop: StopHandle,
}

impl<P: Protocol> Reactor<P> {
    /// Creates the poller and binds the listening socket.
    ///
    /// Failing to create the poller or bind the listener is fatal.
    pub fn bind(config: &ServerConfig, protocol: P) -> Result<Self> {
        config.validate()?;

        let poller = Poller::new().map_err(ServerError::PollerInit)?;

        let addr = config.address();
        let listener = Listener::bind(addr, config.backlog)
            .map_err(|source| ServerError::Bind { addr, source })?;

        poller.register(listener.fd(), LISTENER_TOKEN, Interest::READ)?;

        let stop = StopHandle {
            stopped: Arc::new(AtomicBool::new(false)),
            waker: poller.waker(),
        };

        info!("listening on {}", listener.local_addr()?);

        Ok(Self {
            poller,
            events: Vec::with_capacity(64),
            listener,
            accept: Listener::accept,
            accept_paused_until: None,
            connections: Slab::with_capacity(64),
            protocol,
            poll_interval: config.poll_interval,
            read_chunk: config.read_chunk,
            stop,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Runs until the stop flag is raised, then closes every connection
    /// and the poller.
    ///
    /// Only a poller failure ends the loop early; connection faults close
    /// the offending connection and nothing else.
    pub fn run(mut self) -> Result<()> {
        while !self.stop.is_stopped() {
            self.turn(Some(self.poll_interval))?;
        }

        self.shutdown()
    }

    /// Waits for one batch of readiness events and handles it.
    pub fn turn(&mut self, timeout: Option<Duration>) -> Result<()> {
        let timeout = self.resume_accepting(timeout)?;
        let mut events = std::mem::take(&mut self.events);

        self.poller
            .poll(&mut events, timeout)
            .map_err(ServerError::Poll)?;

        let mut acceptable = false;
        for event in &events {
            if event.token == LISTENER_TOKEN {
                acceptable = true;
            } else {
                self.handle_event(*event);
            }
        }

        // Accepting last keeps tokens freed in this batch from being
        // reused while stale events for them are still being handled.
        if acceptable {
            self.handle_accept()?;
        }

        self.events = events;
        Ok(())
    }

    /// Accepts one pending connection and registers it for reading.
    ///
    /// A failed accept is logged and skipped. Running out of descriptors or
    /// memory also takes the listener out of the poller until
    /// [`resume_accepting`](Self::resume_accepting) puts it back.
    fn handle_accept(&mut self) -> Result<()> {
        let (socket, peer) = match (self.accept)(&self.listener) {
            Ok(pair) => pair,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) if is_resource_exhaustion(&e) => {
                warn!(
                    "failed to accept connection, pausing for {:?}: {}",
                    self.poll_interval, e
                );
                self.poller.deregister(self.listener.fd())?;
                self.accept_paused_until = Some(Instant::now() + self.poll_interval);
                return Ok(());
            }
            Err(e) => {
                warn!("failed to accept connection: {}", e);
                return Ok(());
            }
        };

        let token = self.connections.vacant_key();

        if let Err(e) = self.poller.register(socket.fd(), token, Interest::READ) {
            warn!("failed to register connection from {}: {}", peer, e);
            return Ok(());
        }

        self.connections.insert(Connection::new(socket, peer));
        info!("accepted connection from {} (token {})", peer, token);
        Ok(())
    }

    /// Re-registers the listener once an accept pause has run out.
    ///
    /// While paused, `timeout` is capped so the wait ends with the pause.
    fn resume_accepting(&mut self, timeout: Option<Duration>) -> Result<Option<Duration>> {
        let Some(until) = self.accept_paused_until else {
            return Ok(timeout);
        };

        let now = Instant::now();
        if now < until {
            let left = until - now;
            return Ok(Some(timeout.map_or(left, |t| t.min(left))));
        }

        self.poller
            .register(self.listener.fd(), LISTENER_TOKEN, Interest::READ)?;
        self.accept_paused_until = None;
        debug!("accepting connections again");

        Ok(timeout)
    }

    fn handle_event(&mut self, event: Event) {
        let Some(connection) = self.connections.get_mut(event.token) else {
            return;
        };

        let peer = connection.peer();

        let result =
            drive(connection, &mut self.protocol, event, self.read_chunk).and_then(|status| {
                if let Status::Open = status {
                    sync_interest(&self.poller, event.token, connection)?;
                }
                Ok(status)
            });

        match result {
            Ok(Status::Open) => {}
            Ok(Status::Closed) => {
                debug!("connection {} closed by peer", peer);
                self.cleanup(event.token);
            }
            Err(e) => {
                warn!("closing connection {} (token {}): {}", peer, event.token, e);
                self.cleanup(event.token);
            }
        }
    }

    /// Deregisters and closes a connection.
    fn cleanup(&mut self, token: usize) {
        let Some(connection) = self.connections.remove(token) else {
            return;
        };

        if let Err(e) = self.poller.deregister(connection.socket().fd()) {
            warn!("failed to deregister connection {}: {}", connection.peer(), e);
        }

        // A descriptor was just freed.
        if self.accept_paused_until.is_some() {
            self.accept_paused_until = Some(Instant::now());
        }
    }

    fn shutdown(mut self) -> Result<()> {
        info!("stopping, closing {} connection(s)", self.connections.len());

        for token in self.connections.keys() {
            self.cleanup(token);
        }

        let Self {
            poller, listener, ..
        } = self;

        drop(listener);
        poller.close().map_err(ServerError::PollerClose)
    }
}

/// Handles one readiness event for a connection.
///
/// A read is a single non-blocking attempt. Whatever it produced is handed
/// to the protocol, and replies are written out immediately as far as the
/// socket allows. Write readiness flushes what is left, unless the read
/// path already made its one write attempt for this event.
fn drive<P: Protocol>(
    connection: &mut Connection,
    protocol: &mut P,
    event: Event,
    chunk: usize,
) -> std::result::Result<Status, ConnectionError> {
    let mut flushed = false;

    if event.readable {
        match connection.read(chunk)? {
            ReadOutcome::Eof => return Ok(Status::Closed),
            ReadOutcome::WouldBlock => {}
            ReadOutcome::Data(n) => {
                trace!("read {} bytes from {}", n, connection.peer());

                while let Some(request) = protocol.decode(connection.input())? {
                    let response = protocol.respond(request);
                    connection.enqueue(protocol.encode(response));
                }

                connection.flush()?;
                flushed = true;
            }
        }
    }

    if event.writable && !flushed && connection.has_pending_output() {
        connection.flush()?;
    }

    Ok(Status::Open)
}

/// Errors that mean the process is out of descriptors or memory.
fn is_resource_exhaustion(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM)
    )
}

/// Brings the registered interest in line with the write queue: write
/// interest while output is queued, read interest only once it drains.
fn sync_interest(
    poller: &Poller,
    token: usize,
    connection: &mut Connection,
) -> std::result::Result<(), ConnectionError> {
    let wanted = connection.interest();

    if wanted != connection.registered() {
        poller
            .reregister(connection.socket().fd(), token, wanted)
            .map_err(ConnectionError::Register)?;

        connection.set_registered(wanted);
        debug!("connection {} write interest: {}", token, wanted.write);
    }

    Ok(())
}
