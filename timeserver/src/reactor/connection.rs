//! Per-connection state and its non-blocking read/write steps.
//!
//! The read and flush steps are written against plain closures so the
//! state machine can be driven without a socket; [`Connection`] plugs the
//! socket in.

use super::poller::Interest;
use crate::net::Socket;

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;

/// Outcome of a single read attempt.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    /// This many bytes were appended to the read buffer.
    Data(usize),
    /// The peer shut down its side.
    Eof,
    /// Spurious readiness; nothing to read right now.
    WouldBlock,
}

/// Outcome of a flush attempt.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Flush {
    /// The write queue is empty.
    Drained,
    /// Bytes remain queued until the next write readiness.
    Pending,
}

/// Performs one read of at most `chunk` bytes and appends it to `buffer`.
pub(crate) fn read_once<R>(buffer: &mut Vec<u8>, chunk: usize, mut read: R) -> io::Result<ReadOutcome>
where
    R: FnMut(&mut [u8]) -> io::Result<usize>,
{
    let start = buffer.len();
    buffer.resize(start + chunk, 0);

    let result = read(&mut buffer[start..]);
    let n = *result.as_ref().unwrap_or(&0);
    buffer.truncate(start + n);

    match result {
        Ok(0) => Ok(ReadOutcome::Eof),
        Ok(n) => Ok(ReadOutcome::Data(n)),
        Err(e)
            if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::Interrupted =>
        {
            Ok(ReadOutcome::WouldBlock)
        }
        Err(e) => Err(e),
    }
}

/// Writes queued buffers in order until the queue is empty or the
/// transport stops accepting bytes.
///
/// A partially written buffer keeps its unwritten tail at the front of the
/// queue. Stops at the first short write or "would block"; no write is
/// retried within one call.
pub(crate) fn flush_queue<W>(queue: &mut VecDeque<Vec<u8>>, mut write: W) -> io::Result<Flush>
where
    W: FnMut(&[u8]) -> io::Result<usize>,
{
    while let Some(front) = queue.front_mut() {
        match write(front) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) if n < front.len() => {
                front.drain(..n);
                return Ok(Flush::Pending);
            }
            Ok(_) => {
                queue.pop_front();
            }
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::Interrupted =>
            {
                return Ok(Flush::Pending);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(Flush::Drained)
}

/// An accepted connection registered with the reactor.
pub(crate) struct Connection {
    socket: Socket,
    peer: SocketAddr,

    /// Bytes read but not yet consumed by the decoder. Unbounded.
    read_buffer: Vec<u8>,

    /// Encoded replies awaiting delivery, oldest first.
    write_queue: VecDeque<Vec<u8>>,

    /// Interest currently registered with the poller.
    registered: Interest,

    /// Flush attempts so far.
    #[cfg(test)]
    pub(crate) flushes: usize,
}

impl Connection {
    /// Wraps a freshly accepted socket, registered for read interest.
    pub(crate) fn new(socket: Socket, peer: SocketAddr) -> Self {
        Self {
            socket,
            peer,
            read_buffer: Vec::new(),
            write_queue: VecDeque::new(),
            registered: Interest::READ,
            #[cfg(test)]
            flushes: 0,
        }
    }

    pub(crate) fn socket(&self) -> &Socket {
        &self.socket
    }

    pub(crate) fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Reads once from the socket into the read buffer.
    pub(crate) fn read(&mut self, chunk: usize) -> io::Result<ReadOutcome> {
        let socket = &self.socket;

        read_once(&mut self.read_buffer, chunk, |buf| socket.read(buf))
    }

    /// Bytes awaiting the decoder.
    pub(crate) fn input(&mut self) -> &mut Vec<u8> {
        &mut self.read_buffer
    }

    /// Queues an encoded reply. Empty replies are dropped.
    pub(crate) fn enqueue(&mut self, bytes: Vec<u8>) {
        if !bytes.is_empty() {
            self.write_queue.push_back(bytes);
        }
    }

    pub(crate) fn has_pending_output(&self) -> bool {
        !self.write_queue.is_empty()
    }

    /// Writes as much queued output as the socket accepts right now.
    pub(crate) fn flush(&mut self) -> io::Result<Flush> {
        #[cfg(test)]
        {
            self.flushes += 1;
        }

        let socket = &self.socket;

        flush_queue(&mut self.write_queue, |buf| socket.write(buf))
    }

    /// Interest this connection needs: read always, write only while
    /// output is queued.
    pub(crate) fn interest(&self) -> Interest {
        if self.has_pending_output() {
            Interest::READ_WRITE
        } else {
            Interest::READ
        }
    }

    pub(crate) fn registered(&self) -> Interest {
        self.registered
    }

    pub(crate) fn set_registered(&mut self, interest: Interest) {
        self.registered = interest;
    }
}
