//! Shared helpers for reactor integration tests.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use timeserver::{CodecError, Protocol, Reactor, ServerConfig, ServerError, StopHandle};

pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// A reactor running on its own thread.
pub struct Server {
    pub addr: SocketAddr,
    stop: StopHandle,
    thread: Option<JoinHandle<Result<(), ServerError>>>,
}

impl Server {
    pub fn start<P: Protocol + Send + 'static>(protocol: P) -> Self {
        let config = ServerConfig {
            poll_interval: Duration::from_millis(50),
            ..ServerConfig::new(Ipv4Addr::LOCALHOST.into(), 0)
        };

        let reactor = Reactor::bind(&config, protocol).expect("Failed to bind reactor");
        let addr = reactor.local_addr().expect("Failed to get local address");
        let stop = reactor.stop_handle();
        let thread = thread::spawn(move || reactor.run());

        Self {
            addr,
            stop,
            thread: Some(thread),
        }
    }

    pub fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).expect("Failed to connect to server");
        stream
            .set_read_timeout(Some(IO_TIMEOUT))
            .expect("Failed to set read timeout");
        stream
    }

    /// Raises the stop flag and waits for the loop to exit cleanly.
    pub fn shutdown(mut self) {
        self.stop.stop();

        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .expect("Reactor thread panicked")
                .expect("Reactor failed");
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop.stop();
    }
}

/// Sends `request` and reads exactly `len` reply bytes.
pub fn exchange(stream: &mut TcpStream, request: &[u8], len: usize) -> Vec<u8> {
    stream.write_all(request).expect("Failed to write to stream");

    let mut reply = vec![0; len];
    stream
        .read_exact(&mut reply)
        .expect("Failed to read from stream");
    reply
}

/// Asserts nothing more arrives within a short window.
pub fn assert_quiet(stream: &mut TcpStream) {
    stream
        .set_read_timeout(Some(Duration::from_millis(200)))
        .expect("Failed to set read timeout");

    let mut buf = [0u8; 64];
    match stream.read(&mut buf) {
        Ok(n) => panic!("unexpected {n} extra bytes: {:?}", &buf[..n]),
        Err(e) => assert!(
            matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
            "unexpected error: {e}"
        ),
    }

    stream
        .set_read_timeout(Some(IO_TIMEOUT))
        .expect("Failed to set read timeout");
}

/// Byte `i` of a flood reply.
pub fn flood_byte(i: usize) -> u8 {
    (i % 251) as u8
}

/// Echoes each read back prefixed with `echo:`; `flood` is answered with
/// `FLOOD_LEN` patterned bytes instead.
pub struct Echo;

pub const FLOOD_LEN: usize = 32 * 1024 * 1024;

impl Protocol for Echo {
    type Request = Vec<u8>;
    type Response = Vec<u8>;

    fn decode(&mut self, buffer: &mut Vec<u8>) -> Result<Option<Vec<u8>>, CodecError> {
        if buffer.is_empty() {
            return Ok(None);
        }
        Ok(Some(std::mem::take(buffer)))
    }

    fn respond(&mut self, request: Vec<u8>) -> Vec<u8> {
        if request == b"flood" {
            return (0..FLOOD_LEN).map(flood_byte).collect();
        }

        let mut response = b"echo:".to_vec();
        response.extend_from_slice(&request);
        response
    }

    fn encode(&mut self, response: Vec<u8>) -> Vec<u8> {
        response
    }
}
