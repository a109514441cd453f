//! Request/response boundary between the reactor and the application.
//!
//! The reactor only moves bytes. A [`Protocol`] turns the bytes read from a
//! connection into requests, answers them, and turns the answers back into
//! bytes. [`TimeProtocol`] is the time service: a case-insensitive
//! `QUERY TIME ORDER` is answered with the current time, anything else with
//! `BAD ORDER`.

use crate::error::CodecError;

use chrono::{DateTime, Utc};
use tracing::debug;

/// The command answered with the current time.
pub const QUERY_TIME_ORDER: &str = "QUERY TIME ORDER";

/// Reply to any other request.
pub const BAD_ORDER: &str = "BAD ORDER";

/// Format of the time reply, e.g. `Mon Oct 19 13:56:02 UTC 2026`.
pub const TIME_FORMAT: &str = "%a %b %d %H:%M:%S UTC %Y";

/// Application protocol driven by the reactor.
///
/// All three methods run synchronously on the reactor thread and must not
/// block.
pub trait Protocol {
    type Request;
    type Response;

    /// Takes one request off the front of `buffer`.
    ///
    /// Returns `Ok(None)` when more bytes are needed. Consumed bytes must be
    /// removed from `buffer`. An error closes the connection.
    fn decode(&mut self, buffer: &mut Vec<u8>) -> Result<Option<Self::Request>, CodecError>;

    /// Produces the response to a request.
    fn respond(&mut self, request: Self::Request) -> Self::Response;

    /// Serialises a response.
    fn encode(&mut self, response: Self::Response) -> Vec<u8>;
}

/// A decoded time service request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeRequest {
    QueryTime,
    Other(String),
}

/// A time service response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeResponse {
    Time(DateTime<Utc>),
    BadOrder,
}

/// The time service.
///
/// Every read is one whole request, compared with the command exactly up
/// to ASCII case. Nothing is trimmed, not even a line terminator.
#[derive(Clone, Copy)]
pub struct TimeProtocol {
    clock: fn() -> DateTime<Utc>,
}

impl TimeProtocol {
    pub fn new() -> Self {
        Self { clock: Utc::now }
    }

    /// Uses `clock` instead of the system clock.
    pub fn with_clock(clock: fn() -> DateTime<Utc>) -> Self {
        Self { clock }
    }
}

impl Default for TimeProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for TimeProtocol {
    type Request = TimeRequest;
    type Response = TimeResponse;

    fn decode(&mut self, buffer: &mut Vec<u8>) -> Result<Option<TimeRequest>, CodecError> {
        if buffer.is_empty() {
            return Ok(None);
        }

        let bytes = std::mem::take(buffer);
        let body = std::str::from_utf8(&bytes)?;
        debug!("received order: {:?}", body);

        if body.eq_ignore_ascii_case(QUERY_TIME_ORDER) {
            Ok(Some(TimeRequest::QueryTime))
        } else {
            Ok(Some(TimeRequest::Other(body.to_string())))
        }
    }

    fn respond(&mut self, request: TimeRequest) -> TimeResponse {
        match request {
            TimeRequest::QueryTime => TimeResponse::Time((self.clock)()),
            TimeRequest::Other(_) => TimeResponse::BadOrder,
        }
    }

    fn encode(&mut self, response: TimeResponse) -> Vec<u8> {
        match response {
            TimeResponse::Time(now) => now.format(TIME_FORMAT).to_string().into_bytes(),
            TimeResponse::BadOrder => BAD_ORDER.as_bytes().to_vec(),
        }
    }
}
