//! Error types.
//!
//! Errors are split by blast radius: [`ServerError`] stops the process,
//! [`ConnectionError`] only ever closes the connection it came from.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Fatal server errors.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to create readiness poller: {0}")]
    PollerInit(#[source] io::Error),

    #[error("readiness poller failed: {0}")]
    Poll(#[source] io::Error),

    #[error("failed to close readiness poller: {0}")]
    PollerClose(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Request decoding failures.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("request is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Faults confined to a single connection.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("decode error: {0}")]
    Codec(#[from] CodecError),

    #[error("failed to update registration: {0}")]
    Register(#[source] io::Error),
}

/// Server result type.
pub type Result<T> = std::result::Result<T, ServerError>;
