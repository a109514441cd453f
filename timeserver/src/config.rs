//! Server configuration.

use crate::error::{Result, ServerError};

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Port used when none (or an unusable one) is given.
pub const DEFAULT_PORT: u16 = 8080;

/// Listen backlog.
pub const DEFAULT_BACKLOG: i32 = 1024;

/// Upper bound on a single poller wait; also how late a stop may be noticed
/// if the wake-up is lost.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Bytes requested from the socket per read.
pub const DEFAULT_READ_CHUNK: usize = 1024;

/// Settings for a [`Reactor`](crate::Reactor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    /// `0` asks the OS for an ephemeral port.
    pub port: u16,
    pub backlog: i32,
    pub poll_interval: Duration,
    pub read_chunk: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_chunk: DEFAULT_READ_CHUNK,
        }
    }
}

impl ServerConfig {
    /// Configuration for `host:port` with every other setting defaulted.
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            host,
            port,
            ..Self::default()
        }
    }

    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backlog <= 0 {
            return Err(ServerError::Config("backlog must be positive".to_string()));
        }

        if self.read_chunk == 0 {
            return Err(ServerError::Config("read chunk cannot be 0".to_string()));
        }

        if self.poll_interval.is_zero() {
            return Err(ServerError::Config(
                "poll interval cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parses the port argument.
///
/// Anything other than a positive integer that fits a port, including a
/// missing argument, yields [`DEFAULT_PORT`].
pub fn parse_port(arg: Option<&str>) -> u16 {
    arg.and_then(|s| s.trim().parse::<u16>().ok())
        .filter(|port| *port > 0)
        .unwrap_or(DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_when_absent_or_unusable() {
        assert_eq!(parse_port(None), DEFAULT_PORT);
        assert_eq!(parse_port(Some("")), DEFAULT_PORT);
        assert_eq!(parse_port(Some("abc")), DEFAULT_PORT);
        assert_eq!(parse_port(Some("-1")), DEFAULT_PORT);
        assert_eq!(parse_port(Some("0")), DEFAULT_PORT);
        assert_eq!(parse_port(Some("70000")), DEFAULT_PORT);
    }

    #[test]
    fn port_is_parsed() {
        assert_eq!(parse_port(Some("9000")), 9000);
        assert_eq!(parse_port(Some(" 9001 ")), 9001);
    }

    #[test]
    fn default_config_is_valid() {
        let config = ServerConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.address().port(), DEFAULT_PORT);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let base = ServerConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        assert!(base.validate().is_ok());

        let config = ServerConfig {
            backlog: 0,
            ..base.clone()
        };
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));

        let config = ServerConfig {
            read_chunk: 0,
            ..base.clone()
        };
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));

        let config = ServerConfig {
            poll_interval: Duration::ZERO,
            ..base
        };
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));
    }
}
