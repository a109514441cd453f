//! Time server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port (8080)
//! timeserver
//!
//! # Listen on port 9000, logging every order
//! timeserver 9000 --log-level debug
//! ```

use clap::Parser;
use std::net::IpAddr;
use std::time::Duration;
use timeserver::config::{DEFAULT_BACKLOG, DEFAULT_POLL_INTERVAL};
use timeserver::{Reactor, ServerConfig, TimeProtocol, init_tracing, parse_port};

/// Single-threaded TCP time server
#[derive(Parser, Debug)]
#[command(name = "timeserver")]
#[command(about = "Answers QUERY TIME ORDER with the current time")]
#[command(version)]
struct Args {
    /// Port to listen on; anything other than a positive integer falls back to 8080
    #[arg(allow_hyphen_values = true)]
    port: Option<String>,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Listen backlog
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    backlog: i32,

    /// Upper bound on a single poller wait, in milliseconds
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    poll_interval_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    init_tracing(&args.log_level)?;

    let config = ServerConfig {
        backlog: args.backlog,
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        ..ServerConfig::new(args.host, parse_port(args.port.as_deref()))
    };

    tracing::info!("time server starting on port {}", config.port);

    let reactor = Reactor::bind(&config, TimeProtocol::new())?;
    reactor.run()?;

    Ok(())
}
