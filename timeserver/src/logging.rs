//! Tracing setup for the binary.

use crate::error::{Result, ServerError};

use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Fails if a subscriber is
/// already installed.
pub fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| ServerError::Config(e.to_string()))?;

    debug!("tracing initialized with level: {}", level);
    Ok(())
}
