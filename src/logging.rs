//! Subscriber setup for the `tracing` events emitted by the engine.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{DecodeError, Result};

/// Install a stderr formatter. `RUST_LOG` overrides `default_level`
/// (e.g. `"info"` or `"audio_decoder=debug"`).
///
/// Fails instead of panicking if a global subscriber is already set.
pub fn init_logging(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| DecodeError::Logging(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| DecodeError::Logging(e.to_string()))
}
