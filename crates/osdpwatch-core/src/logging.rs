//! Logging bootstrap.
//!
//! Libraries in this workspace only emit `tracing` events; the host process
//! decides where they go. [`init`] installs a formatted subscriber filtered by
//! `RUST_LOG`, falling back to the given default directive.

use crate::{Result, error::Error};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "info,osdpwatch_trace=debug";

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install the global subscriber with [`DEFAULT_DIRECTIVE`].
///
/// # Errors
/// See [`init_with_directive`].
pub fn init() -> Result<()> {
    init_with_directive(DEFAULT_DIRECTIVE)
}

/// Install the global subscriber. Calling it again is a no-op.
///
/// # Errors
/// Returns `Error::Logging` if the directive does not parse or another
/// subscriber was installed outside this function.
pub fn init_with_directive(directive: &str) -> Result<()> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .map_err(|e| Error::Logging(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    let _ = INSTALLED.set(());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init().unwrap();
        init().unwrap();
        tracing::info!("logging installed");
    }
}
