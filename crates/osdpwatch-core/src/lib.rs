//! Shared building blocks for the osdpwatch reader diagnostics stack.
//!
//! This crate holds the identifiers, enums, protocol constants and tracing
//! configuration used by both the trace pipeline (`osdpwatch-trace`) and the
//! event orchestrators (`osdpwatch-events`).

pub mod constants;
pub mod error;
pub mod logging;
pub mod settings;
pub mod types;

pub use error::{Error, Result};
pub use settings::{EvictionMode, TracingSettings};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
