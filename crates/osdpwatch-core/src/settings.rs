//! Tracing configuration.
//!
//! [`TracingSettings`] is an immutable snapshot: the trace service swaps the
//! whole value on update, so readers never observe a half-applied change.
//! Durations are (de)serialized as milliseconds.
//!
//! # Example
//!
//! ```
//! use osdpwatch_core::{EvictionMode, TracingSettings};
//! use std::time::Duration;
//!
//! let settings = TracingSettings::default()
//!     .max_entries_per_reader(500)
//!     .eviction_mode(EvictionMode::Hybrid)
//!     .max_age(Some(Duration::from_secs(600)));
//!
//! assert!(settings.validate().is_ok());
//! ```

use crate::constants::{
    DEFAULT_MAX_AGE, DEFAULT_MAX_ENTRIES_PER_READER, DEFAULT_MAX_MEMORY_PER_READER_BYTES,
    DEFAULT_MAX_TOTAL_ENTRIES, DEFAULT_MEMORY_LIMIT_BYTES, DEFAULT_SWEEP_INTERVAL,
    ESTIMATED_ENTRY_BYTES,
};
use crate::{Result, error::Error};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which limits a trace buffer enforces.
///
/// Capacity (max entries) is a hard ring bound in every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionMode {
    /// Entry count and memory caps, checked on insert.
    #[default]
    SizeOnly,
    /// Age cap only, checked by the periodic sweep.
    AgeOnly,
    /// Both of the above.
    Hybrid,
}

impl EvictionMode {
    /// Whether the per-reader memory cap is enforced on insert.
    #[must_use]
    pub fn enforces_size(self) -> bool {
        matches!(self, EvictionMode::SizeOnly | EvictionMode::Hybrid)
    }

    /// Whether the age sweep evicts entries.
    #[must_use]
    pub fn enforces_age(self) -> bool {
        matches!(self, EvictionMode::AgeOnly | EvictionMode::Hybrid)
    }
}

/// Process-wide tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingSettings {
    /// Master switch; when off, captures are ignored for every reader.
    pub enabled: bool,

    /// Hide `osdp_POLL` commands from trace views and exports.
    pub filter_poll_commands: bool,

    /// Hide `osdp_ACK` replies from trace views and exports.
    pub filter_ack_replies: bool,

    /// Memory budget across all readers.
    pub memory_limit_bytes: usize,

    /// Ring capacity of each reader buffer.
    pub max_entries_per_reader: usize,

    /// Entry cap across all readers.
    pub max_total_entries: usize,

    /// Memory budget of a single reader buffer.
    pub max_memory_per_reader_bytes: usize,

    /// Maximum entry age for age-based eviction.
    #[serde(with = "millis_opt")]
    pub max_age: Option<Duration>,

    pub eviction_mode: EvictionMode,

    /// Keep the raw frame bytes alongside the decoded frame.
    pub capture_raw_data: bool,

    /// Keep decoded payload bytes; when off only header fields are stored.
    pub decode_payloads: bool,

    /// Interval between age sweeps.
    #[serde(with = "millis")]
    pub sweep_interval: Duration,
}

impl Default for TracingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            filter_poll_commands: false,
            filter_ack_replies: false,
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            max_entries_per_reader: DEFAULT_MAX_ENTRIES_PER_READER,
            max_total_entries: DEFAULT_MAX_TOTAL_ENTRIES,
            max_memory_per_reader_bytes: DEFAULT_MAX_MEMORY_PER_READER_BYTES,
            max_age: Some(DEFAULT_MAX_AGE),
            eviction_mode: EvictionMode::SizeOnly,
            capture_raw_data: true,
            decode_payloads: true,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl TracingSettings {
    /// Parse and validate settings from JSON. Missing keys take defaults.
    ///
    /// # Errors
    /// Returns `Error::Json` on malformed input and `Error::Config` if the
    /// parsed values fail [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    /// Returns `Error::Json` if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the settings for values no buffer could honour.
    ///
    /// # Errors
    /// Returns `Error::Config` describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries_per_reader == 0 {
            return Err(Error::Config(
                "max_entries_per_reader must be greater than zero".to_string(),
            ));
        }
        if self.max_total_entries < self.max_entries_per_reader {
            return Err(Error::Config(format!(
                "max_total_entries ({}) must be at least max_entries_per_reader ({})",
                self.max_total_entries, self.max_entries_per_reader
            )));
        }
        if self.memory_limit_bytes < ESTIMATED_ENTRY_BYTES
            || self.max_memory_per_reader_bytes < ESTIMATED_ENTRY_BYTES
        {
            return Err(Error::Config(format!(
                "memory limits must hold at least one entry ({ESTIMATED_ENTRY_BYTES} bytes)"
            )));
        }
        if self.sweep_interval.is_zero() {
            return Err(Error::Config(
                "sweep_interval must be greater than zero".to_string(),
            ));
        }
        if self.eviction_mode.enforces_age() && self.max_age.is_none_or(|age| age.is_zero()) {
            return Err(Error::Config(format!(
                "eviction mode {:?} requires a non-zero max_age",
                self.eviction_mode
            )));
        }
        Ok(())
    }

    /// Set the master switch
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set whether polls are hidden from views
    pub fn filter_poll_commands(mut self, filter: bool) -> Self {
        self.filter_poll_commands = filter;
        self
    }

    /// Set whether acks are hidden from views
    pub fn filter_ack_replies(mut self, filter: bool) -> Self {
        self.filter_ack_replies = filter;
        self
    }

    /// Set the memory budget across all readers
    pub fn memory_limit_bytes(mut self, bytes: usize) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }

    /// Set the ring capacity of each reader buffer
    pub fn max_entries_per_reader(mut self, max: usize) -> Self {
        self.max_entries_per_reader = max;
        self
    }

    /// Set the entry cap across all readers
    pub fn max_total_entries(mut self, max: usize) -> Self {
        self.max_total_entries = max;
        self
    }

    /// Set the memory budget of a single reader
    pub fn max_memory_per_reader_bytes(mut self, bytes: usize) -> Self {
        self.max_memory_per_reader_bytes = bytes;
        self
    }

    /// Set the maximum entry age
    pub fn max_age(mut self, age: Option<Duration>) -> Self {
        self.max_age = age;
        self
    }

    /// Set the eviction mode
    pub fn eviction_mode(mut self, mode: EvictionMode) -> Self {
        self.eviction_mode = mode;
        self
    }

    /// Set whether raw frame bytes are kept
    pub fn capture_raw_data(mut self, capture: bool) -> Self {
        self.capture_raw_data = capture;
        self
    }

    /// Set whether payload bytes are kept
    pub fn decode_payloads(mut self, decode: bool) -> Self {
        self.decode_payloads = decode;
        self
    }

    /// Set the age sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod millis_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
