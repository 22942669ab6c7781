//! Protocol and sizing constants.
//!
//! The OSDP command/reply codes listed here are the handful the diagnostics
//! pipeline needs to recognise on its own (poll/ack noise filtering and
//! reply address detection). Full wire decoding lives outside this workspace.
//!
//! # Usage
//!
//! ```
//! use osdpwatch_core::constants::*;
//!
//! assert_eq!(OSDP_CMD_POLL, 0x60);
//! assert_eq!(ESTIMATED_ENTRY_BYTES, ENTRY_OVERHEAD_BYTES + AVERAGE_PAYLOAD_BYTES);
//! ```

use std::time::Duration;

// ============================================================================
// OSDP codes
// ============================================================================

/// `osdp_POLL` command code.
///
/// Sent by the control panel on every bus cycle. The bulk of a trace is
/// polls answered by acks, which is why both can be filtered from views.
pub const OSDP_CMD_POLL: u8 = 0x60;

/// `osdp_ACK` reply code.
pub const OSDP_REPLY_ACK: u8 = 0x40;

/// `osdp_NAK` reply code.
pub const OSDP_REPLY_NAK: u8 = 0x41;

/// Bit set in the address byte of every frame sent by a reader (PD).
pub const OSDP_REPLY_ADDRESS_MASK: u8 = 0x80;

/// Broadcast address used by the control panel.
pub const OSDP_BROADCAST_ADDRESS: u8 = 0x7F;

// ============================================================================
// Memory estimation
// ============================================================================

/// Fixed cost of one trace entry (timestamps, enums, Arc header, reader name).
pub const ENTRY_OVERHEAD_BYTES: usize = 128;

/// Average decoded payload size observed on typical reader traffic.
pub const AVERAGE_PAYLOAD_BYTES: usize = 64;

/// Per-entry memory estimate used by trace buffers.
///
/// Deliberately approximate: it only gates a soft operational limit.
pub const ESTIMATED_ENTRY_BYTES: usize = ENTRY_OVERHEAD_BYTES + AVERAGE_PAYLOAD_BYTES;

// ============================================================================
// Tracing defaults
// ============================================================================

/// Default ring capacity per reader.
pub const DEFAULT_MAX_ENTRIES_PER_READER: usize = 1_000;

/// Default cap across all readers.
pub const DEFAULT_MAX_TOTAL_ENTRIES: usize = 10_000;

/// Default total memory budget for all trace buffers (10 MiB).
pub const DEFAULT_MEMORY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Default memory budget for a single reader (2 MiB).
pub const DEFAULT_MAX_MEMORY_PER_READER_BYTES: usize = 2 * 1024 * 1024;

/// Default maximum entry age for age-based eviction (1 hour).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Default interval between age sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Capacity of the capture notification channel.
///
/// Subscribers falling further behind than this lose the oldest notifications.
pub const NOTIFICATION_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// Event processing
// ============================================================================

/// Message substituted for any business processor failure.
pub const PLUGIN_ERROR_MESSAGE: &str = "Plugin processing error occurred";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_mask_does_not_collide_with_broadcast() {
        assert_eq!(OSDP_BROADCAST_ADDRESS & OSDP_REPLY_ADDRESS_MASK, 0);
    }

    #[test]
    fn test_default_limits_are_consistent() {
        assert!(DEFAULT_MAX_ENTRIES_PER_READER <= DEFAULT_MAX_TOTAL_ENTRIES);
        assert!(DEFAULT_MAX_MEMORY_PER_READER_BYTES <= DEFAULT_MEMORY_LIMIT_BYTES);
        assert!(DEFAULT_SWEEP_INTERVAL < DEFAULT_MAX_AGE);
    }
}
