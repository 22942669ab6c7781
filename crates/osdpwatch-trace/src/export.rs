//! Trace export.
//!
//! Two formats are supported:
//!
//! - a human-readable text report, one block per frame, oldest first
//! - JSON lines, one serialized [`TraceEntry`] per line
//!
//! # Text report layout
//!
//! ```text
//! OSDP trace export
//! Generated: 2025-10-27 14:30:00.000 UTC
//! Packets: 2
//! ------------------------------------------------------------
//! 2025-10-27 14:29:59.950 UTC  TX  Lobby [5b1e...]
//!     osdp_POLL (0x60)  addr 0x01  seq 1  clear-text
//!
//! 2025-10-27 14:30:00.000 UTC  RX  Lobby [5b1e...]
//!     osdp_ACK (0x40)  addr 0x81  seq 1  clear-text
//!     interval: 50.000 ms
//! ```

use crate::entry::TraceEntry;
use crate::frame::hex_string;
use chrono::{DateTime, Utc};
use osdpwatch_core::Result;
use std::io::{self, Write};
use std::sync::Arc;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f UTC";
const SEPARATOR: &str = "------------------------------------------------------------";

/// Write a text report of `entries` (expected oldest-first).
pub fn write_text_report<W: Write>(
    out: &mut W,
    entries: &[Arc<TraceEntry>],
    generated_at: DateTime<Utc>,
) -> io::Result<()> {
    writeln!(out, "OSDP trace export")?;
    writeln!(out, "Generated: {}", generated_at.format(TIMESTAMP_FORMAT))?;
    writeln!(out, "Packets: {}", entries.len())?;
    writeln!(out, "{SEPARATOR}")?;

    for (index, entry) in entries.iter().enumerate() {
        if index > 0 {
            writeln!(out)?;
        }
        write_packet(out, entry)?;
    }
    Ok(())
}

fn write_packet<W: Write>(out: &mut W, entry: &TraceEntry) -> io::Result<()> {
    let frame = entry.frame();
    writeln!(
        out,
        "{}  {}  {} [{}]",
        entry.timestamp().format(TIMESTAMP_FORMAT),
        entry.direction().label(),
        entry.reader_name(),
        entry.reader_id(),
    )?;
    let broadcast = if frame.is_broadcast() { " (broadcast)" } else { "" };
    writeln!(
        out,
        "    {} (0x{:02X})  addr 0x{:02X}{}  seq {}  {}",
        frame.name,
        frame.code,
        frame.address,
        broadcast,
        frame.sequence,
        entry.security(),
    )?;
    if !entry.interval().is_zero() {
        writeln!(
            out,
            "    interval: {:.3} ms",
            entry.interval().as_secs_f64() * 1000.0
        )?;
    }
    if !frame.payload.is_empty() {
        writeln!(out, "    data: {}", hex_string(&frame.payload))?;
    }
    if let Some(raw) = &frame.raw {
        writeln!(out, "    raw:  {}", hex_string(raw))?;
    }
    Ok(())
}

/// Render a text report into a `String`.
pub fn render_text_report(entries: &[Arc<TraceEntry>], generated_at: DateTime<Utc>) -> String {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_text_report(&mut out, entries, generated_at);
    String::from_utf8_lossy(&out).into_owned()
}

/// Write `entries` as JSON lines.
///
/// # Errors
/// Returns `Error::Json` if an entry fails to serialize and `Error::Io` if
/// the writer fails.
pub fn write_json_lines<W: Write>(out: &mut W, entries: &[Arc<TraceEntry>]) -> Result<()> {
    for entry in entries {
        serde_json::to_writer(&mut *out, entry.as_ref())?;
        out.write_all(b"\n")?;
    }
    Ok(())
}
