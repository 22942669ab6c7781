//! Common test utilities for trace integration tests.
//!
//! Frames in these tests use a compact test encoding instead of real OSDP
//! framing:
//!
//! ```text
//! [address, flags, sequence, code, payload...]
//! ```
//!
//! `flags` bit 0 marks a secure channel frame, bit 1 the default key.
//! Anything shorter than four bytes is unparsable.

#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, Utc};
use osdpwatch_core::{Error, ReaderId, Result, TracingSettings};
use osdpwatch_trace::{DecodedFrame, RawFrame, ReaderDirectory, StaticReaderDirectory, TraceService};

pub const POLL: u8 = 0x60;
pub const ID_REPORT: u8 = 0x61;
pub const ACK: u8 = 0x40;
pub const PDID: u8 = 0x45;

pub type TestDecoder = fn(&[u8]) -> Option<DecodedFrame>;

/// Decode the test encoding.
pub fn decode(raw: &[u8]) -> Option<DecodedFrame> {
    let [address, flags, sequence, code, payload @ ..] = raw else {
        return None;
    };
    let name = match *code {
        POLL => "osdp_POLL",
        ID_REPORT => "osdp_ID",
        ACK => "osdp_ACK",
        PDID => "osdp_PDID",
        _ => "osdp_UNKNOWN",
    };
    let mut frame = DecodedFrame::new(*address, *sequence, *code, name).with_payload(payload.to_vec());
    if flags & 0x01 != 0 {
        frame = frame.with_secure_channel(flags & 0x02 != 0);
    }
    Some(frame)
}

/// Panel → reader frame in the test encoding.
pub fn command(code: u8, sequence: u8) -> RawFrame {
    RawFrame::outbound(vec![0x01, 0x00, sequence, code])
}

/// Reader → panel frame in the test encoding.
pub fn reply(code: u8, sequence: u8) -> RawFrame {
    RawFrame::inbound(vec![0x81, 0x00, sequence, code])
}

pub fn service_with(
    settings: TracingSettings,
    readers: Vec<ReaderId>,
) -> TraceService<TestDecoder, StaticReaderDirectory> {
    TraceService::new(decode as TestDecoder, StaticReaderDirectory::new(readers), settings)
}

pub fn service() -> TraceService<TestDecoder, StaticReaderDirectory> {
    service_with(TracingSettings::default(), Vec::new())
}

pub fn at(t0: DateTime<Utc>, offset_ms: i64) -> DateTime<Utc> {
    t0 + TimeDelta::milliseconds(offset_ms)
}

/// Directory whose backing store is always down.
#[derive(Debug, Default)]
pub struct FailingDirectory;

impl ReaderDirectory for FailingDirectory {
    async fn list_enabled_readers(&self) -> Result<Vec<ReaderId>> {
        Err(Error::DirectoryUnavailable("connection refused".to_string()))
    }
}
