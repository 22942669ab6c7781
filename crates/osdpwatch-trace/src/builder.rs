//! Trace entry construction.
//!
//! [`TraceEntryBuilder`] turns a [`RawFrame`] into a [`TraceEntry`]. It keeps
//! no per-reader state: the caller passes the reader's previous entry so the
//! inter-packet interval can be computed, and keeps the result as the new
//! cursor.

use crate::entry::TraceEntry;
use crate::frame::{FrameDecoder, RawFrame};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use osdpwatch_core::{ReaderId, TracingSettings};
use std::time::Duration;

/// Result of trying to build an entry from a captured frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Frame decoded into a complete entry.
    Built(TraceEntry),
    /// Frame could not be decoded; the caller drops it.
    Dropped,
}

impl BuildOutcome {
    /// Returns the entry, if one was built.
    pub fn into_entry(self) -> Option<TraceEntry> {
        match self {
            BuildOutcome::Built(entry) => Some(entry),
            BuildOutcome::Dropped => None,
        }
    }
}

/// A frame as received for one reader.
#[derive(Debug, Clone, Copy)]
pub struct FrameCapture<'a> {
    pub frame: &'a RawFrame,
    pub reader_id: ReaderId,
    pub reader_name: &'a str,
    pub received_at: DateTime<Utc>,
}

/// Builds trace entries with a reusable decoder.
#[derive(Debug, Clone)]
pub struct TraceEntryBuilder<D> {
    decoder: D,
}

impl<D: FrameDecoder> TraceEntryBuilder<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Decode `capture.frame` and build an entry.
    ///
    /// The interval is measured from `previous` and clamped to zero if the
    /// clock went backwards. Raw bytes and payload are kept or stripped
    /// according to `settings`.
    pub fn build(
        &self,
        capture: FrameCapture<'_>,
        previous: Option<&TraceEntry>,
        settings: &TracingSettings,
    ) -> BuildOutcome {
        let Some(mut frame) = self.decoder.try_decode(&capture.frame.bytes) else {
            return BuildOutcome::Dropped;
        };

        if settings.capture_raw_data {
            if frame.raw.is_none() {
                frame.raw = Some(capture.frame.bytes.clone());
            }
        } else {
            frame.raw = None;
        }

        if !settings.decode_payloads {
            frame.payload = Bytes::new();
        }

        let interval = previous
            .and_then(|prev| (capture.received_at - prev.timestamp()).to_std().ok())
            .unwrap_or(Duration::ZERO);

        BuildOutcome::Built(TraceEntry::new(
            capture.reader_id,
            capture.reader_name,
            capture.frame.direction(),
            capture.received_at,
            interval,
            frame,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::DecodedFrame;
    use chrono::TimeDelta;
    use osdpwatch_core::{FrameDirection, SecurityClassification};

    /// First byte is the address, second the code, the rest is payload.
    fn decode(raw: &[u8]) -> Option<DecodedFrame> {
        match raw {
            [address, code, payload @ ..] => Some(
                DecodedFrame::new(*address, 0, *code, format!("osdp_{code:02X}"))
                    .with_payload(payload.to_vec()),
            ),
            _ => None,
        }
    }

    fn builder() -> TraceEntryBuilder<fn(&[u8]) -> Option<DecodedFrame>> {
        TraceEntryBuilder::new(decode as fn(&[u8]) -> Option<DecodedFrame>)
    }

    fn capture<'a>(frame: &'a RawFrame, at: DateTime<Utc>) -> FrameCapture<'a> {
        FrameCapture {
            frame,
            reader_id: ReaderId::new(),
            reader_name: "Dock",
            received_at: at,
        }
    }

    #[test]
    fn test_unparsable_frame_is_dropped() {
        let frame = RawFrame::outbound(vec![0x01]);
        let outcome = builder().build(capture(&frame, Utc::now()), None, &TracingSettings::default());
        assert_eq!(outcome, BuildOutcome::Dropped);
    }

    #[test]
    fn test_first_entry_has_zero_interval() {
        let frame = RawFrame::outbound(vec![0x01, 0x60]);
        let entry = builder()
            .build(capture(&frame, Utc::now()), None, &TracingSettings::default())
            .into_entry()
            .unwrap();

        assert_eq!(entry.interval(), Duration::ZERO);
        assert_eq!(entry.direction(), FrameDirection::Outbound);
        assert_eq!(entry.security(), SecurityClassification::ClearText);
    }

    #[test]
    fn test_interval_measured_from_previous_entry() {
        let settings = TracingSettings::default();
        let t0 = Utc::now();
        let first_raw = RawFrame::outbound(vec![0x01, 0x60]);
        let second_raw = RawFrame::inbound(vec![0x81, 0x40]);

        let first = builder()
            .build(capture(&first_raw, t0), None, &settings)
            .into_entry()
            .unwrap();
        let second = builder()
            .build(
                capture(&second_raw, t0 + TimeDelta::milliseconds(35)),
                Some(&first),
                &settings,
            )
            .into_entry()
            .unwrap();

        assert_eq!(second.interval(), Duration::from_millis(35));
        assert_eq!(second.direction(), FrameDirection::Inbound);
    }

    #[test]
    fn test_backwards_clock_clamps_interval() {
        let settings = TracingSettings::default();
        let t0 = Utc::now();
        let raw = RawFrame::outbound(vec![0x01, 0x60]);

        let first = builder()
            .build(capture(&raw, t0), None, &settings)
            .into_entry()
            .unwrap();
        let second = builder()
            .build(capture(&raw, t0 - TimeDelta::seconds(1)), Some(&first), &settings)
            .into_entry()
            .unwrap();

        assert_eq!(second.interval(), Duration::ZERO);
    }

    #[test]
    fn test_capture_toggles_strip_raw_and_payload() {
        let raw = RawFrame::outbound(vec![0x01, 0x6A, 0xAA, 0xBB]);

        let full = builder()
            .build(capture(&raw, Utc::now()), None, &TracingSettings::default())
            .into_entry()
            .unwrap();
        assert_eq!(full.frame().raw.as_deref(), Some(&[0x01, 0x6A, 0xAA, 0xBB][..]));
        assert_eq!(&full.frame().payload[..], &[0xAA, 0xBB]);

        let settings = TracingSettings::default()
            .capture_raw_data(false)
            .decode_payloads(false);
        let stripped = builder()
            .build(capture(&raw, Utc::now()), None, &settings)
            .into_entry()
            .unwrap();
        assert!(stripped.frame().raw.is_none());
        assert!(stripped.frame().payload.is_empty());
        assert_eq!(stripped.frame().code, 0x6A);
    }
}
