use crate::frame::DecodedFrame;
use chrono::{DateTime, Utc};
use osdpwatch_core::{FrameDirection, ReaderId, SecurityClassification};
use serde::Serialize;
use std::time::Duration;

/// One captured and decoded protocol frame.
///
/// Entries are immutable once built and are shared behind `Arc` between the
/// reader's buffer, its last-entry cursor and live capture notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    reader_id: ReaderId,
    reader_name: String,
    direction: FrameDirection,
    timestamp: DateTime<Utc>,
    #[serde(rename = "interval_ms", serialize_with = "serialize_millis")]
    interval: Duration,
    security: SecurityClassification,
    frame: DecodedFrame,
}

impl TraceEntry {
    /// Build an entry; the security classification is derived from the frame.
    pub fn new(
        reader_id: ReaderId,
        reader_name: impl Into<String>,
        direction: FrameDirection,
        timestamp: DateTime<Utc>,
        interval: Duration,
        frame: DecodedFrame,
    ) -> Self {
        let security = SecurityClassification::from_flags(frame.is_secure, frame.uses_default_key);
        Self {
            reader_id,
            reader_name: reader_name.into(),
            direction,
            timestamp,
            interval,
            security,
            frame,
        }
    }

    pub fn reader_id(&self) -> ReaderId {
        self.reader_id
    }

    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    pub fn direction(&self) -> FrameDirection {
        self.direction
    }

    /// Reception timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Time since the previous entry of the same reader (zero for the first).
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn security(&self) -> SecurityClassification {
        self.security
    }

    pub fn frame(&self) -> &DecodedFrame {
        &self.frame
    }
}

fn serialize_millis<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64() * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use osdpwatch_core::constants::OSDP_CMD_POLL;

    #[test]
    fn test_security_derived_from_frame() {
        let frame = DecodedFrame::new(0x01, 1, OSDP_CMD_POLL, "osdp_POLL").with_secure_channel(true);
        let entry = TraceEntry::new(
            ReaderId::new(),
            "Lobby",
            FrameDirection::Outbound,
            Utc::now(),
            Duration::ZERO,
            frame,
        );

        assert_eq!(entry.security(), SecurityClassification::SecureDefaultKey);
        assert_eq!(entry.reader_name(), "Lobby");
        assert!(entry.frame().is_poll());
    }

    #[test]
    fn test_serializes_interval_in_millis() {
        let entry = TraceEntry::new(
            ReaderId::new(),
            "Lobby",
            FrameDirection::Inbound,
            Utc::now(),
            Duration::from_micros(12_500),
            DecodedFrame::new(0x81, 1, 0x40, "osdp_ACK"),
        );
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["interval_ms"], 12.5);
        assert_eq!(json["direction"], "inbound");
        assert_eq!(json["security"], "clear_text");
    }
}
