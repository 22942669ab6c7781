//! Read events, processing results and reader feedback.

use chrono::{DateTime, Utc};
use osdpwatch_core::{LedColor, ReaderId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Kind of reader-originated event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CardRead,
    PinRead,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventKind::CardRead => write!(f, "card read"),
            EventKind::PinRead => write!(f, "PIN read"),
        }
    }
}

/// Common view of a read event, used by the orchestrator.
pub trait ReadEvent {
    const KIND: EventKind;

    /// Reader the event originated from; feedback is sent back to it.
    fn reader_id(&self) -> ReaderId;

    fn reader_name(&self) -> &str;
}

/// A credential presented at a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardReadEvent {
    pub reader_id: ReaderId,
    pub reader_name: String,

    /// Card number as reported by the reader, hex or decimal.
    pub card_number: String,

    /// Credential format length in bits (26 for H10301, etc).
    pub bit_count: u16,

    pub occurred_at: DateTime<Utc>,
}

impl CardReadEvent {
    pub fn new(
        reader_id: ReaderId,
        reader_name: impl Into<String>,
        card_number: impl Into<String>,
        bit_count: u16,
    ) -> Self {
        Self {
            reader_id,
            reader_name: reader_name.into(),
            card_number: card_number.into(),
            bit_count,
            occurred_at: Utc::now(),
        }
    }
}

impl ReadEvent for CardReadEvent {
    const KIND: EventKind = EventKind::CardRead;

    fn reader_id(&self) -> ReaderId {
        self.reader_id
    }

    fn reader_name(&self) -> &str {
        &self.reader_name
    }
}

/// A PIN entered on a reader keypad.
///
/// `Debug` masks the PIN.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinReadEvent {
    pub reader_id: ReaderId,
    pub reader_name: String,
    pub pin: String,
    pub occurred_at: DateTime<Utc>,
}

impl PinReadEvent {
    pub fn new(reader_id: ReaderId, reader_name: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            reader_id,
            reader_name: reader_name.into(),
            pin: pin.into(),
            occurred_at: Utc::now(),
        }
    }
}

impl fmt::Debug for PinReadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinReadEvent")
            .field("reader_id", &self.reader_id)
            .field("reader_name", &self.reader_name)
            .field("pin", &"****")
            .field("occurred_at", &self.occurred_at)
            .finish()
    }
}

impl ReadEvent for PinReadEvent {
    const KIND: EventKind = EventKind::PinRead;

    fn reader_id(&self) -> ReaderId {
        self.reader_id
    }

    fn reader_name(&self) -> &str {
        &self.reader_name
    }
}

/// Business decision returned by an event processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub message: String,
}

impl ProcessingResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Physical feedback sent back to a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderFeedback {
    pub led: LedColor,
    pub beep_count: u8,
    pub display_message: Option<String>,

    /// How long the LED stays on.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl ReaderFeedback {
    pub fn new(led: LedColor) -> Self {
        Self {
            led,
            beep_count: 0,
            display_message: None,
            duration: Duration::from_secs(1),
        }
    }

    /// Green LED with a single beep.
    pub fn granted() -> Self {
        Self::new(LedColor::Green).beeps(1)
    }

    /// Red LED with three beeps.
    pub fn denied() -> Self {
        Self::new(LedColor::Red).beeps(3)
    }

    pub fn beeps(mut self, count: u8) -> Self {
        self.beep_count = count;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.display_message = Some(message.into());
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Outcome of one orchestrated read event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventProcessingResult {
    pub kind: EventKind,
    pub processing_result: ProcessingResult,
    pub feedback: ReaderFeedback,
    pub persistence_successful: bool,
    pub feedback_delivery_successful: bool,
}

impl EventProcessingResult {
    /// Business success, persisted and delivered.
    pub fn is_fully_successful(&self) -> bool {
        self.processing_result.success
            && self.persistence_successful
            && self.feedback_delivery_successful
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_event_kinds() {
        assert_eq!(CardReadEvent::KIND, EventKind::CardRead);
        assert_eq!(PinReadEvent::KIND, EventKind::PinRead);
        assert_eq!(EventKind::PinRead.to_string(), "PIN read");
    }

    #[test]
    fn test_pin_is_masked_in_debug() {
        let event = PinReadEvent::new(ReaderId::new(), "Keypad", "4711");
        let debug = format!("{event:?}");
        assert!(!debug.contains("4711"));
        assert!(debug.contains("****"));
    }

    #[test]
    fn test_feedback_presets() {
        let granted = ReaderFeedback::granted();
        assert_eq!(granted.led, LedColor::Green);
        assert_eq!(granted.beep_count, 1);

        let denied = ReaderFeedback::denied().message("Access denied");
        assert_eq!(denied.led, LedColor::Red);
        assert_eq!(denied.beep_count, 3);
        assert_eq!(denied.display_message.as_deref(), Some("Access denied"));
    }

    #[test]
    fn test_feedback_duration_serialized_as_millis() {
        let feedback = ReaderFeedback::granted().duration(Duration::from_millis(2500));
        let json = serde_json::to_value(&feedback).unwrap();
        assert_eq!(json["duration"], 2500);
        assert_eq!(json["led"], "green");

        let back: ReaderFeedback = serde_json::from_value(json).unwrap();
        assert_eq!(back, feedback);
    }

    #[test]
    fn test_fully_successful() {
        let result = EventProcessingResult {
            kind: EventKind::CardRead,
            processing_result: ProcessingResult::success("Granted"),
            feedback: ReaderFeedback::granted(),
            persistence_successful: true,
            feedback_delivery_successful: true,
        };
        assert!(result.is_fully_successful());

        let undelivered = EventProcessingResult {
            feedback_delivery_successful: false,
            ..result
        };
        assert!(!undelivered.is_fully_successful());
    }
}
