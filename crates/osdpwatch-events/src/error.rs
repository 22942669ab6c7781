//! Error types for event collaborators.
//!
//! Collaborators report faults with [`EventError`]. The orchestrator never
//! propagates them: each fault is logged and folded into the
//! [`EventProcessingResult`](crate::types::EventProcessingResult).

/// Result type alias for collaborator calls.
pub type Result<T> = std::result::Result<T, EventError>;

/// Faults raised by the collaborators of an event orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Business processor (plugin) failed.
    #[error("Processor error: {message}")]
    Processor { message: String },

    /// Event store failed to persist a record.
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Feedback could not be delivered to the reader.
    #[error("Feedback delivery error: {message}")]
    Delivery { message: String },

    /// Error from the shared core crate.
    #[error(transparent)]
    Core(#[from] osdpwatch_core::Error),
}

impl EventError {
    pub fn processor(message: impl Into<String>) -> Self {
        Self::Processor {
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
        }
    }
}
