//! Collaborator contracts for the event orchestrators.
//!
//! All traits use native `async fn` methods (Edition 2024), so they are used
//! through generics rather than as trait objects.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{ProcessingResult, ReaderFeedback};
use osdpwatch_core::ReaderId;

/// Business logic for one kind of read event (access decision plugin).
pub trait EventProcessor<E> {
    /// Decide on `event`.
    ///
    /// # Errors
    ///
    /// Any error is treated as a processor fault and replaced by a generic
    /// failed result.
    async fn process(&self, event: &E) -> Result<ProcessingResult>;
}

/// Persistence for processed events.
pub trait EventStore<E> {
    /// Store an event together with its successful business result.
    async fn persist_success(&self, event: &E, result: &ProcessingResult) -> Result<()>;

    /// Store an error record for an event whose processing failed.
    async fn persist_error(&self, event: &E, message: &str) -> Result<()>;
}

/// Feedback configuration keyed on the business outcome.
pub trait FeedbackResolver {
    async fn success_feedback(&self) -> ReaderFeedback;

    async fn failure_feedback(&self) -> ReaderFeedback;
}

/// Delivers feedback to a physical reader.
pub trait FeedbackSender {
    /// # Errors
    ///
    /// Returns an error if the reader is offline or rejects the command.
    async fn send(&self, reader_id: ReaderId, feedback: &ReaderFeedback) -> Result<()>;
}

/// Resolver returning fixed feedback for each outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFeedbackResolver {
    success: ReaderFeedback,
    failure: ReaderFeedback,
}

impl StaticFeedbackResolver {
    pub fn new(success: ReaderFeedback, failure: ReaderFeedback) -> Self {
        Self { success, failure }
    }
}

impl Default for StaticFeedbackResolver {
    fn default() -> Self {
        Self::new(ReaderFeedback::granted(), ReaderFeedback::denied())
    }
}

impl FeedbackResolver for StaticFeedbackResolver {
    async fn success_feedback(&self) -> ReaderFeedback {
        self.success.clone()
    }

    async fn failure_feedback(&self) -> ReaderFeedback {
        self.failure.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osdpwatch_core::LedColor;

    #[tokio::test]
    async fn test_static_resolver_defaults() {
        let resolver = StaticFeedbackResolver::default();
        assert_eq!(resolver.success_feedback().await.led, LedColor::Green);
        assert_eq!(resolver.failure_feedback().await.led, LedColor::Red);
    }

    #[tokio::test]
    async fn test_static_resolver_custom() {
        let resolver = StaticFeedbackResolver::new(
            ReaderFeedback::new(LedColor::Blue).message("Welcome"),
            ReaderFeedback::new(LedColor::Amber),
        );
        let success = resolver.success_feedback().await;
        assert_eq!(success.led, LedColor::Blue);
        assert_eq!(success.display_message.as_deref(), Some("Welcome"));
        assert_eq!(resolver.failure_feedback().await.led, LedColor::Amber);
    }
}
