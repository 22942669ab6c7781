//! Read event orchestration.
//!
//! [`EventOrchestrator`] runs one read event through three stages:
//!
//! 1. **Processing**: the [`EventProcessor`] decides. A processor fault is
//!    replaced by a failed result with a fixed message; the fault itself is
//!    only logged.
//! 2. **Persistence**: a successful result is stored with
//!    [`EventStore::persist_success`], a failed one with
//!    [`EventStore::persist_error`]. The outcome is recorded as a flag.
//! 3. **Feedback**: the [`FeedbackResolver`] picks the feedback for the
//!    outcome and the [`FeedbackSender`] delivers it to the originating
//!    reader. The outcome is recorded as a flag.
//!
//! No stage failure skips a later stage, and [`process_event`] never fails.
//!
//! [`process_event`]: EventOrchestrator::process_event

use crate::traits::{EventProcessor, EventStore, FeedbackResolver, FeedbackSender};
use crate::types::{CardReadEvent, EventProcessingResult, PinReadEvent, ProcessingResult, ReadEvent};
use osdpwatch_core::constants::PLUGIN_ERROR_MESSAGE;
use std::marker::PhantomData;
use tracing::{debug, error, warn};

/// Orchestrates processing, persistence and feedback for one event kind.
pub struct EventOrchestrator<E, P, S, R, F> {
    processor: P,
    store: S,
    resolver: R,
    sender: F,
    _event: PhantomData<fn(&E)>,
}

/// Orchestrator for card reads.
pub type CardReadOrchestrator<P, S, R, F> = EventOrchestrator<CardReadEvent, P, S, R, F>;

/// Orchestrator for PIN reads.
pub type PinReadOrchestrator<P, S, R, F> = EventOrchestrator<PinReadEvent, P, S, R, F>;

impl<E, P, S, R, F> EventOrchestrator<E, P, S, R, F>
where
    E: ReadEvent,
    P: EventProcessor<E>,
    S: EventStore<E>,
    R: FeedbackResolver,
    F: FeedbackSender,
{
    pub fn new(processor: P, store: S, resolver: R, sender: F) -> Self {
        Self {
            processor,
            store,
            resolver,
            sender,
            _event: PhantomData,
        }
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sender(&self) -> &F {
        &self.sender
    }

    /// Run `event` through processing, persistence and feedback delivery.
    pub async fn process_event(&self, event: &E) -> EventProcessingResult {
        let reader_id = event.reader_id();
        let kind = E::KIND;

        let processing_result = match self.processor.process(event).await {
            Ok(result) => result,
            Err(e) => {
                error!(%reader_id, %kind, error = %e, "Event processor failed");
                ProcessingResult::failure(PLUGIN_ERROR_MESSAGE)
            }
        };

        let persisted = if processing_result.success {
            self.store.persist_success(event, &processing_result).await
        } else {
            self.store.persist_error(event, &processing_result.message).await
        };
        let persistence_successful = match persisted {
            Ok(()) => true,
            Err(e) => {
                warn!(%reader_id, %kind, error = %e, "Failed to persist event");
                false
            }
        };

        let feedback = if processing_result.success {
            self.resolver.success_feedback().await
        } else {
            self.resolver.failure_feedback().await
        };
        let feedback_delivery_successful = match self.sender.send(reader_id, &feedback).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%reader_id, %kind, error = %e, "Failed to deliver reader feedback");
                false
            }
        };

        debug!(
            %reader_id,
            reader_name = event.reader_name(),
            %kind,
            success = processing_result.success,
            persistence_successful,
            feedback_delivery_successful,
            "Event processed"
        );

        EventProcessingResult {
            kind,
            processing_result,
            feedback,
            persistence_successful,
            feedback_delivery_successful,
        }
    }
}
