//! Card and PIN read event orchestration.
//!
//! Turns a reader-originated read event into a business decision, a
//! persisted record and physical feedback to the reader. Each stage is an
//! injected collaborator (see [`traits`]); a failing stage is logged and
//! recorded on the [`EventProcessingResult`] without stopping the others.
//!
//! # Examples
//!
//! ```
//! use osdpwatch_core::ReaderId;
//! use osdpwatch_events::{
//!     CardReadEvent, CardReadOrchestrator, EventOrchestrator, EventProcessor, EventStore,
//!     FeedbackSender, ProcessingResult, ReaderFeedback, Result, StaticFeedbackResolver,
//! };
//!
//! struct AllowAll;
//! impl EventProcessor<CardReadEvent> for AllowAll {
//!     async fn process(&self, _: &CardReadEvent) -> Result<ProcessingResult> {
//!         Ok(ProcessingResult::success("Access granted"))
//!     }
//! }
//!
//! struct NoStore;
//! impl EventStore<CardReadEvent> for NoStore {
//!     async fn persist_success(&self, _: &CardReadEvent, _: &ProcessingResult) -> Result<()> {
//!         Ok(())
//!     }
//!     async fn persist_error(&self, _: &CardReadEvent, _: &str) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! struct NoSend;
//! impl FeedbackSender for NoSend {
//!     async fn send(&self, _: ReaderId, _: &ReaderFeedback) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let orchestrator: CardReadOrchestrator<_, _, _, _> =
//!     EventOrchestrator::new(AllowAll, NoStore, StaticFeedbackResolver::default(), NoSend);
//! let event = CardReadEvent::new(ReaderId::new(), "Main door", "12345678", 26);
//!
//! let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let result = runtime.block_on(orchestrator.process_event(&event));
//! assert!(result.is_fully_successful());
//! ```

pub mod error;
pub mod orchestrator;
pub mod traits;
pub mod types;

pub use error::{EventError, Result};
pub use orchestrator::{CardReadOrchestrator, EventOrchestrator, PinReadOrchestrator};
pub use traits::{EventProcessor, EventStore, FeedbackResolver, FeedbackSender, StaticFeedbackResolver};
pub use types::{
    CardReadEvent, EventKind, EventProcessingResult, PinReadEvent, ProcessingResult, ReadEvent,
    ReaderFeedback,
};
