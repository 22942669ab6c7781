//! OSDP protocol trace pipeline.
//!
//! Captured frames flow through a small pipeline:
//!
//! 1. [`TraceEntryBuilder`] decodes a [`RawFrame`] with an injected
//!    [`FrameDecoder`] and stamps direction, timing and security.
//! 2. [`TraceService`] stores the entry in the reader's [`TraceBuffer`],
//!    enforces per-reader and global limits and notifies subscribers.
//! 3. Queries, [`stats`] and [`export`] read the buffered entries.
//!
//! Frame decoding itself is out of scope: hosts plug in their own decoder.

pub mod buffer;
pub mod builder;
pub mod directory;
pub mod entry;
pub mod export;
pub mod frame;
pub mod service;
pub mod stats;

pub use buffer::{BufferLimits, TraceBuffer};
pub use builder::{BuildOutcome, FrameCapture, TraceEntryBuilder};
pub use directory::{ReaderDirectory, StaticReaderDirectory};
pub use entry::TraceEntry;
pub use frame::{CaptureSource, DecodedFrame, FrameDecoder, RawFrame};
pub use service::{CaptureNotification, CaptureOutcome, ReaderTraceSummary, TraceService};
pub use stats::{ReaderStatistics, TracingStatistics};
