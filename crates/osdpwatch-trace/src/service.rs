//! Trace service.
//!
//! [`TraceService`] is the single coordination point for protocol tracing:
//! it owns the per-reader buffers and last-entry cursors, the set of actively
//! traced readers, the current settings snapshot and the capture notification
//! channel.
//!
//! # Architecture
//!
//! ```text
//!  device I/O ──capture_packet──► TraceEntryBuilder ──► TraceBuffer (per reader)
//!                                        │                    │
//!                                        ▼                    ├──► get_traces / export
//!                               broadcast channel             └──► statistics
//!                              (live observers)
//! ```
//!
//! # Concurrency
//!
//! Capture, queries and settings updates are synchronous in-memory work
//! under short `std::sync` locks. Captures for the same reader are
//! serialized by the reader's cursor lock, so the interval is always
//! measured from the entry stored just before. Notifications are published
//! with `broadcast::Sender::send`, which never waits: a subscriber that falls
//! behind loses the oldest notifications instead of stalling capture.
//!
//! # Examples
//!
//! ```
//! use osdpwatch_core::{ReaderId, TracingSettings};
//! use osdpwatch_trace::{DecodedFrame, RawFrame, StaticReaderDirectory, TraceService};
//!
//! let decoder = |raw: &[u8]| {
//!     raw.first().map(|&addr| DecodedFrame::new(addr, 0, 0x60, "osdp_POLL"))
//! };
//! let service = TraceService::new(
//!     decoder,
//!     StaticReaderDirectory::default(),
//!     TracingSettings::default(),
//! );
//!
//! let reader = ReaderId::new();
//! service.start_tracing(reader);
//! service.capture_packet(&RawFrame::outbound(vec![0x01]), reader, "Lobby");
//!
//! assert_eq!(service.get_traces(Some(reader), None).len(), 1);
//! ```

use crate::buffer::{BufferLimits, TraceBuffer};
use crate::builder::{BuildOutcome, FrameCapture, TraceEntryBuilder};
use crate::directory::ReaderDirectory;
use crate::entry::TraceEntry;
use crate::export;
use crate::frame::{FrameDecoder, RawFrame};
use crate::stats::{self, TracingStatistics};
use chrono::{DateTime, Utc};
use osdpwatch_core::constants::{ESTIMATED_ENTRY_BYTES, NOTIFICATION_CHANNEL_CAPACITY};
use osdpwatch_core::{ReaderId, Result, TracingSettings};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Published for every stored entry.
#[derive(Debug, Clone)]
pub struct CaptureNotification {
    pub reader_id: ReaderId,
    pub entry: Arc<TraceEntry>,
}

/// What happened to a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Entry stored in the reader's buffer.
    Stored,
    /// Frame could not be decoded and was discarded.
    Dropped,
    /// Reader is not traced, or tracing is globally disabled.
    Ignored,
}

/// Per-reader buffer footprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderTraceSummary {
    pub reader_id: ReaderId,
    /// Name carried by the most recent entry.
    pub reader_name: Option<String>,
    pub entry_count: usize,
    pub memory_bytes: usize,
    pub is_tracing: bool,
}

#[derive(Debug)]
struct ReaderTrace {
    buffer: TraceBuffer,
    cursor: Mutex<Option<Arc<TraceEntry>>>,
}

impl ReaderTrace {
    fn new(limits: BufferLimits) -> Self {
        Self {
            buffer: TraceBuffer::new(limits),
            cursor: Mutex::new(None),
        }
    }

    fn clear(&self) {
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        self.buffer.clear();
        *cursor = None;
    }
}

/// Coordinates tracing lifecycle, capture dispatch and trace queries.
pub struct TraceService<D, R> {
    builder: TraceEntryBuilder<D>,
    directory: R,
    settings: RwLock<Arc<TracingSettings>>,
    readers: RwLock<HashMap<ReaderId, Arc<ReaderTrace>>>,
    active: RwLock<HashSet<ReaderId>>,
    notifications: broadcast::Sender<CaptureNotification>,
}

impl<D, R> TraceService<D, R>
where
    D: FrameDecoder,
    R: ReaderDirectory,
{
    pub fn new(decoder: D, directory: R, settings: TracingSettings) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        Self {
            builder: TraceEntryBuilder::new(decoder),
            directory,
            settings: RwLock::new(Arc::new(settings)),
            readers: RwLock::new(HashMap::new()),
            active: RwLock::new(HashSet::new()),
            notifications,
        }
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// Current settings snapshot.
    pub fn current_settings(&self) -> Arc<TracingSettings> {
        Arc::clone(&self.settings.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the settings and apply the new buffer limits to every reader.
    ///
    /// The value is not validated; see [`TracingSettings::validate`].
    pub fn update_settings(&self, settings: TracingSettings) {
        let limits = BufferLimits::from_settings(&settings);
        let snapshot = Arc::new(settings);
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);

        let evicted: usize = self
            .reader_traces()
            .iter()
            .map(|(_, reader)| reader.buffer.apply_limits(limits))
            .sum();
        let global = self.enforce_global_limits(&snapshot);

        info!(
            enabled = snapshot.enabled,
            eviction_mode = ?snapshot.eviction_mode,
            max_entries_per_reader = snapshot.max_entries_per_reader,
            evicted = evicted + global,
            "Tracing settings updated"
        );
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start tracing a reader, creating its buffer on first use.
    ///
    /// Idempotent: an existing buffer is kept as is.
    pub fn start_tracing(&self, reader_id: ReaderId) {
        let limits = BufferLimits::from_settings(&self.current_settings());
        // Lock order: `readers`, then `active`.
        let newly_active = {
            let mut readers = self.readers.write().unwrap_or_else(PoisonError::into_inner);
            readers
                .entry(reader_id)
                .or_insert_with(|| Arc::new(ReaderTrace::new(limits)));
            self.active
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(reader_id)
        };
        if newly_active {
            info!(%reader_id, "Tracing started");
        }
    }

    /// Stop tracing a reader. Its buffer is kept for later queries.
    pub fn stop_tracing(&self, reader_id: ReaderId) {
        let was_active = self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&reader_id);
        if was_active {
            info!(%reader_id, "Tracing stopped");
        }
    }

    /// Start tracing every reader the directory reports as enabled.
    ///
    /// Returns the number of readers listed. If the directory fails the call
    /// logs a warning and changes nothing.
    pub async fn start_tracing_all(&self) -> usize {
        let readers = match self.directory.list_enabled_readers().await {
            Ok(readers) => readers,
            Err(e) => {
                warn!(error = %e, "Reader directory unavailable; tracing not started");
                return 0;
            }
        };

        for reader_id in &readers {
            self.start_tracing(*reader_id);
        }
        info!(count = readers.len(), "Tracing started for all enabled readers");
        readers.len()
    }

    /// Stop tracing every reader.
    pub fn stop_tracing_all(&self) {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        let count = active.len();
        active.clear();
        info!(count, "Tracing stopped for all readers");
    }

    pub fn is_tracing(&self, reader_id: ReaderId) -> bool {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&reader_id)
    }

    /// Actively traced readers, sorted.
    pub fn active_readers(&self) -> Vec<ReaderId> {
        let mut readers: Vec<_> = self
            .active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect();
        readers.sort();
        readers
    }

    /// Clear one reader's traces, or every reader's when `reader_id` is `None`.
    pub fn clear_traces(&self, reader_id: Option<ReaderId>) {
        match reader_id {
            Some(id) => {
                if let Some(reader) = self.reader_trace(id) {
                    reader.clear();
                }
                debug!(reader_id = %id, "Traces cleared");
            }
            None => {
                for (_, reader) in self.reader_traces() {
                    reader.clear();
                }
                debug!("All traces cleared");
            }
        }
    }

    /// Stop tracing a reader and drop its buffer.
    pub fn remove_reader(&self, reader_id: ReaderId) {
        let mut readers = self.readers.write().unwrap_or_else(PoisonError::into_inner);
        let was_active = self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&reader_id);
        readers.remove(&reader_id);
        drop(readers);

        if was_active {
            info!(%reader_id, "Tracing stopped");
        }
    }

    // ------------------------------------------------------------------
    // Capture
    // ------------------------------------------------------------------

    /// Capture a frame received now. See [`capture_packet_at`](Self::capture_packet_at).
    pub fn capture_packet(
        &self,
        frame: &RawFrame,
        reader_id: ReaderId,
        reader_name: &str,
    ) -> CaptureOutcome {
        self.capture_packet_at(frame, reader_id, reader_name, Utc::now())
    }

    /// Capture a frame with an explicit reception timestamp.
    ///
    /// Ignored unless tracing is enabled and the reader is active.
    /// Unparsable frames are dropped silently.
    pub fn capture_packet_at(
        &self,
        frame: &RawFrame,
        reader_id: ReaderId,
        reader_name: &str,
        received_at: DateTime<Utc>,
    ) -> CaptureOutcome {
        let settings = self.current_settings();
        if !settings.enabled || !self.is_tracing(reader_id) {
            return CaptureOutcome::Ignored;
        }
        let Some(reader) = self.reader_trace(reader_id) else {
            return CaptureOutcome::Ignored;
        };

        let entry = {
            let mut cursor = reader.cursor.lock().unwrap_or_else(PoisonError::into_inner);
            let capture = FrameCapture {
                frame,
                reader_id,
                reader_name,
                received_at,
            };
            let entry = match self.builder.build(capture, cursor.as_deref(), &settings) {
                BuildOutcome::Built(entry) => Arc::new(entry),
                BuildOutcome::Dropped => {
                    trace!(%reader_id, len = frame.bytes.len(), "Unparsable frame dropped");
                    return CaptureOutcome::Dropped;
                }
            };
            reader.buffer.add(Arc::clone(&entry));
            *cursor = Some(Arc::clone(&entry));
            entry
        };

        self.enforce_global_limits(&settings);

        // No receivers is not an error for capture.
        let _ = self.notifications.send(CaptureNotification { reader_id, entry });
        CaptureOutcome::Stored
    }

    /// Subscribe to capture notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureNotification> {
        self.notifications.subscribe()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Traces for one reader, or merged across readers, newest-first.
    ///
    /// Poll/ack filters from the current settings apply. Unknown readers
    /// yield an empty list.
    pub fn get_traces(
        &self,
        reader_id: Option<ReaderId>,
        limit: Option<usize>,
    ) -> Vec<Arc<TraceEntry>> {
        let settings = self.current_settings();
        let mut entries = self.collect_entries(reader_id);
        entries.retain(|entry| is_visible(entry, &settings));
        entries.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        entries
    }

    /// Reply-matching statistics over every buffer.
    ///
    /// Filters do not apply here: polls and acks are the bulk of the pairs.
    pub fn statistics(&self) -> TracingStatistics {
        stats::compute_statistics(
            self.reader_traces()
                .into_iter()
                .map(|(id, reader)| (id, reader.buffer.entries_oldest_first())),
        )
    }

    /// Estimated memory across all buffers, in bytes.
    pub fn memory_usage(&self) -> usize {
        self.reader_traces()
            .iter()
            .map(|(_, reader)| reader.buffer.memory_usage())
            .sum()
    }

    /// Footprint of every known reader, sorted by reader ID.
    pub fn reader_summaries(&self) -> Vec<ReaderTraceSummary> {
        let active = self.active.read().unwrap_or_else(PoisonError::into_inner).clone();
        let mut summaries: Vec<_> = self
            .reader_traces()
            .into_iter()
            .map(|(reader_id, reader)| ReaderTraceSummary {
                reader_id,
                reader_name: reader
                    .buffer
                    .last()
                    .map(|entry| entry.reader_name().to_string()),
                entry_count: reader.buffer.len(),
                memory_bytes: reader.buffer.memory_usage(),
                is_tracing: active.contains(&reader_id),
            })
            .collect();
        summaries.sort_by_key(|summary| summary.reader_id);
        summaries
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Text report of one reader's or all traces, oldest-first.
    pub fn export_text(&self, reader_id: Option<ReaderId>) -> String {
        export::render_text_report(&self.export_entries(reader_id), Utc::now())
    }

    /// JSON-lines export of one reader's or all traces, oldest-first.
    ///
    /// # Errors
    /// Returns `Error::Json` if an entry fails to serialize.
    pub fn export_json(&self, reader_id: Option<ReaderId>) -> Result<String> {
        let mut out = Vec::new();
        export::write_json_lines(&mut out, &self.export_entries(reader_id))?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    // ------------------------------------------------------------------
    // Age eviction
    // ------------------------------------------------------------------

    /// Run the age sweep on every buffer now.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    /// Run the age sweep as of `now`. Returns the number of evicted entries.
    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let evicted = self
            .reader_traces()
            .iter()
            .map(|(_, reader)| reader.buffer.sweep_expired(now))
            .sum();
        if evicted > 0 {
            debug!(evicted, "Expired trace entries evicted");
        }
        evicted
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn reader_trace(&self, reader_id: ReaderId) -> Option<Arc<ReaderTrace>> {
        self.readers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&reader_id)
            .cloned()
    }

    /// Snapshot of the reader map, so buffers are used without the map lock.
    fn reader_traces(&self) -> Vec<(ReaderId, Arc<ReaderTrace>)> {
        self.readers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, reader)| (*id, Arc::clone(reader)))
            .collect()
    }

    fn collect_entries(&self, reader_id: Option<ReaderId>) -> Vec<Arc<TraceEntry>> {
        match reader_id {
            Some(id) => self
                .reader_trace(id)
                .map(|reader| reader.buffer.entries(None))
                .unwrap_or_default(),
            None => self
                .reader_traces()
                .iter()
                .flat_map(|(_, reader)| reader.buffer.entries(None))
                .collect(),
        }
    }

    fn export_entries(&self, reader_id: Option<ReaderId>) -> Vec<Arc<TraceEntry>> {
        let settings = self.current_settings();
        let mut entries = self.collect_entries(reader_id);
        entries.retain(|entry| is_visible(entry, &settings));
        entries.sort_by_key(|entry| entry.timestamp());
        entries
    }

    /// Evict the globally oldest entries until the total entry count and
    /// memory estimate are within the settings' global limits. The latest
    /// entry is always kept.
    fn enforce_global_limits(&self, settings: &TracingSettings) -> usize {
        let readers = self.reader_traces();
        let mut total: usize = readers.iter().map(|(_, reader)| reader.buffer.len()).sum();
        let max_by_memory = settings.memory_limit_bytes / ESTIMATED_ENTRY_BYTES;
        let limit = settings.max_total_entries.min(max_by_memory).max(1);

        let mut evicted = 0;
        while total > limit {
            let oldest = readers
                .iter()
                .filter_map(|(_, reader)| {
                    reader
                        .buffer
                        .oldest_timestamp()
                        .map(|timestamp| (timestamp, reader))
                })
                .min_by_key(|(timestamp, _)| *timestamp);
            let Some((_, reader)) = oldest else {
                break;
            };
            if reader.buffer.evict_oldest(1) == 0 {
                break;
            }
            total -= 1;
            evicted += 1;
        }
        if evicted > 0 {
            trace!(evicted, limit, "Global trace limits enforced");
        }
        evicted
    }
}

impl<D, R> TraceService<D, R>
where
    D: FrameDecoder + 'static,
    R: ReaderDirectory + 'static,
{
    /// Spawn a task that runs the age sweep at the configured interval.
    ///
    /// The interval is re-read from the settings on every tick. The task
    /// holds only a weak reference and exits once the service is dropped;
    /// abort the handle to stop it earlier.
    pub fn spawn_age_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let service: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let interval = match service.upgrade() {
                    Some(service) => service.current_settings().sweep_interval,
                    None => break,
                };
                tokio::time::sleep(interval).await;
                match service.upgrade() {
                    Some(service) => {
                        service.sweep_expired();
                    }
                    None => break,
                }
            }
            debug!("Age sweeper stopped");
        })
    }
}

fn is_visible(entry: &TraceEntry, settings: &TracingSettings) -> bool {
    let frame = entry.frame();
    let hidden_poll = settings.filter_poll_commands && frame.is_poll();
    let hidden_ack = settings.filter_ack_replies && frame.is_ack();
    !(hidden_poll || hidden_ack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticReaderDirectory;
    use crate::frame::DecodedFrame;
    use chrono::TimeDelta;

    type Decoder = fn(&[u8]) -> Option<DecodedFrame>;

    /// `[address, code]`; anything shorter is unparsable.
    fn decode(raw: &[u8]) -> Option<DecodedFrame> {
        match raw {
            [address, code, ..] => Some(DecodedFrame::new(*address, 0, *code, "frame")),
            _ => None,
        }
    }

    fn service(settings: TracingSettings) -> TraceService<Decoder, StaticReaderDirectory> {
        TraceService::new(decode as Decoder, StaticReaderDirectory::default(), settings)
    }

    #[test]
    fn test_capture_ignored_until_started() {
        let service = service(TracingSettings::default());
        let reader = ReaderId::new();
        let frame = RawFrame::outbound(vec![0x01, 0x60]);

        assert_eq!(service.capture_packet(&frame, reader, "Gate"), CaptureOutcome::Ignored);
        assert!(service.reader_summaries().is_empty());

        service.start_tracing(reader);
        assert_eq!(service.capture_packet(&frame, reader, "Gate"), CaptureOutcome::Stored);
        assert_eq!(
            service.capture_packet(&RawFrame::outbound(vec![0x01]), reader, "Gate"),
            CaptureOutcome::Dropped
        );
        assert_eq!(service.get_traces(Some(reader), None).len(), 1);
    }

    #[test]
    fn test_disabled_settings_ignore_capture() {
        let service = service(TracingSettings::default().enabled(false));
        let reader = ReaderId::new();
        service.start_tracing(reader);

        let outcome = service.capture_packet(&RawFrame::outbound(vec![0x01, 0x60]), reader, "Gate");
        assert_eq!(outcome, CaptureOutcome::Ignored);
        assert!(service.get_traces(None, None).is_empty());
    }

    #[test]
    fn test_global_limit_evicts_oldest_across_readers() {
        let settings = TracingSettings::default()
            .max_entries_per_reader(10)
            .max_total_entries(10)
            .memory_limit_bytes(3 * ESTIMATED_ENTRY_BYTES);
        let service = service(settings);
        let a = ReaderId::new();
        let b = ReaderId::new();
        service.start_tracing(a);
        service.start_tracing(b);

        let t0 = Utc::now();
        let frame = RawFrame::outbound(vec![0x01, 0x6A]);
        service.capture_packet_at(&frame, a, "A", t0);
        service.capture_packet_at(&frame, b, "B", t0 + TimeDelta::milliseconds(1));
        service.capture_packet_at(&frame, a, "A", t0 + TimeDelta::milliseconds(2));
        service.capture_packet_at(&frame, b, "B", t0 + TimeDelta::milliseconds(3));

        let remaining = service.get_traces(None, None);
        assert_eq!(remaining.len(), 3);
        assert!(remaining.iter().all(|entry| entry.timestamp() > t0));
        assert_eq!(service.memory_usage(), 3 * ESTIMATED_ENTRY_BYTES);
    }

    #[test]
    fn test_global_limit_keeps_latest_entry() {
        let service = service(TracingSettings::default().memory_limit_bytes(100));
        let reader = ReaderId::new();
        service.start_tracing(reader);
        let mut receiver = service.subscribe();
        let t0 = Utc::now();

        let first = service.capture_packet_at(&RawFrame::outbound(vec![0x01, 0x60]), reader, "A", t0);
        let second = service.capture_packet_at(
            &RawFrame::inbound(vec![0x81, 0x40]),
            reader,
            "A",
            t0 + TimeDelta::milliseconds(5),
        );

        assert_eq!(first, CaptureOutcome::Stored);
        assert_eq!(second, CaptureOutcome::Stored);
        let stored = service.get_traces(Some(reader), None);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].frame().code, 0x40);
        assert!(receiver.try_recv().is_ok());
    }

    #[test]
    fn test_concurrent_start_and_remove_stay_consistent() {
        let service = service(TracingSettings::default());
        let frame = RawFrame::outbound(vec![0x01, 0x60]);

        for _ in 0..200 {
            let reader = ReaderId::new();
            std::thread::scope(|scope| {
                scope.spawn(|| service.start_tracing(reader));
                scope.spawn(|| service.remove_reader(reader));
            });

            let has_buffer = service
                .reader_summaries()
                .iter()
                .any(|summary| summary.reader_id == reader);
            assert_eq!(service.is_tracing(reader), has_buffer);
            if service.is_tracing(reader) {
                assert_eq!(service.capture_packet(&frame, reader, "A"), CaptureOutcome::Stored);
            }
            service.remove_reader(reader);
        }
    }

    #[test]
    fn test_filters_hide_polls_and_acks() {
        let settings = TracingSettings::default()
            .filter_poll_commands(true)
            .filter_ack_replies(true);
        let entry = |code| {
            TraceEntry::new(
                ReaderId::new(),
                "Gate",
                osdpwatch_core::FrameDirection::Outbound,
                Utc::now(),
                std::time::Duration::ZERO,
                DecodedFrame::new(0x01, 0, code, "frame"),
            )
        };

        assert!(!is_visible(&entry(0x60), &settings));
        assert!(!is_visible(&entry(0x40), &settings));
        assert!(is_visible(&entry(0x41), &settings));
        assert!(is_visible(&entry(0x60), &TracingSettings::default()));
    }
}
