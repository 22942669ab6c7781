//! Bounded per-reader trace buffer.
//!
//! A [`TraceBuffer`] is a ring of [`TraceEntry`] values in arrival order with
//! an approximate memory estimate. Entries are appended at the tail and
//! evicted from the head; they are never modified in place.
//!
//! # Eviction
//!
//! | Mode | On insert | On sweep |
//! |------|-----------|----------|
//! | `SizeOnly` | capacity + memory cap | nothing |
//! | `AgeOnly` | capacity | entries older than `max_age` |
//! | `Hybrid` | capacity + memory cap | entries older than `max_age` |
//!
//! Age is never checked on the write path; [`TraceBuffer::sweep_expired`] is
//! called by the service's periodic sweeper (or directly in tests).
//!
//! # Concurrency
//!
//! One capture path writes to a buffer at a time, while queries may read
//! concurrently. The ring lives behind an `RwLock`, so a reader observes the
//! buffer either before or after an eviction, never halfway through one.

use crate::entry::TraceEntry;
use chrono::{DateTime, TimeDelta, Utc};
use osdpwatch_core::constants::ESTIMATED_ENTRY_BYTES;
use osdpwatch_core::{EvictionMode, TracingSettings};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Limits applied to a single buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLimits {
    /// Ring capacity.
    pub max_entries: usize,

    /// Memory cap (size-only and hybrid modes).
    pub max_memory_bytes: usize,

    /// Age cap (age-only and hybrid modes).
    pub max_age: Option<Duration>,

    pub eviction_mode: EvictionMode,
}

impl BufferLimits {
    /// Per-reader limits from the process-wide settings.
    pub fn from_settings(settings: &TracingSettings) -> Self {
        Self {
            max_entries: settings.max_entries_per_reader,
            max_memory_bytes: settings.max_memory_per_reader_bytes,
            max_age: settings.max_age,
            eviction_mode: settings.eviction_mode,
        }
    }

    /// Number of entries the buffer may hold under these limits.
    ///
    /// Always at least one, so a buffer can hold the latest frame.
    pub fn effective_capacity(&self) -> usize {
        let capacity = if self.eviction_mode.enforces_size() {
            self.max_entries
                .min(self.max_memory_bytes / ESTIMATED_ENTRY_BYTES)
        } else {
            self.max_entries
        };
        capacity.max(1)
    }
}

impl Default for BufferLimits {
    fn default() -> Self {
        Self::from_settings(&TracingSettings::default())
    }
}

#[derive(Debug)]
struct BufferState {
    entries: VecDeque<Arc<TraceEntry>>,
    memory_usage: usize,
    limits: BufferLimits,
}

impl BufferState {
    fn recompute_memory(&mut self) {
        self.memory_usage = self.entries.len() * ESTIMATED_ENTRY_BYTES;
    }

    fn trim_to(&mut self, capacity: usize) -> usize {
        let excess = self.entries.len().saturating_sub(capacity);
        self.entries.drain(..excess);
        excess
    }
}

/// Fixed-capacity ring of trace entries for one reader.
#[derive(Debug)]
pub struct TraceBuffer {
    state: RwLock<BufferState>,
}

impl TraceBuffer {
    pub fn new(limits: BufferLimits) -> Self {
        Self {
            state: RwLock::new(BufferState {
                entries: VecDeque::with_capacity(limits.effective_capacity().min(1024)),
                memory_usage: 0,
                limits,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BufferState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BufferState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry, evicting from the head if capacity is exceeded.
    ///
    /// Returns the number of evicted entries.
    pub fn add(&self, entry: Arc<TraceEntry>) -> usize {
        let mut state = self.write();
        state.entries.push_back(entry);
        let capacity = state.limits.effective_capacity();
        let evicted = state.trim_to(capacity);
        state.recompute_memory();
        evicted
    }

    /// Evict head entries older than the age cap, as of `now`.
    ///
    /// No-op unless the eviction mode enforces age. Returns the number of
    /// evicted entries.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.write();
        let limits = state.limits;
        if !limits.eviction_mode.enforces_age() {
            return 0;
        }
        let Some(cutoff) = limits
            .max_age
            .and_then(|age| TimeDelta::from_std(age).ok())
            .and_then(|age| now.checked_sub_signed(age))
        else {
            return 0;
        };

        let mut evicted = 0;
        while state
            .entries
            .front()
            .is_some_and(|entry| entry.timestamp() < cutoff)
        {
            state.entries.pop_front();
            evicted += 1;
        }
        state.recompute_memory();
        evicted
    }

    /// Evict up to `count` of the oldest entries.
    pub fn evict_oldest(&self, count: usize) -> usize {
        let mut state = self.write();
        let evicted = count.min(state.entries.len());
        state.entries.drain(..evicted);
        state.recompute_memory();
        evicted
    }

    /// Remove every entry and reset the memory estimate.
    pub fn clear(&self) {
        let mut state = self.write();
        state.entries.clear();
        state.memory_usage = 0;
    }

    /// Entries newest-first, optionally truncated to `limit`.
    ///
    /// Ordered by timestamp descending; entries with equal timestamps keep
    /// the later-inserted one first.
    pub fn entries(&self, limit: Option<usize>) -> Vec<Arc<TraceEntry>> {
        let mut entries: Vec<_> = self.read().entries.iter().rev().cloned().collect();
        entries.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        entries
    }

    /// Entries oldest-first (timestamp ascending, ties in insertion order).
    pub fn entries_oldest_first(&self) -> Vec<Arc<TraceEntry>> {
        let mut entries: Vec<_> = self.read().entries.iter().cloned().collect();
        entries.sort_by_key(|entry| entry.timestamp());
        entries
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Estimated memory held by the buffer, in bytes.
    pub fn memory_usage(&self) -> usize {
        self.read().memory_usage
    }

    /// Timestamp of the head entry.
    pub fn oldest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.read().entries.front().map(|entry| entry.timestamp())
    }

    /// Most recently inserted entry.
    pub fn last(&self) -> Option<Arc<TraceEntry>> {
        self.read().entries.back().cloned()
    }

    pub fn limits(&self) -> BufferLimits {
        self.read().limits
    }

    /// Replace the limits and trim to the new capacity immediately.
    ///
    /// Returns the number of evicted entries.
    pub fn apply_limits(&self, limits: BufferLimits) -> usize {
        let mut state = self.write();
        state.limits = limits;
        let evicted = state.trim_to(limits.effective_capacity());
        state.recompute_memory();
        evicted
    }
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::new(BufferLimits::default())
    }
}
