//! Reply-matching statistics.
//!
//! Every outbound frame (a request) is paired with the reader's next frame if
//! that frame is inbound. The resulting counts give a reply rate and a
//! response-time distribution per reader and across all readers.
//!
//! The reader's most recent outbound frame is never counted: its reply may
//! simply not have arrived yet. When a reply spans several inbound frames
//! only the first one is paired.

use crate::entry::TraceEntry;
use osdpwatch_core::ReaderId;
use serde::Serialize;
use std::sync::Arc;

/// Reply matching result for one reader.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReaderStatistics {
    pub reader_id: Option<ReaderId>,

    /// Outbound frames considered (latest pending request excluded).
    pub requests: usize,

    /// Requests followed by an inbound frame before the next request.
    pub matched_replies: usize,

    /// Non-negative response times of matched pairs, in milliseconds.
    #[serde(skip)]
    pub response_times_ms: Vec<f64>,
}

impl ReaderStatistics {
    pub fn reply_percentage(&self) -> f64 {
        percentage(self.matched_replies, self.requests)
    }

    pub fn average_response_time_ms(&self) -> f64 {
        mean(&self.response_times_ms)
    }
}

/// Aggregate statistics across all traced readers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TracingStatistics {
    pub total_requests: usize,
    pub matched_replies: usize,

    /// `matched_replies / total_requests × 100`, or 0 without requests.
    pub reply_percentage: f64,

    /// Mean response time, or 0 without samples.
    pub average_response_time_ms: f64,
    pub response_time_samples: usize,
    pub min_response_time_ms: Option<f64>,
    pub max_response_time_ms: Option<f64>,

    pub per_reader: Vec<ReaderStatistics>,
}

/// Run reply matching over one reader's entries, in any order.
pub fn analyze_reader(entries: &[Arc<TraceEntry>]) -> ReaderStatistics {
    let mut ordered: Vec<&TraceEntry> = entries.iter().map(Arc::as_ref).collect();
    ordered.sort_by_key(|entry| entry.timestamp());

    let mut stats = ReaderStatistics {
        reader_id: ordered.first().map(|entry| entry.reader_id()),
        ..ReaderStatistics::default()
    };

    let pending = ordered
        .iter()
        .rposition(|entry| entry.direction().is_outbound());

    for (index, request) in ordered.iter().enumerate() {
        if !request.direction().is_outbound() || Some(index) == pending {
            continue;
        }
        stats.requests += 1;

        // Every entry is either outbound or inbound, so the forward scan
        // stops at the next entry.
        let Some(reply) = ordered
            .get(index + 1)
            .filter(|next| next.direction().is_inbound())
        else {
            continue;
        };
        stats.matched_replies += 1;

        let elapsed = reply.timestamp() - request.timestamp();
        if let Some(micros) = elapsed.num_microseconds()
            && micros >= 0
        {
            stats.response_times_ms.push(micros as f64 / 1000.0);
        }
    }

    stats
}

/// Aggregate per-reader analyses into one snapshot.
pub fn compute_statistics<I>(readers: I) -> TracingStatistics
where
    I: IntoIterator<Item = (ReaderId, Vec<Arc<TraceEntry>>)>,
{
    let mut totals = TracingStatistics::default();
    let mut samples: Vec<f64> = Vec::new();

    for (reader_id, entries) in readers {
        let mut reader = analyze_reader(&entries);
        reader.reader_id = Some(reader_id);

        totals.total_requests += reader.requests;
        totals.matched_replies += reader.matched_replies;
        samples.extend_from_slice(&reader.response_times_ms);
        totals.per_reader.push(reader);
    }

    totals.reply_percentage = percentage(totals.matched_replies, totals.total_requests);
    totals.average_response_time_ms = mean(&samples);
    totals.response_time_samples = samples.len();
    totals.min_response_time_ms = samples.iter().copied().reduce(f64::min);
    totals.max_response_time_ms = samples.iter().copied().reduce(f64::max);
    totals
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
