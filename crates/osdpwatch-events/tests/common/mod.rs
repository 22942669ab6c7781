//! Fake collaborators for orchestrator integration tests.
//!
//! Each fake can be switched into a failing mode and records the calls it
//! received, so tests can assert both the result flags and which branch the
//! orchestrator took.

#![allow(dead_code)]

use osdpwatch_core::ReaderId;
use osdpwatch_events::{
    CardReadEvent, EventError, EventProcessor, EventStore, FeedbackSender, ProcessingResult,
    ReadEvent, ReaderFeedback, Result,
};
use std::sync::Mutex;

/// What the fake processor does.
#[derive(Debug, Clone)]
pub enum Decision {
    Grant(&'static str),
    Deny(&'static str),
    Fault(&'static str),
}

#[derive(Debug)]
pub struct FakeProcessor {
    decision: Decision,
    pub calls: Mutex<usize>,
}

impl FakeProcessor {
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            calls: Mutex::new(0),
        }
    }
}

impl<E: ReadEvent> EventProcessor<E> for FakeProcessor {
    async fn process(&self, _event: &E) -> Result<ProcessingResult> {
        *self.calls.lock().unwrap() += 1;
        match self.decision {
            Decision::Grant(message) => Ok(ProcessingResult::success(message)),
            Decision::Deny(message) => Ok(ProcessingResult::failure(message)),
            Decision::Fault(message) => Err(EventError::processor(message)),
        }
    }
}

/// Record written by the fake store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredRecord {
    Success { card_number: String, message: String },
    Error { card_number: String, message: String },
}

#[derive(Debug, Default)]
pub struct FakeStore {
    pub failing: bool,
    pub records: Mutex<Vec<StoredRecord>>,
}

impl FakeStore {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl EventStore<CardReadEvent> for FakeStore {
    async fn persist_success(&self, event: &CardReadEvent, result: &ProcessingResult) -> Result<()> {
        self.records.lock().unwrap().push(StoredRecord::Success {
            card_number: event.card_number.clone(),
            message: result.message.clone(),
        });
        if self.failing {
            return Err(EventError::persistence("database unavailable"));
        }
        Ok(())
    }

    async fn persist_error(&self, event: &CardReadEvent, message: &str) -> Result<()> {
        self.records.lock().unwrap().push(StoredRecord::Error {
            card_number: event.card_number.clone(),
            message: message.to_string(),
        });
        if self.failing {
            return Err(EventError::persistence("database unavailable"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeSender {
    pub failing: bool,
    pub sent: Mutex<Vec<(ReaderId, ReaderFeedback)>>,
}

impl FakeSender {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(ReaderId, ReaderFeedback)> {
        self.sent.lock().unwrap().clone()
    }
}

impl FeedbackSender for FakeSender {
    async fn send(&self, reader_id: ReaderId, feedback: &ReaderFeedback) -> Result<()> {
        if self.failing {
            return Err(EventError::delivery("reader offline"));
        }
        self.sent.lock().unwrap().push((reader_id, feedback.clone()));
        Ok(())
    }
}

pub fn card_read(reader_id: ReaderId) -> CardReadEvent {
    CardReadEvent::new(reader_id, "Main entrance", "0012345678", 26)
}
