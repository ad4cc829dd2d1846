//! Bounded diagnostics sink shared by the picker, the fetch driver and the
//! front end. Constructed once and passed around as `Arc<Diagnostics>`.

use std::collections::VecDeque;

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    PickerOpened { kind: String },
    FilterPublished { query: String, category: Option<String> },
    FetchIssued { generation: u64, query: String, cursor: usize },
    FetchApplied { generation: u64, items: usize, total: usize },
    FetchDiscarded { generation: u64, current: u64 },
    FetchFailed { generation: u64, error: String },
    UniverseLoaded { entities: usize },
    SelectionChanged { action: String, selected: usize },
    SelectionLocked { reason: String },
    SelectionUnlocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DiagnosticEvent,
}

pub struct Diagnostics {
    capacity: usize,
    records: Mutex<VecDeque<DiagnosticRecord>>,
    dropped: Mutex<u64>,
}

impl Diagnostics {
    /// A capacity of zero disables retention; events are still traced.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            dropped: Mutex::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Events evicted because the buffer was full.
    pub fn dropped(&self) -> u64 {
        *self.dropped.lock()
    }

    pub fn record(&self, event: DiagnosticEvent) {
        trace_event(&event);
        if self.capacity == 0 {
            return;
        }

        let mut records = self.records.lock();
        while records.len() >= self.capacity {
            records.pop_front();
            *self.dropped.lock() += 1;
        }
        records.push_back(DiagnosticRecord {
            at: Utc::now(),
            event,
        });
    }

    pub fn snapshot(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Take every retained record, leaving the buffer empty.
    pub fn drain(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().drain(..).collect()
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}

fn trace_event(event: &DiagnosticEvent) {
    match event {
        DiagnosticEvent::PickerOpened { kind } => {
            tracing::debug!(kind = kind.as_str(), "picker opened")
        }
        DiagnosticEvent::FilterPublished { query, category } => tracing::debug!(
            query = query.as_str(),
            category = category.as_deref().unwrap_or("-"),
            "filter published"
        ),
        DiagnosticEvent::FetchIssued {
            generation,
            query,
            cursor,
        } => tracing::debug!(generation, query = query.as_str(), cursor, "fetch issued"),
        DiagnosticEvent::FetchApplied {
            generation,
            items,
            total,
        } => tracing::debug!(generation, items, total, "fetch applied"),
        DiagnosticEvent::FetchDiscarded {
            generation,
            current,
        } => tracing::debug!(generation, current, "stale fetch discarded"),
        DiagnosticEvent::FetchFailed { generation, error } => {
            tracing::warn!(generation, error = %error, "fetch failed")
        }
        DiagnosticEvent::UniverseLoaded { entities } => {
            tracing::debug!(entities, "universe loaded")
        }
        DiagnosticEvent::SelectionChanged { action, selected } => {
            tracing::debug!(action = action.as_str(), selected, "selection changed")
        }
        DiagnosticEvent::SelectionLocked { reason } => {
            tracing::debug!(reason = reason.as_str(), "selection locked")
        }
        DiagnosticEvent::SelectionUnlocked => tracing::debug!("selection unlocked"),
    }
}
