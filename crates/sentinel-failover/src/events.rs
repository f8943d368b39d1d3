//! Bounded failover event history
//!
//! Keeps the most recent events in memory together with aggregate
//! statistics, and optionally appends every event as one JSON line to a
//! file.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;
use tracing::{error, info};

use sentinel_core::types::{FailoverEvent, FailoverStats};

use crate::error::FailoverResult;

struct EventLogInner {
    events: VecDeque<FailoverEvent>,
    stats: FailoverStats,
    sink: Option<File>,
}

/// Append-only event log with a fixed capacity
pub struct EventLog {
    capacity: usize,
    inner: Mutex<EventLogInner>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(EventLogInner {
                events: VecDeque::with_capacity(capacity.min(1024)),
                stats: FailoverStats::default(),
                sink: None,
            }),
        }
    }

    /// Log that also appends every event to `path`
    pub fn with_file(capacity: usize, path: &Path) -> FailoverResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!("Persisting failover events to {}", path.display());

        let log = Self::new(capacity);
        log.inner.lock().sink = Some(file);
        Ok(log)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an event, evicting the oldest when full
    pub fn append(&self, event: FailoverEvent) {
        let mut inner = self.inner.lock();

        if let Some(sink) = inner.sink.as_mut() {
            let written = event
                .to_json_line()
                .map_err(std::io::Error::from)
                .and_then(|line| writeln!(sink, "{}", line));
            if let Err(e) = written {
                error!("Failed to persist event {}: {}", event.id, e);
            }
        }

        if inner.events.len() == self.capacity {
            inner.events.pop_front();
        }
        inner.events.push_back(event);
    }

    /// Up to `limit` most recent events, oldest first
    pub fn recent(&self, limit: usize) -> Vec<FailoverEvent> {
        let inner = self.inner.lock();
        let skip = inner.events.len().saturating_sub(limit);
        inner.events.iter().skip(skip).cloned().collect()
    }

    pub fn last(&self) -> Option<FailoverEvent> {
        self.inner.lock().events.back().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().events.is_empty()
    }

    pub fn stats(&self) -> FailoverStats {
        self.inner.lock().stats.clone()
    }

    pub fn update_stats(&self, f: impl FnOnce(&mut FailoverStats)) {
        f(&mut self.inner.lock().stats);
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
