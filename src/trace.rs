//! Bounded activity trace for the dispatch engine
//!
//! Every pool, health, and dispatch decision is recorded in a small
//! ring buffer so a failing client can be inspected after the fact
//! without raising the log level. Entries are also mirrored to
//! `tracing` at debug level.

use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default number of entries kept before the oldest is dropped.
pub const DEFAULT_TRACE_CAPACITY: usize = 20;

/// Timestamped ring buffer of engine activity.
///
/// Cloning is cheap; clones share the same buffer.
#[derive(Clone)]
pub struct TraceLog {
    entries: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl TraceLog {
    /// Create a trace log holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// Append a timestamped entry, dropping the oldest beyond capacity.
    pub async fn record(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(target: "gradekit::trace", "{message}");

        let stamped = format!("{} {message}", Utc::now().format("%H:%M:%S%.3f"));
        let mut entries = self.entries.lock().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(stamped);
    }

    /// Copy of the current entries, oldest first.
    pub async fn snapshot(&self) -> Vec<String> {
        self.entries.lock().await.iter().cloned().collect()
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether nothing has been recorded yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::new(DEFAULT_TRACE_CAPACITY)
    }
}
