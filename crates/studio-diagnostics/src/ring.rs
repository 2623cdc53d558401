//! Bounded in-memory error log
//!
//! Keeps the most recent entries (oldest evicted first) and streams every
//! appended entry to live subscribers.

use crate::entry::ErrorLogEntry;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::broadcast;

/// Default ring capacity
pub const DEFAULT_RING_CAPACITY: usize = 100;

/// Broadcast buffer for live subscribers
const SUBSCRIBER_BUFFER: usize = 256;

/// Fixed-capacity ring buffer of error entries
#[derive(Debug)]
pub struct ErrorRing {
    capacity: usize,
    entries: Mutex<VecDeque<ErrorLogEntry>>,
    live: broadcast::Sender<ErrorLogEntry>,
}

impl ErrorRing {
    /// Create ring with the given capacity (at least 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (live, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            live,
        }
    }

    /// Append an entry, evicting the oldest when full
    pub fn push(&self, entry: ErrorLogEntry) {
        {
            let mut guard = self.entries.lock();
            if guard.len() == self.capacity {
                guard.pop_front();
            }
            guard.push_back(entry.clone());
        }
        // No receivers is not an error for a log
        let _ = self.live.send(entry);
    }

    /// Subscribe to entries appended from now on
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ErrorLogEntry> {
        self.live.subscribe()
    }

    /// All entries, oldest first
    #[must_use]
    pub fn snapshot(&self) -> Vec<ErrorLogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Entries recorded for one session, oldest first
    #[must_use]
    pub fn for_session(&self, session_id: &str) -> Vec<ErrorLogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Drop entries of one session
    pub fn clear_session(&self, session_id: &str) {
        self.entries.lock().retain(|e| e.session_id != session_id);
    }

    /// Current entry count
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the ring is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Configured capacity
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ErrorRing {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}
