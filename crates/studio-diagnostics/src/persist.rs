//! Durable copy of the error log
//!
//! Entries are kept as one JSON array under a single store key. Every write
//! drops entries older than the retention window. Failures are reported to
//! the caller, which logs and swallows them.
//!
//! Appends are read-modify-write over the whole list, so every mutation holds
//! the log's write lock from load to save.

use crate::entry::ErrorLogEntry;
use crate::store::{KeyValueStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// Store key holding the persisted entries
pub const ERROR_LOG_KEY: &str = "studio.error_log";

/// Default retention window
pub const DEFAULT_RETENTION_HOURS: i64 = 24;

/// Persisted error log with time-based retention
#[derive(Debug, Clone)]
pub struct DurableErrorLog {
    store: Arc<dyn KeyValueStore>,
    retention: Duration,
    /// Serializes load-modify-save cycles; shared by clones
    write: Arc<Mutex<()>>,
}

impl DurableErrorLog {
    /// Create over a store with the given retention
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, retention: Duration) -> Self {
        Self {
            store,
            retention,
            write: Arc::new(Mutex::new(())),
        }
    }

    /// Append one entry, pruning expired ones
    pub fn append(&self, entry: &ErrorLogEntry) -> Result<(), StoreError> {
        self.append_at(entry, Utc::now())
    }

    /// Append relative to an explicit clock
    pub fn append_at(&self, entry: &ErrorLogEntry, now: DateTime<Utc>) -> Result<(), StoreError> {
        let _write = self.write.lock();
        let mut entries = match self.load() {
            Ok(entries) => entries,
            Err(StoreError::Malformed { source, .. }) => {
                tracing::warn!(error = %source, "Discarding unreadable persisted error log");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        entries.push(entry.clone());
        self.save(self.prune(entries, now))
    }

    /// Entries still inside the retention window
    pub fn entries(&self) -> Result<Vec<ErrorLogEntry>, StoreError> {
        let now = Utc::now();
        Ok(self.prune(self.load()?, now))
    }

    /// Remove every persisted entry
    pub fn clear(&self) -> Result<(), StoreError> {
        let _write = self.write.lock();
        self.store.remove(ERROR_LOG_KEY)
    }

    /// Remove persisted entries of one session
    pub fn clear_session(&self, session_id: &str) -> Result<(), StoreError> {
        let _write = self.write.lock();
        let mut entries = self.load()?;
        entries.retain(|e| e.session_id != session_id);
        self.save(entries)
    }

    fn prune(&self, mut entries: Vec<ErrorLogEntry>, now: DateTime<Utc>) -> Vec<ErrorLogEntry> {
        let cutoff = now - self.retention;
        entries.retain(|e| e.timestamp > cutoff);
        entries
    }

    fn load(&self) -> Result<Vec<ErrorLogEntry>, StoreError> {
        match self.store.get(ERROR_LOG_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
                key: ERROR_LOG_KEY.to_string(),
                source,
            }),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, entries: Vec<ErrorLogEntry>) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&entries).map_err(|source| StoreError::Malformed {
            key: ERROR_LOG_KEY.to_string(),
            source,
        })?;
        self.store.set(ERROR_LOG_KEY, &raw)
    }
}
