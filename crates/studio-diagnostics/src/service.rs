//! Diagnostics service
//!
//! Constructed once at application start and shared by `Arc`. Every recorded
//! entry goes to the in-memory ring (and its live subscribers) and then to
//! the durable log. Durable failures never reach the caller.

use crate::entry::{ErrorDetails, ErrorLogEntry};
use crate::persist::{DurableErrorLog, DEFAULT_RETENTION_HOURS};
use crate::ring::{ErrorRing, DEFAULT_RING_CAPACITY};
use crate::store::{KeyValueStore, MemoryStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Default number of entries returned in [`ErrorStats::recent`]
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Diagnostics configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// In-memory ring capacity
    pub ring_capacity: usize,
    /// Durable retention window in hours
    pub retention_hours: i64,
    /// Entries returned as "recent" in statistics
    pub recent_limit: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            ring_capacity: DEFAULT_RING_CAPACITY,
            retention_hours: DEFAULT_RETENTION_HOURS,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

/// Aggregate view over the in-memory log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorStats {
    /// Entries currently held
    pub total: usize,
    /// Count per session id
    pub by_session: BTreeMap<String, usize>,
    /// Count per error kind
    pub by_kind: BTreeMap<String, usize>,
    /// Most recent entries, newest first
    pub recent: Vec<ErrorLogEntry>,
}

impl ErrorStats {
    /// Aggregate entries given oldest first
    #[must_use]
    pub fn from_entries(entries: Vec<ErrorLogEntry>, recent_limit: usize) -> Self {
        let mut stats = Self {
            total: entries.len(),
            ..Self::default()
        };

        for entry in &entries {
            *stats.by_session.entry(entry.session_id.clone()).or_default() += 1;
            *stats.by_kind.entry(entry.error.kind.clone()).or_default() += 1;
        }
        stats.recent = entries.into_iter().rev().take(recent_limit).collect();
        stats
    }
}

/// Process-wide error sink
#[derive(Debug)]
pub struct Diagnostics {
    ring: ErrorRing,
    durable: DurableErrorLog,
    recent_limit: usize,
}

impl Diagnostics {
    /// Create service over a durable store
    #[must_use]
    pub fn new(config: &DiagnosticsConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            ring: ErrorRing::new(config.ring_capacity),
            durable: DurableErrorLog::new(
                store,
                chrono::Duration::hours(config.retention_hours),
            ),
            recent_limit: config.recent_limit,
        }
    }

    /// Create service with default config and a process-local store
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(&DiagnosticsConfig::default(), Arc::new(MemoryStore::new()))
    }

    /// Record an entry
    pub fn record(&self, entry: ErrorLogEntry) {
        tracing::debug!(
            session_id = %entry.session_id,
            kind = %entry.error.kind,
            retry_attempt = entry.retry_attempt,
            "Recording error: {}",
            entry.error.message
        );

        if let Err(e) = self.durable.append(&entry) {
            tracing::warn!(error = %e, "Failed to persist error log entry");
        }
        self.ring.push(entry);
    }

    /// Record an entry from async code
    ///
    /// The durable write runs on the blocking pool, never on a runtime worker.
    /// Returns once the entry is visible in both logs.
    pub async fn record_async(self: &Arc<Self>, entry: ErrorLogEntry) {
        let diagnostics = Arc::clone(self);
        if let Err(e) = tokio::task::spawn_blocking(move || diagnostics.record(entry)).await {
            tracing::warn!(error = %e, "Error log write task failed");
        }
    }

    /// Record an error caught outside any retry scope
    pub fn report_global(
        &self,
        error: ErrorDetails,
        source: impl Into<String>,
        location: Option<String>,
    ) {
        self.record(Self::global_entry(error, source, location));
    }

    /// [`report_global`](Self::report_global) from async code
    pub async fn report_global_async(
        self: &Arc<Self>,
        error: ErrorDetails,
        source: impl Into<String>,
        location: Option<String>,
    ) {
        self.record_async(Self::global_entry(error, source, location))
            .await;
    }

    fn global_entry(
        error: ErrorDetails,
        source: impl Into<String>,
        location: Option<String>,
    ) -> ErrorLogEntry {
        let entry = ErrorLogEntry::global(error, source, location);
        tracing::error!(
            source = ?entry.context,
            "Unhandled error: {}",
            entry.error.message
        );
        entry
    }

    /// In-memory entries, optionally restricted to one session
    #[must_use]
    pub fn errors(&self, session_id: Option<&str>) -> Vec<ErrorLogEntry> {
        match session_id {
            Some(id) => self.ring.for_session(id),
            None => self.ring.snapshot(),
        }
    }

    /// Entries from the durable log (within retention)
    pub fn persisted_errors(&self) -> Result<Vec<ErrorLogEntry>, StoreError> {
        self.durable.entries()
    }

    /// Subscribe to entries recorded from now on
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ErrorLogEntry> {
        self.ring.subscribe()
    }

    /// Aggregate statistics over the in-memory log
    #[must_use]
    pub fn stats(&self) -> ErrorStats {
        ErrorStats::from_entries(self.ring.snapshot(), self.recent_limit)
    }

    /// Aggregate statistics over the durable log
    pub fn persisted_stats(&self) -> Result<ErrorStats, StoreError> {
        Ok(ErrorStats::from_entries(
            self.durable.entries()?,
            self.recent_limit,
        ))
    }

    /// Clear memory and durable logs
    pub fn clear(&self) {
        self.ring.clear();
        if let Err(e) = self.durable.clear() {
            tracing::warn!(error = %e, "Failed to clear persisted error log");
        }
    }

    /// Clear one session from memory and durable logs
    pub fn clear_session(&self, session_id: &str) {
        self.ring.clear_session(session_id);
        if let Err(e) = self.durable.clear_session(session_id) {
            tracing::warn!(error = %e, session_id, "Failed to clear persisted session errors");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::GLOBAL_SESSION;
    use crate::store::MockKeyValueStore;

    fn failure(session: &str, kind: &str, attempt: u32) -> ErrorLogEntry {
        ErrorLogEntry::retry(session, ErrorDetails::new(kind, "failed"), attempt, 3)
    }

    #[test]
    fn stats_count_by_session_and_kind() {
        let diagnostics = Diagnostics::in_memory();
        diagnostics.record(failure("a", "OperationTimeout", 1));
        diagnostics.record(failure("a", "HttpError", 2));
        diagnostics.record(failure("b", "HttpError", 1));

        let stats = diagnostics.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_session["a"], 2);
        assert_eq!(stats.by_kind["HttpError"], 2);
        assert_eq!(stats.recent[0].session_id, "b");
    }

    #[test]
    fn stats_recent_is_limited() {
        let diagnostics = Diagnostics::in_memory();
        for n in 0..25 {
            diagnostics.record(failure("s", "Test", n));
        }

        let stats = diagnostics.stats();
        assert_eq!(stats.recent.len(), DEFAULT_RECENT_LIMIT);
        assert_eq!(stats.recent[0].retry_attempt, 24);
    }

    #[test]
    fn persisted_stats_survive_a_fresh_ring() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let first = Diagnostics::new(&DiagnosticsConfig::default(), Arc::clone(&store));
        first.record(failure("a", "HttpError", 1));
        first.record(failure("a", "HttpError", 2));

        let second = Diagnostics::new(&DiagnosticsConfig::default(), store);
        let stats = second.persisted_stats().unwrap();
        assert_eq!(second.stats().total, 0);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.recent[0].retry_attempt, 2);
    }

    #[test]
    fn errors_filter_by_session() {
        let diagnostics = Diagnostics::in_memory();
        diagnostics.record(failure("a", "Test", 1));
        diagnostics.record(failure("b", "Test", 1));

        assert_eq!(diagnostics.errors(Some("a")).len(), 1);
        assert_eq!(diagnostics.errors(None).len(), 2);
        assert!(diagnostics.errors(Some("missing")).is_empty());
    }

    #[test]
    fn record_persists_and_clear_session_removes() {
        let diagnostics = Diagnostics::in_memory();
        diagnostics.record(failure("a", "Test", 1));
        diagnostics.record(failure("b", "Test", 1));
        assert_eq!(diagnostics.persisted_errors().unwrap().len(), 2);

        diagnostics.clear_session("a");
        assert_eq!(diagnostics.errors(None).len(), 1);
        assert_eq!(diagnostics.persisted_errors().unwrap().len(), 1);

        diagnostics.clear();
        assert!(diagnostics.errors(None).is_empty());
        assert!(diagnostics.persisted_errors().unwrap().is_empty());
    }

    #[test]
    fn store_failures_do_not_prevent_recording() {
        let mut store = MockKeyValueStore::new();
        store.expect_get().returning(|_| Ok(None));
        store.expect_set().returning(|key, _| {
            Err(StoreError::Io {
                key: key.to_string(),
                source: std::io::Error::other("quota exceeded"),
            })
        });

        let diagnostics = Diagnostics::new(&DiagnosticsConfig::default(), Arc::new(store));
        diagnostics.record(failure("s", "Test", 1));

        assert_eq!(diagnostics.errors(Some("s")).len(), 1);
    }

    #[test]
    fn report_global_uses_global_session() {
        let diagnostics = Diagnostics::in_memory();
        diagnostics.report_global(ErrorDetails::new("Panic", "oops"), "panic", None);

        let entries = diagnostics.errors(Some(GLOBAL_SESSION));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].retry_attempt, 0);
    }

    #[test]
    fn concurrent_records_are_all_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(crate::store::FileStore::open(dir.path()).unwrap());
        let diagnostics = Diagnostics::new(&DiagnosticsConfig::default(), store);

        std::thread::scope(|scope| {
            for t in 0..8 {
                let diagnostics = &diagnostics;
                scope.spawn(move || {
                    for n in 0..20 {
                        diagnostics.record(failure(&format!("worker-{t}"), "Test", n));
                    }
                });
            }
        });

        assert_eq!(diagnostics.persisted_errors().unwrap().len(), 160);
        assert_eq!(diagnostics.errors(None).len(), DEFAULT_RING_CAPACITY);
    }

    #[tokio::test]
    async fn record_async_writes_off_the_runtime_thread() {
        let writers = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut store = MockKeyValueStore::new();
        store.expect_get().returning(|_| Ok(None));
        let seen = Arc::clone(&writers);
        store.expect_set().returning(move |_, _| {
            seen.lock().push(std::thread::current().id());
            Ok(())
        });

        let diagnostics = Arc::new(Diagnostics::new(
            &DiagnosticsConfig::default(),
            Arc::new(store),
        ));
        diagnostics.record_async(failure("s", "Test", 1)).await;

        assert_eq!(diagnostics.errors(Some("s")).len(), 1);
        let writers = writers.lock();
        assert_eq!(writers.len(), 1);
        assert_ne!(writers[0], std::thread::current().id());
    }
}
