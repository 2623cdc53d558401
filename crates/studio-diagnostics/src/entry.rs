//! Error log entries
//!
//! An [`ErrorLogEntry`] is created once per failed attempt (or per uncaught
//! process-wide error) and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Session id used for entries recorded by the global handler
pub const GLOBAL_SESSION: &str = "global";

/// Unique entry identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    /// Generate new entry ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The recorded error: display message plus a kind used for aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Human-readable message (the error's `Display` output)
    pub message: String,
    /// Error kind, e.g. `OperationTimeout` or the short name of the error type
    pub kind: String,
}

impl ErrorDetails {
    /// Create error details
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: kind.into(),
        }
    }

    /// Capture an error value, using its short type name as the kind
    #[must_use]
    pub fn from_error<E: std::error::Error + ?Sized>(error: &E) -> Self {
        Self::new(short_type_name::<E>(), error.to_string())
    }
}

/// Context attached to an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    /// Failure of one attempt inside a retry scope
    Retry {
        /// 1-based attempt that failed
        attempt: u32,
        /// Configured attempt budget
        max_attempts: u32,
        /// Whether another attempt follows
        will_retry: bool,
    },
    /// Error caught by the process-wide handler
    Global {
        /// Channel the error arrived on (`panic`, `task`, ...)
        source: String,
        /// Source location, when known
        location: Option<String>,
    },
}

/// Append-only error record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    /// Entry ID
    pub id: EntryId,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied correlation id
    pub session_id: String,
    /// The error itself
    pub error: ErrorDetails,
    /// Where and why it was recorded
    pub context: ErrorContext,
    /// 1-based attempt index, 0 for global entries
    pub retry_attempt: u32,
}

impl ErrorLogEntry {
    /// Entry for a failed attempt in a retry scope
    #[must_use]
    pub fn retry(
        session_id: impl Into<String>,
        error: ErrorDetails,
        attempt: u32,
        max_attempts: u32,
    ) -> Self {
        Self {
            id: EntryId::new(),
            timestamp: Utc::now(),
            session_id: session_id.into(),
            error,
            context: ErrorContext::Retry {
                attempt,
                max_attempts,
                will_retry: attempt < max_attempts,
            },
            retry_attempt: attempt,
        }
    }

    /// Entry for an error caught by the global handler
    #[must_use]
    pub fn global(
        error: ErrorDetails,
        source: impl Into<String>,
        location: Option<String>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            timestamp: Utc::now(),
            session_id: GLOBAL_SESSION.to_string(),
            error,
            context: ErrorContext::Global {
                source: source.into(),
                location,
            },
            retry_attempt: 0,
        }
    }

    /// Override the timestamp (replay and tests)
    #[inline]
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether another attempt followed this failure
    #[inline]
    #[must_use]
    pub fn will_retry(&self) -> bool {
        matches!(self.context, ErrorContext::Retry { will_retry: true, .. })
    }
}

/// Last path segment of a type name, generics stripped
fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
