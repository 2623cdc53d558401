//! Studio Diagnostics - process-wide error log
//!
//! Collects error entries from retry scopes and from the global handler:
//! - Bounded in-memory ring (last 100 entries) with live subscription
//! - Durable copy in a key-value store, pruned to the last 24 hours
//! - Read-back by session, aggregate statistics, bulk deletion
//!
//! # Example
//!
//! ```rust,ignore
//! use studio_diagnostics::{Diagnostics, DiagnosticsConfig, FileStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(FileStore::open("/var/lib/studio")?);
//! let diagnostics = Arc::new(Diagnostics::new(&DiagnosticsConfig::default(), store));
//! let _guard = diagnostics.install_global_handler()?;
//!
//! let stats = diagnostics.stats();
//! println!("{} errors recorded", stats.total);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod entry;
mod global;
mod persist;
mod ring;
mod service;
mod store;

pub use entry::{EntryId, ErrorContext, ErrorDetails, ErrorLogEntry, GLOBAL_SESSION};
pub use global::{is_installed, GlobalHandlerError, GlobalHandlerGuard};
pub use persist::{DurableErrorLog, DEFAULT_RETENTION_HOURS, ERROR_LOG_KEY};
pub use ring::{ErrorRing, DEFAULT_RING_CAPACITY};
pub use service::{Diagnostics, DiagnosticsConfig, ErrorStats, DEFAULT_RECENT_LIMIT};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
