//! Studio Retry - resilient execution of unreliable async calls
//!
//! Wraps an operation with:
//! - A per-attempt timeout
//! - Bounded attempts with exponential backoff, clamped to a maximum delay
//! - One diagnostics entry per failed attempt
//!
//! # Example
//!
//! ```rust,ignore
//! use studio_retry::{RetryExecutor, RetryOverrides};
//!
//! let executor = RetryExecutor::new(diagnostics);
//! let body = executor
//!     .execute(|| client.post(url).send(), "session-42", RetryOverrides::none().max_attempts(5))
//!     .await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod error;
mod executor;

pub use config::{RetryConfig, RetryOverrides};
pub use error::{AttemptError, ConfigError, RetryError};
pub use executor::RetryExecutor;
pub use tokio_util::sync::CancellationToken;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
