//! Studio Core - application shell for the content studio
//!
//! Ties configuration, diagnostics, retries, chroma keying and the webhook
//! client into one [`Studio`] context:
//! - Loads and validates [`StudioConfig`] from TOML
//! - Installs tracing and the global error handler
//! - Sends generation requests and prepares returned images for display
//!
//! # Example
//!
//! ```rust,ignore
//! use studio_core::{init_tracing, Studio, StudioConfig};
//!
//! let config = StudioConfig::load("studio.toml")?;
//! init_tracing(&config.logging)?;
//!
//! let studio = Studio::start(config)?;
//! let generation = studio.generate(&payload, "session-42").await?;
//! studio.shutdown();
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod studio;
pub mod telemetry;

pub use config::{ConfigError, DiagnosticsSection, LoggingConfig, StudioConfig};
pub use error::StudioError;
pub use studio::{Generation, Studio};
pub use telemetry::init_tracing;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the studio
    pub use crate::{Generation, Studio, StudioConfig, StudioError};
    pub use studio_chroma::{remove_chroma_key, ChromaKeyer, KeyColor};
    pub use studio_diagnostics::{Diagnostics, ErrorLogEntry, ErrorStats};
    pub use studio_retry::{RetryConfig, RetryExecutor, RetryOverrides};
    pub use studio_webhook::{WebhookPayload, WebhookResponse};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
