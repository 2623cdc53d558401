//! Error types for the studio shell

use crate::config::ConfigError;
use studio_chroma::ChromaError;
use studio_diagnostics::{GlobalHandlerError, StoreError};
use studio_webhook::WebhookError;

/// Main studio error type
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Durable error store unavailable
    #[error("error store: {0}")]
    Store(#[from] StoreError),

    /// Chroma keying failed
    #[error("chroma key failed: {0}")]
    Chroma(#[from] ChromaError),

    /// Webhook call failed
    #[error("webhook failed: {0}")]
    Webhook(#[from] WebhookError),

    /// Global handler could not be installed
    #[error("global handler: {0}")]
    GlobalHandler(#[from] GlobalHandlerError),

    /// Tracing subscriber could not be installed
    #[error("tracing setup failed: {0}")]
    Telemetry(String),

    /// Studio is shutting down
    #[error("studio is shutting down")]
    ShuttingDown,
}

impl StudioError {
    /// Whether the error was caused by caller input rather than the environment
    #[inline]
    #[must_use]
    pub fn is_bad_input(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::Chroma(e) => e.is_bad_input(),
            Self::Webhook(e) => matches!(
                e,
                WebhookError::InvalidPayload(_)
                    | WebhookError::NotConfigured(_)
                    | WebhookError::InvalidUrl { .. }
            ),
            _ => false,
        }
    }
}
