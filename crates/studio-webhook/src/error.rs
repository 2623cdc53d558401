//! Webhook error types

use crate::payload::{PayloadError, WebhookKind};
use studio_retry::RetryError;

/// Single HTTP round-trip failure
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Connection, TLS, or transport failure
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Non-success status
    #[error("webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Body could not be read
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Webhook client errors
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Payload failed validation, nothing was sent
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    /// No endpoint configured for this workflow
    #[error("no webhook URL configured for {0}")]
    NotConfigured(WebhookKind),

    /// Endpoint URL does not parse
    #[error("invalid webhook URL for {kind}: {url}")]
    InvalidUrl { kind: WebhookKind, url: String },

    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Every attempt failed, or the call was cancelled
    #[error(transparent)]
    Delivery(#[from] RetryError<HttpError>),
}

impl WebhookError {
    /// Whether the call was cut short by cancellation or shutdown
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Delivery(e) if e.is_cancelled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_includes_body() {
        let err = HttpError::Status {
            status: 503,
            body: "workflow busy".to_string(),
        };
        assert_eq!(err.to_string(), "webhook returned HTTP 503: workflow busy");
    }
}
