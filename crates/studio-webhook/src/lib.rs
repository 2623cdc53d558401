//! Studio Webhook - typed client for the content generation workflows
//!
//! Payloads are validated before sending, delivered through the retry
//! executor, and generated images are chroma-keyed for display when the
//! workflow painted a matte.
//!
//! # Example
//!
//! ```rust,ignore
//! use studio_webhook::{WebhookClient, WebhookPayload};
//!
//! let client = WebhookClient::new(config.webhooks.clone(), executor)?;
//! let response = client.send(&payload, "session-42").await?;
//! if let Some(image) = response.generated_image() {
//!     let display = image.for_display(&keyer);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod client;
mod error;
mod payload;
mod response;

pub use client::{WebhookClient, WebhooksConfig};
pub use error::{HttpError, WebhookError};
pub use payload::{
    FicheRequest, PayloadError, ProductImage, SocialPlatform, SocialPostRequest,
    TreatmentRequest, VideoRequest, WebhookKind, WebhookPayload,
};
pub use response::{DisplayImage, GeneratedImage, WebhookResponse};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
