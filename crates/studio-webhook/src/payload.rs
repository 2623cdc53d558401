//! Webhook payloads
//!
//! One struct per workflow, tagged by `type` on the wire. Required fields are
//! plain values, optional ones are `Option`. [`WebhookPayload::validate`] runs
//! before anything is serialized.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// Required field empty
    #[error("{kind}: field `{field}` is required")]
    MissingField { kind: WebhookKind, field: &'static str },

    /// Image data is not base64
    #[error("{kind}: image `{name}` is not valid base64")]
    InvalidImage { kind: WebhookKind, name: String },

    /// Numeric field out of range
    #[error("{kind}: field `{field}` is out of range")]
    OutOfRange { kind: WebhookKind, field: &'static str },
}

/// Workflow addressed by a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookKind {
    /// Image treatment (background removal, retouching)
    Treatment,
    /// Product video generation
    Video,
    /// Social media post generation
    SocialPost,
    /// Product sheet generation
    Fiche,
}

impl WebhookKind {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Treatment => "treatment",
            Self::Video => "video",
            Self::SocialPost => "social_post",
            Self::Fiche => "fiche",
        }
    }
}

impl fmt::Display for WebhookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uploaded product image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    /// Original file name
    pub file_name: String,
    /// MIME type, e.g. `image/jpeg`
    pub mime_type: String,
    /// Base64 data without data-URI prefix
    pub data: String,
}

impl ProductImage {
    /// Create image from raw bytes
    #[must_use]
    pub fn from_bytes(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    fn validate(&self, kind: WebhookKind) -> Result<(), PayloadError> {
        if self.data.is_empty() || STANDARD.decode(&self.data).is_err() {
            return Err(PayloadError::InvalidImage {
                kind,
                name: self.file_name.clone(),
            });
        }
        Ok(())
    }
}

/// Image treatment request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentRequest {
    pub product_name: String,
    /// Treatment preset understood by the backend
    pub treatment: String,
    pub images: Vec<ProductImage>,
    /// Ask for a chroma matte instead of a background
    #[serde(default)]
    pub transparent_background: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Product video request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRequest {
    pub product_name: String,
    pub image: ProductImage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
}

/// Target network for a social post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialPlatform {
    Instagram,
    Facebook,
    Linkedin,
    Tiktok,
}

/// Social post request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPostRequest {
    pub product_name: String,
    pub platform: SocialPlatform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ProductImage>,
}

/// Product sheet request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FicheRequest {
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

/// Any webhook payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WebhookPayload {
    Treatment(TreatmentRequest),
    Video(VideoRequest),
    SocialPost(SocialPostRequest),
    Fiche(FicheRequest),
}

/// Longest video the backend accepts
const MAX_VIDEO_SECS: u32 = 60;

impl WebhookPayload {
    /// Workflow this payload targets
    #[must_use]
    pub fn kind(&self) -> WebhookKind {
        match self {
            Self::Treatment(_) => WebhookKind::Treatment,
            Self::Video(_) => WebhookKind::Video,
            Self::SocialPost(_) => WebhookKind::SocialPost,
            Self::Fiche(_) => WebhookKind::Fiche,
        }
    }

    /// Whether the response image should be chroma-keyed
    #[must_use]
    pub fn wants_transparency(&self) -> bool {
        matches!(self, Self::Treatment(r) if r.transparent_background)
    }

    /// Check required fields and image encoding
    ///
    /// # Errors
    /// - `PayloadError::MissingField` for empty required fields
    /// - `PayloadError::InvalidImage` for non-base64 image data
    /// - `PayloadError::OutOfRange` for a video duration of 0 or above 60s
    pub fn validate(&self) -> Result<(), PayloadError> {
        let kind = self.kind();
        let require = |value: &str, field: &'static str| {
            if value.trim().is_empty() {
                Err(PayloadError::MissingField { kind, field })
            } else {
                Ok(())
            }
        };

        match self {
            Self::Treatment(r) => {
                require(&r.product_name, "product_name")?;
                require(&r.treatment, "treatment")?;
                if r.images.is_empty() {
                    return Err(PayloadError::MissingField { kind, field: "images" });
                }
                r.images.iter().try_for_each(|i| i.validate(kind))
            }
            Self::Video(r) => {
                require(&r.product_name, "product_name")?;
                if let Some(secs) = r.duration_secs {
                    if secs == 0 || secs > MAX_VIDEO_SECS {
                        return Err(PayloadError::OutOfRange { kind, field: "duration_secs" });
                    }
                }
                r.image.validate(kind)
            }
            Self::SocialPost(r) => {
                require(&r.product_name, "product_name")?;
                r.image.as_ref().map_or(Ok(()), |i| i.validate(kind))
            }
            Self::Fiche(r) => {
                require(&r.product_name, "product_name")?;
                r.images.iter().try_for_each(|i| i.validate(kind))
            }
        }
    }
}
