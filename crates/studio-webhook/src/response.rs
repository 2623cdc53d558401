//! Webhook responses and image post-processing

use serde::{Deserialize, Serialize};
use studio_chroma::ChromaKeyer;

/// Decoded webhook response
///
/// Workflows return a subset of these fields; missing ones default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookResponse {
    /// Generated image, base64 (optionally a data URI)
    pub image: Option<String>,
    /// Image carries a chroma matte to be keyed out
    pub transparent: bool,
    /// Generated text (post copy, product sheet)
    pub text: Option<String>,
    /// Link to a rendered video
    pub video_url: Option<String>,
    /// Free-form status message
    pub message: Option<String>,
}

impl WebhookResponse {
    /// Parse a response body
    ///
    /// An empty body is an empty response; a body that is not a JSON object
    /// is kept verbatim as `text`.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Self::default();
        }
        serde_json::from_str(trimmed).unwrap_or_else(|_| Self {
            text: Some(body.to_string()),
            ..Self::default()
        })
    }

    /// Generated image, if any
    #[must_use]
    pub fn generated_image(&self) -> Option<GeneratedImage> {
        self.image.as_ref().map(|data| GeneratedImage {
            data: data.clone(),
            transparent: self.transparent,
        })
    }
}

/// Image returned by a workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Base64 image data
    pub data: String,
    /// Matte should be keyed out before display
    pub transparent: bool,
}

/// Image ready to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayImage {
    /// Base64 image data
    pub data: String,
    /// Matte was removed
    pub keyed: bool,
}

impl GeneratedImage {
    /// Prepare for display, keying out the matte when requested
    ///
    /// A keying failure is logged and the original image is shown instead.
    #[must_use]
    pub fn for_display(&self, keyer: &ChromaKeyer) -> DisplayImage {
        if !self.transparent {
            return DisplayImage {
                data: self.data.clone(),
                keyed: false,
            };
        }

        match keyer.apply_base64(&self.data) {
            Ok(data) => DisplayImage { data, keyed: true },
            Err(error) => {
                tracing::warn!(%error, "Chroma key failed, showing original image");
                DisplayImage {
                    data: self.data.clone(),
                    keyed: false,
                }
            }
        }
    }
}
