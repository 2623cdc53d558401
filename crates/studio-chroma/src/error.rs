//! Chroma-key errors
//!
//! Decode failures mean bad input; render-context failures mean the host
//! could not provide a pixel buffer. Callers typically fall back to the
//! original image for both.

/// Chroma-key transform errors
#[derive(Debug, thiserror::Error)]
pub enum ChromaError {
    /// Source is not valid base64 or not a decodable raster image
    #[error("failed to load image: {reason}")]
    ImageDecode { reason: String },

    /// Pixel buffer could not be acquired (size limits, allocation)
    #[error("failed to acquire pixel buffer: {reason}")]
    RenderContext { reason: String },

    /// Key color is not a `#RRGGBB` / `#RGB` hex string
    #[error("invalid key color {0:?}: expected #RRGGBB")]
    InvalidKeyColor(String),

    /// Tolerance is negative or not a number
    #[error("invalid tolerance {0}: must be a finite number >= 0")]
    InvalidTolerance(f64),

    /// PNG encoding of the keyed image failed
    #[error("failed to encode PNG: {0}")]
    Encode(#[source] image::ImageError),
}

impl ChromaError {
    /// Check if the input itself was at fault
    #[inline]
    #[must_use]
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            Self::ImageDecode { .. } | Self::InvalidKeyColor(_) | Self::InvalidTolerance(_)
        )
    }
}
