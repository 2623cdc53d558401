//! Studio Chroma - alpha recovery from solid-color mattes
//!
//! The upstream generator cannot emit transparency, so it paints a solid
//! matte (magenta by default) where transparency was requested. This crate
//! turns matte pixels transparent, with a feathered edge, and returns a PNG.
//!
//! # Example
//!
//! ```rust,ignore
//! use studio_chroma::remove_chroma_key;
//!
//! let keyed = remove_chroma_key(&response.image, "#FF00FF", 60.0)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod codec;
mod color;
mod error;
mod key;

pub use color::KeyColor;
pub use error::ChromaError;
pub use key::{ChromaKeyParams, DEFAULT_TOLERANCE};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Default pixel budget for a single transform (64 megapixels)
pub const DEFAULT_MAX_PIXELS: u64 = 64_000_000;

/// Chroma-key configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromaConfig {
    /// Matte color, `#RRGGBB`
    pub key_color: KeyColor,
    /// RGB distance below which pixels become transparent
    pub tolerance: f64,
    /// Largest image (in pixels) the transform will allocate for
    pub max_pixels: u64,
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            key_color: KeyColor::MAGENTA,
            tolerance: DEFAULT_TOLERANCE,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

/// Configured chroma-key transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaKeyer {
    params: ChromaKeyParams,
    max_pixels: u64,
}

impl ChromaKeyer {
    /// Create keyer with a pixel budget
    #[inline]
    #[must_use]
    pub fn new(params: ChromaKeyParams, max_pixels: u64) -> Self {
        Self { params, max_pixels }
    }

    /// Create keyer from configuration
    ///
    /// # Errors
    /// - `ChromaError::InvalidTolerance` for a negative or non-finite tolerance
    pub fn from_config(config: &ChromaConfig) -> Result<Self, ChromaError> {
        let params = ChromaKeyParams::new(config.key_color, config.tolerance)?;
        Ok(Self::new(params, config.max_pixels))
    }

    /// Keying parameters
    #[inline]
    #[must_use]
    pub fn params(&self) -> &ChromaKeyParams {
        &self.params
    }

    /// Same keyer with different parameters
    #[inline]
    #[must_use]
    pub fn with_params(mut self, params: ChromaKeyParams) -> Self {
        self.params = params;
        self
    }

    /// Key an in-memory image; the input is not modified
    #[must_use]
    pub fn apply_image(&self, image: &RgbaImage) -> RgbaImage {
        self.params.apply(image)
    }

    /// Key encoded raster bytes (any supported format) into PNG bytes
    ///
    /// # Errors
    /// - `ChromaError::ImageDecode` if the bytes are not a decodable image
    /// - `ChromaError::RenderContext` if the image exceeds the pixel budget
    /// - `ChromaError::Encode` if PNG encoding fails
    pub fn apply_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, ChromaError> {
        self.params.validate()?;
        let mut image = codec::decode_rgba(bytes, self.max_pixels)?;
        self.params.apply_in_place(&mut image);
        let png = codec::encode_png(&image)?;

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            key_color = %self.params.key_color,
            tolerance = self.params.tolerance,
            "Chroma key applied"
        );
        Ok(png)
    }

    /// Key a base64 image into a base64 PNG (no data-URI prefix)
    ///
    /// # Errors
    /// Same as [`apply_bytes`](Self::apply_bytes), plus `ImageDecode` for malformed base64
    pub fn apply_base64(&self, source: &str) -> Result<String, ChromaError> {
        let bytes = codec::decode_base64(source)?;
        let png = self.apply_bytes(&bytes)?;
        Ok(codec::encode_base64(&png))
    }
}

impl Default for ChromaKeyer {
    fn default() -> Self {
        Self::new(ChromaKeyParams::default(), DEFAULT_MAX_PIXELS)
    }
}

/// Remove a chroma matte from a base64 image
///
/// # Arguments
/// * `source_base64` - Source image, optionally as a data URI
/// * `key_color_hex` - Matte color, e.g. `"#FF00FF"`
/// * `tolerance` - RGB distance of the hard-key zone (feather extends to 1.5x)
///
/// # Errors
/// - `ChromaError::InvalidKeyColor` / `ChromaError::InvalidTolerance` for bad parameters
/// - `ChromaError::ImageDecode` for malformed base64 or undecodable image data
/// - `ChromaError::RenderContext` if the pixel buffer cannot be acquired
pub fn remove_chroma_key(
    source_base64: &str,
    key_color_hex: &str,
    tolerance: f64,
) -> Result<String, ChromaError> {
    let params = ChromaKeyParams::new(key_color_hex.parse()?, tolerance)?;
    ChromaKeyer::default().with_params(params).apply_base64(source_base64)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
