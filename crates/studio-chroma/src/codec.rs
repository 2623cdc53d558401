//! Base64 and raster codec plumbing
//!
//! Decoding accepts any format the `image` crate was built with. Encoding is
//! always PNG with fixed compression and filter settings, so identical pixels
//! produce identical bytes.

use crate::error::ChromaError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageError, ImageReader, Limits, RgbaImage};
use std::io::Cursor;

/// Decode a base64 payload, tolerating a `data:<mime>;base64,` prefix
pub(crate) fn decode_base64(source: &str) -> Result<Vec<u8>, ChromaError> {
    let trimmed = source.trim();
    let payload = match trimmed.strip_prefix("data:") {
        Some(uri) => uri
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| ChromaError::ImageDecode {
                reason: "data URI has no payload".to_string(),
            })?,
        None => trimmed,
    };

    STANDARD
        .decode(payload)
        .map_err(|e| ChromaError::ImageDecode {
            reason: format!("invalid base64: {e}"),
        })
}

/// Decode raster bytes into an RGBA buffer of at most `max_pixels` pixels
pub(crate) fn decode_rgba(bytes: &[u8], max_pixels: u64) -> Result<RgbaImage, ChromaError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ChromaError::ImageDecode {
            reason: e.to_string(),
        })?;
    if reader.format().is_none() {
        return Err(ChromaError::ImageDecode {
            reason: "unrecognized image format".to_string(),
        });
    }

    // Room for 16-bit channels; the pixel budget itself is checked below
    let mut limits = Limits::default();
    limits.max_alloc = Some(max_pixels.saturating_mul(8));
    reader.limits(limits);

    let image = reader.decode().map_err(|e| match e {
        ImageError::Limits(limit) => ChromaError::RenderContext {
            reason: limit.to_string(),
        },
        other => ChromaError::ImageDecode {
            reason: other.to_string(),
        },
    })?;

    let pixels = u64::from(image.width()) * u64::from(image.height());
    if pixels > max_pixels {
        return Err(ChromaError::RenderContext {
            reason: format!("{pixels} pixels exceeds the {max_pixels} pixel budget"),
        });
    }
    Ok(image.into_rgba8())
}

/// Encode an RGBA buffer as PNG with pinned settings
pub(crate) fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ChromaError> {
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Default, FilterType::Adaptive)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(ChromaError::Encode)?;
    Ok(out)
}

pub(crate) fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
