//! Per-pixel keying rule
//!
//! Three zones by RGB distance `d` to the key color:
//! - `d < tolerance`: fully transparent
//! - `d < 1.5 * tolerance`: linear feather, never raising the existing alpha
//! - otherwise: alpha untouched
//!
//! Each pixel depends only on its own value, so rows are processed in parallel.

use crate::color::KeyColor;
use crate::error::ChromaError;
use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Default tolerance (RGB distance)
pub const DEFAULT_TOLERANCE: f64 = 60.0;

/// Feather band width as a fraction of the tolerance
const FEATHER_FRACTION: f64 = 0.5;

/// Key color plus tolerance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromaKeyParams {
    pub key_color: KeyColor,
    pub tolerance: f64,
}

impl Default for ChromaKeyParams {
    fn default() -> Self {
        Self {
            key_color: KeyColor::MAGENTA,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ChromaKeyParams {
    /// Create validated parameters
    ///
    /// # Errors
    /// - `ChromaError::InvalidTolerance` for negative or non-finite tolerance
    pub fn new(key_color: KeyColor, tolerance: f64) -> Result<Self, ChromaError> {
        let params = Self {
            key_color,
            tolerance,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check the tolerance range
    ///
    /// # Errors
    /// - `ChromaError::InvalidTolerance` for negative or non-finite tolerance
    pub fn validate(&self) -> Result<(), ChromaError> {
        if self.tolerance.is_finite() && self.tolerance >= 0.0 {
            Ok(())
        } else {
            Err(ChromaError::InvalidTolerance(self.tolerance))
        }
    }

    /// Output alpha for one RGBA pixel
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn alpha_for(&self, [r, g, b, a]: [u8; 4]) -> u8 {
        let d = self.key_color.distance(r, g, b);
        let tolerance = self.tolerance;

        if d < tolerance {
            0
        } else if d < tolerance * (1.0 + FEATHER_FRACTION) {
            let feathered = ((d - tolerance) / (tolerance * FEATHER_FRACTION) * 255.0)
                .round()
                .clamp(0.0, 255.0) as u8;
            feathered.min(a)
        } else {
            a
        }
    }

    /// Key a buffer in place, rows in parallel
    pub fn apply_in_place(&self, image: &mut RgbaImage) {
        let row_len = image.width() as usize * 4;
        if row_len == 0 {
            return;
        }

        image.par_chunks_mut(row_len).for_each(|row| {
            for px in row.chunks_exact_mut(4) {
                px[3] = self.alpha_for([px[0], px[1], px[2], px[3]]);
            }
        });
    }

    /// Keyed copy of `image`; the input is left untouched
    #[must_use]
    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        let mut out = image.clone();
        self.apply_in_place(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use proptest::prelude::*;

    fn params() -> ChromaKeyParams {
        ChromaKeyParams::default()
    }

    #[test]
    fn exact_key_color_is_transparent() {
        assert_eq!(params().alpha_for([255, 0, 255, 255]), 0);
    }

    #[test]
    fn feather_midpoint_is_half_alpha() {
        // Green channel offset of 75 = tolerance + quarter tolerance
        let alpha = params().alpha_for([255, 75, 255, 255]);
        assert!((127..=128).contains(&alpha), "alpha was {alpha}");
    }

    #[test]
    fn feather_never_raises_existing_alpha() {
        assert_eq!(params().alpha_for([255, 75, 255, 40]), 40);
    }

    #[test]
    fn distant_pixel_keeps_alpha() {
        assert_eq!(params().alpha_for([255, 255, 255, 255]), 255);
        assert_eq!(params().alpha_for([0, 200, 0, 90]), 90);
    }

    #[test]
    fn zero_tolerance_keys_nothing() {
        let params = ChromaKeyParams::new(KeyColor::MAGENTA, 0.0).unwrap();
        assert_eq!(params.alpha_for([255, 0, 255, 255]), 255);
    }

    #[test]
    fn invalid_tolerance_is_rejected() {
        assert!(ChromaKeyParams::new(KeyColor::MAGENTA, -1.0).is_err());
        assert!(ChromaKeyParams::new(KeyColor::MAGENTA, f64::NAN).is_err());
    }

    #[test]
    fn apply_leaves_input_untouched() {
        let source = RgbaImage::from_pixel(3, 2, Rgba([255, 0, 255, 255]));
        let keyed = params().apply(&source);

        assert!(source.pixels().all(|p| p.0[3] == 255));
        assert!(keyed.pixels().all(|p| p.0[3] == 0));
        assert_eq!(keyed.dimensions(), source.dimensions());
    }

    proptest! {
        #[test]
        fn prop_alpha_never_increases(r: u8, g: u8, b: u8, a: u8, tolerance in 0.0f64..200.0) {
            let params = ChromaKeyParams::new(KeyColor::MAGENTA, tolerance).unwrap();
            prop_assert!(params.alpha_for([r, g, b, a]) <= a);
        }

        #[test]
        fn prop_keying_is_idempotent(r: u8, g: u8, b: u8, a: u8) {
            let params = params();
            let once = params.alpha_for([r, g, b, a]);
            prop_assert_eq!(params.alpha_for([r, g, b, once]), once);
        }

        #[test]
        fn prop_parallel_pass_matches_per_pixel_rule(pixels in prop::collection::vec(any::<[u8; 4]>(), 1..64)) {
            let width = pixels.len() as u32;
            let image = RgbaImage::from_fn(width, 1, |x, _| Rgba(pixels[x as usize]));
            let keyed = params().apply(&image);
            for (x, px) in pixels.iter().enumerate() {
                prop_assert_eq!(keyed.get_pixel(x as u32, 0).0[3], params().alpha_for(*px));
            }
        }
    }
}
