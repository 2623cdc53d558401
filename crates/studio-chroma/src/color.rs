//! Key color parsing

use crate::error::ChromaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// RGB reference color of the matte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl KeyColor {
    /// Magenta, the default matte color
    pub const MAGENTA: Self = Self::new(255, 0, 255);

    /// Create from components
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Euclidean RGB distance to a pixel
    #[inline]
    #[must_use]
    pub fn distance(&self, r: u8, g: u8, b: u8) -> f64 {
        let dr = f64::from(r) - f64::from(self.r);
        let dg = f64::from(g) - f64::from(self.g);
        let db = f64::from(b) - f64::from(self.b);
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

impl Default for KeyColor {
    fn default() -> Self {
        Self::MAGENTA
    }
}

impl FromStr for KeyColor {
    type Err = ChromaError;

    /// Parse `#RRGGBB`, `RRGGBB`, `#RGB` or `RGB` (case-insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(ChromaError::InvalidKeyColor(s.to_string())),
        };

        let bytes = hex::decode(&expanded).map_err(|_| ChromaError::InvalidKeyColor(s.to_string()))?;
        match bytes[..] {
            [r, g, b] => Ok(Self::new(r, g, b)),
            _ => Err(ChromaError::InvalidKeyColor(s.to_string())),
        }
    }
}

impl TryFrom<String> for KeyColor {
    type Error = ChromaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyColor> for String {
    fn from(color: KeyColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for KeyColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", hex::encode_upper([self.r, self.g, self.b]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_forms() {
        assert_eq!("#FF00FF".parse::<KeyColor>().unwrap(), KeyColor::MAGENTA);
        assert_eq!("ff00ff".parse::<KeyColor>().unwrap(), KeyColor::MAGENTA);
        assert_eq!("#0f0".parse::<KeyColor>().unwrap(), KeyColor::new(0, 255, 0));
    }

    #[test]
    fn rejects_malformed_colors() {
        for bad in ["", "#12345", "#GGGGGG", "magenta", "#FF00FF00", "##FF00FF", "##F0F"] {
            assert!(
                matches!(bad.parse::<KeyColor>(), Err(ChromaError::InvalidKeyColor(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn display_roundtrips() {
        let color = KeyColor::new(18, 52, 171);
        assert_eq!(color.to_string(), "#1234AB");
        assert_eq!(color.to_string().parse::<KeyColor>().unwrap(), color);
    }

    #[test]
    fn distance_is_euclidean() {
        let key = KeyColor::new(0, 0, 0);
        assert_eq!(key.distance(3, 4, 0), 5.0);
        assert_eq!(KeyColor::MAGENTA.distance(255, 0, 255), 0.0);
    }
}
