//! RGB color value shared by palettes, mappings and images.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An 8-bit-per-channel RGB color.
///
/// Serializes as a `[r, g, b]` array so palette files stay compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    /// Squared Euclidean distance in RGB space.
    ///
    /// Orders colors exactly like the true Euclidean distance, without the
    /// square root, so ties stay ties.
    #[inline]
    pub fn distance_sq(self, other: Rgb) -> u32 {
        let dr = self.0 as i32 - other.0 as i32;
        let dg = self.1 as i32 - other.1 as i32;
        let db = self.2 as i32 - other.2 as i32;
        (dr * dr + dg * dg + db * db) as u32
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.0, self.1, self.2]
    }

    pub fn with_alpha(self, alpha: u8) -> image::Rgba<u8> {
        image::Rgba([self.0, self.1, self.2, alpha])
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Rgb(r, g, b)
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(c: Rgb) -> Self {
        c.to_array()
    }
}

impl From<image::Rgb<u8>> for Rgb {
    fn from(p: image::Rgb<u8>) -> Self {
        Rgb(p.0[0], p.0[1], p.0[2])
    }
}

impl From<Rgb> for image::Rgb<u8> {
    fn from(c: Rgb) -> Self {
        image::Rgb(c.to_array())
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Error parsing a color from text.
#[derive(Debug, thiserror::Error)]
#[error("Invalid color {0:?} (expected \"r,g,b\" or \"#rrggbb\")")]
pub struct ParseRgbError(pub String);

impl std::str::FromStr for Rgb {
    type Err = ParseRgbError;

    /// Accepts `"0,0,255"` or `"#0000ff"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRgbError(s.to_string());
        let s = s.trim();

        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(err());
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
            return Ok(Rgb(channel(0)?, channel(2)?, channel(4)?));
        }

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(err());
        }
        let channel = |p: &str| p.parse::<u8>().map_err(|_| err());
        Ok(Rgb(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?))
    }
}
