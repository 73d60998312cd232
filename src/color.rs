//! Background color parsing
//!
//! Colors arrive as caller-supplied hex strings and are never a reason to fail:
//! anything that does not parse degrades to [`Color::DEFAULT`].

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An 8-bit-per-channel RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Opaque white, used when no color is given or the given one is malformed
    pub const DEFAULT: Self = Self::rgba(255, 255, 255, 255);

    /// Fully transparent black
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `RRGGBB` or `RRGGBBAA`, optionally `#`-prefixed and whitespace-padded.
    ///
    /// Eight digits are always read as `RRGGBBAA`: red in the most significant
    /// byte, alpha in the least. `"FF000080"` is half-transparent red, never
    /// an `AARRGGBB` value.
    ///
    /// Returns `None` for any other length or for non-hex characters.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);

        // from_str_radix would accept a leading '+'
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let value = u32::from_str_radix(hex, 16).ok()?;
        let [b0, b1, b2, b3] = value.to_be_bytes();
        match hex.len() {
            6 => Some(Self::rgb(b1, b2, b3)),
            8 => Some(Self::rgba(b0, b1, b2, b3)),
            _ => None,
        }
    }

    /// `#RRGGBBAA` form, suitable for round-tripping through [`Color::from_hex`]
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    #[must_use]
    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<Color> for Rgba<u8> {
    fn from(color: Color) -> Self {
        color.to_rgba()
    }
}

impl FromStr for Color {
    type Err = crate::error::BgRemovalError;

    /// Strict parsing for configuration files and CLI arguments
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s).ok_or_else(|| {
            crate::error::BgRemovalError::invalid_config(format!(
                "Invalid color '{}': expected RRGGBB or RRGGBBAA",
                s
            ))
        })
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Resolve an optional caller-supplied color, falling back to opaque white
#[must_use]
pub fn parse_color(hex: Option<&str>) -> Color {
    match hex {
        Some(raw) => Color::from_hex(raw).unwrap_or_else(|| {
            tracing::debug!(color = %raw, "Unparseable background color, using default");
            Color::DEFAULT
        }),
        None => Color::DEFAULT,
    }
}
