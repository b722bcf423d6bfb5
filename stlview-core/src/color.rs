//! RGB colors parsed from CSS-style strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use crate::error::ColorError;

/// An RGB color with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` value.
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::rgb(channel(16), channel(8), channel(0))
    }

    pub fn to_rgb8(self) -> [u8; 3] {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [quantize(self.r), quantize(self.g), quantize(self.b)]
    }

    /// Perceptual brightness in `0.0..=1.0`
    pub fn luminance(self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    pub fn scale(self, factor: f32) -> Self {
        Self::rgb(self.r * factor, self.g * factor, self.b * factor)
    }

    /// Component-wise product
    pub fn modulate(self, other: Color) -> Self {
        Self::rgb(self.r * other.r, self.g * other.g, self.b * other.b)
    }

    pub fn clamped(self) -> Self {
        Self::rgb(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }
}

impl Add for Color {
    type Output = Color;

    fn add(self, other: Color) -> Color {
        Color::rgb(self.r + other.r, self.g + other.g, self.b + other.b)
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ColorError(s.to_string());

        if let Some(digits) = trimmed.strip_prefix('#') {
            if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            let value = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
            return match digits.len() {
                6 => Ok(Self::from_hex(value)),
                3 => {
                    // #abc expands to #aabbcc
                    let expand = |n: u32| (n & 0xf) * 0x11;
                    let packed =
                        (expand(value >> 8) << 16) | (expand(value >> 4) << 8) | expand(value);
                    Ok(Self::from_hex(packed))
                }
                _ => Err(invalid()),
            };
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "white" => Ok(Self::WHITE),
            "black" => Ok(Self::BLACK),
            "red" => Ok(Self::from_hex(0xff0000)),
            "green" => Ok(Self::from_hex(0x008000)),
            "blue" => Ok(Self::from_hex(0x0000ff)),
            "gray" | "grey" => Ok(Self::from_hex(0x808080)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.to_rgb8();
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}
