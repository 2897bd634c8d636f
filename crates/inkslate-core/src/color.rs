//! CSS color values used by fill and stroke styles.

use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Color parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("Invalid hex color: {0}")]
    InvalidHex(String),
    #[error("Invalid color function: {0}")]
    InvalidFunction(String),
    #[error("Unknown color name: {0}")]
    UnknownName(String),
}

/// Result type for color parsing.
pub type ColorResult<T> = Result<T, ColorError>;

/// RGBA8 color that round-trips through CSS color strings.
///
/// Serialized as `#RRGGBB` when opaque and `#RRGGBBAA` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StyleColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl StyleColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse a CSS color: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`,
    /// `rgb(r, g, b)`, `rgba(r, g, b, a)` or a basic color keyword.
    pub fn parse(input: &str) -> ColorResult<Self> {
        let s = input.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| ColorError::InvalidHex(input.to_string()));
        }
        let lower = s.to_ascii_lowercase();
        if let Some(body) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
        {
            return parse_rgb_function(body)
                .ok_or_else(|| ColorError::InvalidFunction(input.to_string()));
        }
        named(&lower).ok_or_else(|| ColorError::UnknownName(input.to_string()))
    }

    /// Format as a CSS hex string.
    pub fn to_css(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    /// Opacity in `0.0..=1.0`.
    pub fn alpha_f64(&self) -> f64 {
        f64::from(self.a) / 255.0
    }
}

fn parse_hex(hex: &str) -> Option<StyleColor> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(StyleColor::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(StyleColor::new(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(StyleColor::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(StyleColor::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

fn parse_rgb_function(body: &str) -> Option<StyleColor> {
    let body = body.strip_suffix(')')?;
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |s: &str| -> Option<u8> {
        let v: f64 = s.parse().ok()?;
        Some(v.round().clamp(0.0, 255.0) as u8)
    };
    let alpha = match parts.get(3) {
        Some(s) => {
            let v: f64 = s.parse().ok()?;
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        None => 255,
    };
    Some(StyleColor::new(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        alpha,
    ))
}

fn named(name: &str) -> Option<StyleColor> {
    let color = match name {
        "transparent" => StyleColor::transparent(),
        "black" => StyleColor::black(),
        "white" => StyleColor::white(),
        "red" => StyleColor::rgb(255, 0, 0),
        "green" => StyleColor::rgb(0, 128, 0),
        "lime" => StyleColor::rgb(0, 255, 0),
        "blue" => StyleColor::rgb(0, 0, 255),
        "yellow" => StyleColor::rgb(255, 255, 0),
        "cyan" | "aqua" => StyleColor::rgb(0, 255, 255),
        "magenta" | "fuchsia" => StyleColor::rgb(255, 0, 255),
        "gray" | "grey" => StyleColor::rgb(128, 128, 128),
        "silver" => StyleColor::rgb(192, 192, 192),
        "orange" => StyleColor::rgb(255, 165, 0),
        _ => return None,
    };
    Some(color)
}

impl FromStr for StyleColor {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StyleColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

impl TryFrom<String> for StyleColor {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StyleColor> for String {
    fn from(color: StyleColor) -> Self {
        color.to_css()
    }
}

impl From<Color> for StyleColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<StyleColor> for Color {
    fn from(color: StyleColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(StyleColor::parse("#F0F").unwrap(), StyleColor::rgb(255, 0, 255));
        assert_eq!(StyleColor::parse("#dddd").unwrap(), StyleColor::new(221, 221, 221, 221));
        assert_eq!(StyleColor::parse("#1a2b3c").unwrap(), StyleColor::rgb(0x1a, 0x2b, 0x3c));
        assert_eq!(
            StyleColor::parse("#1a2b3c80").unwrap(),
            StyleColor::new(0x1a, 0x2b, 0x3c, 0x80)
        );
        assert!(matches!(StyleColor::parse("#12"), Err(ColorError::InvalidHex(_))));
        assert!(matches!(StyleColor::parse("#ggg"), Err(ColorError::InvalidHex(_))));
    }

    #[test]
    fn test_parse_functions_and_names() {
        assert_eq!(StyleColor::parse("rgb(10, 20, 30)").unwrap(), StyleColor::rgb(10, 20, 30));
        assert_eq!(
            StyleColor::parse("RGBA(255,0,0,0.5)").unwrap(),
            StyleColor::new(255, 0, 0, 128)
        );
        assert_eq!(StyleColor::parse("Magenta").unwrap(), StyleColor::rgb(255, 0, 255));
        assert!(matches!(StyleColor::parse("rgb(1,2)"), Err(ColorError::InvalidFunction(_))));
        assert!(matches!(StyleColor::parse("chartreuse-ish"), Err(ColorError::UnknownName(_))));
    }

    #[test]
    fn test_css_output() {
        assert_eq!(StyleColor::rgb(221, 221, 221).to_css(), "#DDDDDD");
        assert_eq!(StyleColor::new(1, 2, 3, 4).to_css(), "#01020304");
        let json = serde_json::to_string(&StyleColor::parse("#F0F").unwrap()).unwrap();
        assert_eq!(json, "\"#FF00FF\"");
    }

    #[test]
    fn test_peniko_conversion() {
        let color = StyleColor::new(10, 20, 30, 40);
        let peniko: Color = color.into();
        assert_eq!(StyleColor::from(peniko), color);
    }
}
