use std::fmt;
use std::str::FromStr;

use bevy::color::{Hsla, Srgba};
use image::Rgba;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A flat RGBA8 paint color. Zone maps encode target identity by color, so
/// values are compared exactly and never blended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ZoneColor(pub [u8; 4]);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("color '{0}' must start with '#'")]
    MissingHash(String),
    #[error("color '{0}' must have 6 or 8 hex digits")]
    BadLength(String),
    #[error("color '{0}' contains a non-hex digit")]
    BadDigit(String),
}

impl ZoneColor {
    /// Reserved erase/background color. User colors are always opaque, so this
    /// can never collide with a target color.
    pub const BACKGROUND: Self = Self([0, 0, 0, 0]);
    pub const RED: Self = Self([255, 0, 0, 255]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub fn is_background(&self) -> bool {
        *self == Self::BACKGROUND
    }

    pub fn is_opaque(&self) -> bool {
        self.0[3] == 255
    }

    /// Same color with the alpha channel forced to opaque.
    pub fn opaque(self) -> Self {
        let [r, g, b, _] = self.0;
        Self([r, g, b, 255])
    }

    pub fn to_srgba(self) -> Srgba {
        let [r, g, b, a] = self.0;
        Srgba::rgba_u8(r, g, b, a)
    }

    /// Distinct opaque color for the `index`-th generated target. Hues are
    /// spaced by the golden angle so consecutive targets never look alike.
    pub fn generated(index: u32) -> Self {
        let hue = (index as f32 * 137.507_77) % 360.0;
        Srgba::from(Hsla::hsl(hue, 0.75, 0.5)).into()
    }
}

impl From<Srgba> for ZoneColor {
    fn from(color: Srgba) -> Self {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self([
            channel(color.red),
            channel(color.green),
            channel(color.blue),
            channel(color.alpha),
        ])
    }
}

impl From<ZoneColor> for Rgba<u8> {
    fn from(color: ZoneColor) -> Self {
        Rgba(color.0)
    }
}

impl From<Rgba<u8>> for ZoneColor {
    fn from(pixel: Rgba<u8>) -> Self {
        Self(pixel.0)
    }
}

/// Formats as `#RRGGBBAA`, the form stored on overlay targets.
impl fmt::Display for ZoneColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "#{r:02X}{g:02X}{b:02X}{a:02X}")
    }
}

/// Accepts `#RRGGBB` (opaque) and `#RRGGBBAA`, case-insensitive.
impl FromStr for ZoneColor {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError::MissingHash(s.to_string()))?;
        if digits.len() != 6 && digits.len() != 8 {
            return Err(ColorParseError::BadLength(s.to_string()));
        }
        if !digits.is_ascii() {
            return Err(ColorParseError::BadDigit(s.to_string()));
        }

        let mut channels = [255u8; 4];
        for (i, channel) in channels.iter_mut().enumerate().take(digits.len() / 2) {
            *channel = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
                .map_err(|_| ColorParseError::BadDigit(s.to_string()))?;
        }
        Ok(Self(channels))
    }
}

impl Serialize for ZoneColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ZoneColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
