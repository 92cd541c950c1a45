//! Brush, colour and surface-hit values for the paint minigame.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Brush diameter in texture pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct BrushSize(f64);

impl BrushSize {
    pub const SMALL: BrushSize = BrushSize(5.0);
    pub const MEDIUM: BrushSize = BrushSize(12.0);
    pub const LARGE: BrushSize = BrushSize(22.0);
    /// Starting size, between the medium and large presets.
    pub const DEFAULT: BrushSize = BrushSize(15.0);

    pub fn new(diameter: f64) -> Result<Self, DomainError> {
        if !diameter.is_finite() || diameter <= 0.0 {
            return Err(DomainError::validation(format!(
                "brush diameter must be positive, got {}",
                diameter
            )));
        }
        Ok(Self(diameter))
    }

    pub fn diameter(&self) -> f64 {
        self.0
    }

    pub fn radius(&self) -> f64 {
        self.0 / 2.0
    }

    /// Area credited for one stroke: `π·r²`.
    pub fn stroke_area(&self) -> f64 {
        std::f64::consts::PI * self.radius() * self.radius()
    }

    /// Paint units consumed per stroke.
    pub fn stroke_cost(&self) -> f64 {
        if self.0 <= 5.0 {
            0.5
        } else if self.0 <= 12.0 {
            1.0
        } else {
            2.5
        }
    }
}

impl Default for BrushSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for BrushSize {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BrushSize> for f64 {
    fn from(value: BrushSize) -> Self {
        value.0
    }
}

/// An opaque RGB paint colour, written `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaintColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PaintColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pixel value with full alpha.
    pub fn rgba(&self) -> [u8; 4] {
        [self.r, self.g, self.b, 0xff]
    }
}

/// Neon colours offered by the minigame.
pub const PALETTE: [PaintColor; 8] = [
    PaintColor::rgb(0x00, 0xff, 0x00),
    PaintColor::rgb(0xff, 0x33, 0x33),
    PaintColor::rgb(0x00, 0xff, 0xff),
    PaintColor::rgb(0xff, 0xff, 0x00),
    PaintColor::rgb(0xff, 0x00, 0xff),
    PaintColor::rgb(0xff, 0xff, 0xff),
    PaintColor::rgb(0x00, 0x00, 0x00),
    PaintColor::rgb(0xcd, 0x85, 0x3f),
];

impl Default for PaintColor {
    fn default() -> Self {
        PALETTE[0]
    }
}

impl fmt::Display for PaintColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for PaintColor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(DomainError::parse(format!("Invalid colour: {}", s)));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| DomainError::parse(format!("Invalid colour: {}", s)))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for PaintColor {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PaintColor> for String {
    fn from(value: PaintColor) -> Self {
        value.to_string()
    }
}

/// Texture coordinate of a ray hit on the paintable surface, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceHit {
    pub u: f64,
    pub v: f64,
}

impl SurfaceHit {
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }

    /// Pixel position on a `size × size` texture. UV space has `v` pointing up.
    pub fn to_pixel(&self, size: u32) -> (f64, f64) {
        let size = f64::from(size);
        (self.u * size, (1.0 - self.v) * size)
    }
}
