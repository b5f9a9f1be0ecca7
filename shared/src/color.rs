use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::SessionError;

/// Number of base palette entries, one per seat.
pub const PALETTE_SIZE: usize = 8;

/// Packed `0xRRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const BLUE: Color = Color(0x2f6fde);
    pub const ORANGE: Color = Color(0xf28c28);
    pub const GREEN: Color = Color(0x3cb44b);
    pub const RED: Color = Color(0xe6194b);
    pub const PURPLE: Color = Color(0x911eb4);
    pub const YELLOW: Color = Color(0xffe119);
    pub const CYAN: Color = Color(0x42d4f4);
    pub const PINK: Color = Color(0xf032e6);

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Build from channels in [0, 1]; out-of-range values are clamped.
    pub fn from_unit(r: f64, g: f64, b: f64) -> Self {
        let q = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::from_rgb(q(r), q(g), q(b))
    }

    pub fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(self) -> u8 {
        self.0 as u8
    }

    /// Channels normalized to [0, 1].
    pub fn unit_channels(self) -> [f64; 3] {
        [
            self.r() as f64 / 255.0,
            self.g() as f64 / 255.0,
            self.b() as f64 / 255.0,
        ]
    }

    /// Euclidean distance between normalized RGB triples, in [0, sqrt(3)].
    pub fn distance(self, other: Color) -> f64 {
        let a = self.unit_channels();
        let b = other.unit_channels();
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }

    /// `#RRGGBB`
    pub fn to_hex(self) -> String {
        format!("#{:06X}", self.0 & 0xffffff)
    }

    /// Accepts `#RRGGBB` or `RRGGBB`, any case.
    pub fn parse_hex(s: &str) -> Result<Self, SessionError> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SessionError::InvalidColor(s.to_string()));
        }
        u32::from_str_radix(digits, 16)
            .map(Color)
            .map_err(|_| SessionError::InvalidColor(s.to_string()))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse_hex(s)
    }
}

/// Base palette, indexed by physical seat.
pub const DEFAULT_PALETTE: [Color; PALETTE_SIZE] = [
    Color::BLUE,
    Color::ORANGE,
    Color::GREEN,
    Color::RED,
    Color::PURPLE,
    Color::YELLOW,
    Color::CYAN,
    Color::PINK,
];
