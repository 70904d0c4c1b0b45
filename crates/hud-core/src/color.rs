//! Background colors: per-project palette and the attention alert.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{DomainError, DomainResult};

/// 24-bit RGB color, serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` or `rrggbb` (case-insensitive).
    pub fn from_hex(value: &str) -> DomainResult<Self> {
        let invalid = || DomainError::InvalidFieldValue {
            field: "color".to_string(),
            value: value.to_string(),
            expected: "#rrggbb".to_string(),
        };

        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(invalid)
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Formats as lowercase `#rrggbb`.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Rgb {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_hex()
    }
}

/// Number of project color slots.
pub const PALETTE_SIZE: usize = 6;

/// Dark, distinguishable backgrounds, one per palette slot.
pub const PROJECT_PALETTE: [Rgb; PALETTE_SIZE] = [
    Rgb::new(0x1e, 0x3a, 0x5f), // navy
    Rgb::new(0x4a, 0x19, 0x42), // plum
    Rgb::new(0x0d, 0x4f, 0x4f), // teal
    Rgb::new(0x5c, 0x3d, 0x2e), // brown
    Rgb::new(0x2d, 0x4a, 0x3e), // forest
    Rgb::new(0x4a, 0x3f, 0x5c), // slate
];

/// Background shown while a session is waiting for input.
pub const ALERT_BACKGROUND: Rgb = Rgb::new(0x88, 0x1f, 0x1f);

/// Palette color for a slot index. Out-of-range indices wrap.
#[must_use]
pub fn palette_color(index: usize) -> Rgb {
    PROJECT_PALETTE
        .get(index % PALETTE_SIZE)
        .copied()
        .unwrap_or(ALERT_BACKGROUND)
}
