//! Type colours and the channel blend used to derive gradient shades.

use crate::error::CatalogError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Fraction used to derive a record's secondary colour from its primary one.
pub const SECONDARY_DARKEN: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const fn rgb(hex: u32) -> Rgb {
    Rgb {
        r: (hex >> 16) as u8,
        g: (hex >> 8) as u8,
        b: hex as u8,
    }
}

/// Fallback for type names that are not in the table.
pub const UNKNOWN_COLOR: Rgb = rgb(0x666666);

static TYPE_COLORS: [(&str, Rgb); 20] = [
    ("normal", rgb(0xA8A77A)),
    ("fire", rgb(0xFD7D24)),
    ("water", rgb(0x4592C4)),
    ("grass", rgb(0x9BCC50)),
    ("electric", rgb(0xF7D02C)),
    ("ice", rgb(0x51C4E7)),
    ("fighting", rgb(0xD56723)),
    ("poison", rgb(0xB97FC9)),
    ("ground", rgb(0xF7DE3F)),
    ("flying", rgb(0x3DC7EF)),
    ("psychic", rgb(0xF366B9)),
    ("bug", rgb(0x729F3F)),
    ("rock", rgb(0xA38C21)),
    ("ghost", rgb(0x7B62A3)),
    ("dragon", rgb(0x53A4CF)),
    ("steel", rgb(0x9EB7B8)),
    ("fairy", rgb(0xFDB9EA)),
    ("dark", rgb(0x707070)),
    ("unknown", UNKNOWN_COLOR),
    ("shadow", rgb(0x403246)),
];

/// Looks up the display colour for a type name, case-insensitively.
pub fn resolve_color(type_name: &str) -> Rgb {
    let key = type_name.to_lowercase();
    TYPE_COLORS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, color)| *color)
        .unwrap_or(UNKNOWN_COLOR)
}

pub fn type_names() -> impl Iterator<Item = &'static str> {
    TYPE_COLORS.iter().map(|(name, _)| *name)
}

// Math.round semantics: halves go up, including for negatives.
fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

fn blend(channel: u8, target: u8, percent: f64) -> u8 {
    let c = f64::from(channel);
    let t = f64::from(target);
    round_half_up(c + (t - c) * percent).clamp(0.0, 255.0) as u8
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Moves every channel `percent` of the way towards `target`.
    pub fn blend_toward(self, target: Rgb, percent: f64) -> Rgb {
        Rgb {
            r: blend(self.r, target.r, percent),
            g: blend(self.g, target.g, percent),
            b: blend(self.b, target.b, percent),
        }
    }

    pub fn darken(self, percent: f64) -> Rgb {
        self.blend_toward(Rgb::new(0, 0, 0), percent)
    }

    pub fn lighten(self, percent: f64) -> Rgb {
        self.blend_toward(Rgb::new(255, 255, 255), percent)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = CatalogError;

    /// Accepts `#RRGGBB`, `RRGGBB` and the three digit `#RGB` shorthand.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CatalogError::Parse(format!("invalid hex colour: {:?}", s)));
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(CatalogError::Parse(format!("invalid hex colour: {:?}", s))),
        };
        let value = u32::from_str_radix(&expanded, 16)
            .map_err(|_| CatalogError::Parse(format!("invalid hex colour: {:?}", s)))?;
        Ok(rgb(value))
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Darkens a hex colour string, returning the result as `#RRGGBB`.
pub fn darken(color: &str, percent: f64) -> Result<String, CatalogError> {
    Ok(color.parse::<Rgb>()?.darken(percent).to_string())
}

pub fn lighten(color: &str, percent: f64) -> Result<String, CatalogError> {
    Ok(color.parse::<Rgb>()?.lighten(percent).to_string())
}

/// The two stops of a card gradient: the colour and its darkened shade.
pub fn gradient(color: Rgb) -> [Rgb; 2] {
    [color, color.darken(SECONDARY_DARKEN)]
}
