//! Booth look settings: filter, colors, caption.
//!
//! Both booths of a pair keep their own copy; every change is mirrored to
//! the peer as a key/value message.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::layout::LayoutKind;
use crate::ModelError;

/// An opaque RGB color, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const INK: Color = Color::rgb(0x11, 0x11, 0x11);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Relative luminance in `[0.0, 1.0]` (sRGB, Rec. 709 weights).
    pub fn luminance(&self) -> f64 {
        fn channel(c: u8) -> f64 {
            let c = c as f64 / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * channel(self.r) + 0.7152 * channel(self.g) + 0.0722 * channel(self.b)
    }

    /// WCAG contrast ratio between two colors, from 1.0 to 21.0.
    pub fn contrast_ratio(&self, other: &Color) -> f64 {
        let (a, b) = (self.luminance() + 0.05, other.luminance() + 0.05);
        a.max(b) / a.min(b)
    }

    /// Whether white text reads better on this color than dark ink does.
    pub fn is_dark(&self) -> bool {
        self.contrast_ratio(&Color::WHITE) > self.contrast_ratio(&Color::INK)
    }

    /// Text color that stays readable on top of this color.
    pub fn contrasting_text(&self) -> Color {
        if self.is_dark() {
            Color::WHITE
        } else {
            Color::INK
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidColor {
            value: s.to_string(),
        };
        let hex = s
            .trim()
            .strip_prefix('#')
            .filter(|hex| hex.is_ascii())
            .ok_or_else(invalid)?;
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(invalid()),
        };
        let byte = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| invalid());
        Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Photo filter applied to both squares of a shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    None,
    Grayscale,
    Sepia,
    Contrast,
    Bright,
    Invert,
    Vintage,
}

impl Filter {
    pub const ALL: [Filter; 7] = [
        Filter::None,
        Filter::Grayscale,
        Filter::Sepia,
        Filter::Contrast,
        Filter::Bright,
        Filter::Invert,
        Filter::Vintage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::None => "none",
            Filter::Grayscale => "grayscale",
            Filter::Sepia => "sepia",
            Filter::Contrast => "contrast",
            Filter::Bright => "bright",
            Filter::Invert => "invert",
            Filter::Vintage => "vintage",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        // CSS-style values such as `grayscale(100%)` map onto their family.
        let family = name.split('(').next().unwrap_or_default();
        match family {
            "" | "none" => Ok(Filter::None),
            "grayscale" | "greyscale" => Ok(Filter::Grayscale),
            "sepia" => Ok(Filter::Sepia),
            "contrast" => Ok(Filter::Contrast),
            "bright" | "brightness" => Ok(Filter::Bright),
            "invert" => Ok(Filter::Invert),
            "vintage" => Ok(Filter::Vintage),
            _ => Err(ModelError::UnknownValue {
                kind: "filter",
                value: s.to_string(),
            }),
        }
    }
}

/// Keys that can be synchronized between booths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKey {
    Layout,
    Filter,
    Paper,
    Border,
    Caption,
}

impl SettingKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::Layout => "layout",
            SettingKey::Filter => "filter",
            SettingKey::Paper => "paper",
            SettingKey::Border => "border",
            SettingKey::Caption => "caption",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "layout" => Ok(SettingKey::Layout),
            "filter" => Ok(SettingKey::Filter),
            "paper" | "color" => Ok(SettingKey::Paper),
            "border" => Ok(SettingKey::Border),
            "caption" => Ok(SettingKey::Caption),
            _ => Err(ModelError::UnknownValue {
                kind: "setting",
                value: s.to_string(),
            }),
        }
    }
}

/// The current look of a booth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoothSettings {
    pub layout: LayoutKind,
    pub filter: Filter,
    pub paper: Color,
    pub border: Color,
    pub border_width: u32,
    /// User caption; `None` means the default timestamped label.
    pub caption: Option<String>,
}

impl Default for BoothSettings {
    fn default() -> Self {
        Self {
            layout: LayoutKind::ThreeRow,
            filter: Filter::None,
            paper: Color::WHITE,
            border: Color::WHITE,
            border_width: 4,
            caption: None,
        }
    }
}

impl BoothSettings {
    /// Apply one key/value pair. Returns `true` when the value changed.
    ///
    /// An empty caption clears it back to the default label.
    pub fn apply(&mut self, key: SettingKey, value: &str) -> Result<bool, ModelError> {
        let changed = match key {
            SettingKey::Layout => replace(&mut self.layout, value.parse()?),
            SettingKey::Filter => replace(&mut self.filter, value.parse()?),
            SettingKey::Paper => replace(&mut self.paper, value.parse()?),
            SettingKey::Border => replace(&mut self.border, value.parse()?),
            SettingKey::Caption => {
                let caption = Some(value.trim().to_string()).filter(|c| !c.is_empty());
                replace(&mut self.caption, caption)
            }
        };
        Ok(changed)
    }

    /// Textual value of a key, in the form `apply` accepts.
    pub fn value_of(&self, key: SettingKey) -> String {
        match key {
            SettingKey::Layout => self.layout.to_string(),
            SettingKey::Filter => self.filter.to_string(),
            SettingKey::Paper => self.paper.to_hex(),
            SettingKey::Border => self.border.to_hex(),
            SettingKey::Caption => self.caption.clone().unwrap_or_default(),
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
