//! Style registry: how each inline style should look.
//!
//! The editing core treats styles as opaque tokens; only renderers look
//! attributes up here. The table is static.

use markflow_model::{InlineStyle, StyleSet};
use serde::{Deserialize, Serialize};

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const ACCENT_RED: Color = Color::rgb(0xee, 0x10, 0x10);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
}

/// Rendering attributes of a style, or of a set of styles combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StyleAttributes {
    /// `None` leaves the renderer's default color
    pub color: Option<Color>,
    pub font_weight: FontWeight,
    pub text_decoration: TextDecoration,
}

impl StyleAttributes {
    /// Attributes of a single style.
    pub fn of(style: InlineStyle) -> Self {
        match style {
            InlineStyle::Underline => Self {
                color: Some(Color::BLACK),
                font_weight: FontWeight::Normal,
                text_decoration: TextDecoration::Underline,
            },
            InlineStyle::Red => Self {
                color: Some(Color::ACCENT_RED),
                font_weight: FontWeight::Normal,
                text_decoration: TextDecoration::None,
            },
            InlineStyle::Bold => Self {
                color: Some(Color::BLACK),
                font_weight: FontWeight::Bold,
                text_decoration: TextDecoration::None,
            },
        }
    }

    /// Layers the attributes of every style in `styles`.
    ///
    /// Styles are applied in `InlineStyle` order; a later color replaces an
    /// earlier one, weight and decoration accumulate.
    pub fn resolve(styles: &StyleSet) -> Self {
        styles.iter().fold(Self::default(), |acc, style| {
            let next = Self::of(*style);
            Self {
                color: next.color.or(acc.color),
                font_weight: acc.font_weight.max(next.font_weight),
                text_decoration: acc.text_decoration.max(next.text_decoration),
            }
        })
    }

    /// Returns true if this is the renderer's default look.
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}
