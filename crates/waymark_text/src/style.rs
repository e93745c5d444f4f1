//! Label styling and its serialized configuration.

use serde::{Deserialize, Serialize};
use waymark_core::{Color, Shadow, TextStyle};

use crate::layout::{LabelAnchor, PathLabelOptions};
use crate::{Result, TextError};

/// How a label is painted
#[derive(Clone, Debug, PartialEq)]
pub struct LabelStyle {
    /// Font size in pixels
    pub font_size: f32,
    pub fill: Color,
    /// Drawn under each glyph before the fill
    pub shadow: Option<Shadow>,
    /// Extra space between glyphs
    pub letter_spacing: f32,
    pub family: String,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            fill: Color::BLACK,
            shadow: None,
            letter_spacing: 0.0,
            family: "system-ui".to_string(),
        }
    }
}

impl LabelStyle {
    pub fn new(font_size: f32) -> Self {
        Self {
            font_size,
            ..Default::default()
        }
    }

    pub fn with_fill(mut self, fill: Color) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_shadow(mut self, shadow: Shadow) -> Self {
        self.shadow = Some(shadow);
        self
    }

    pub fn with_letter_spacing(mut self, spacing: f32) -> Self {
        self.letter_spacing = spacing;
        self
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    /// The text style handed to a draw context for the fill pass
    pub fn text_style(&self) -> TextStyle {
        TextStyle::new(self.font_size)
            .with_color(self.fill)
            .with_family(self.family.clone())
    }
}

/// Label settings as they appear in a config file
///
/// Colours are `#rrggbb` or `#rrggbbaa` strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub font_size: f32,
    pub fill: String,
    /// Halo colour; no shadow when unset
    pub shadow: Option<String>,
    pub shadow_blur: f32,
    pub letter_spacing: f32,
    /// Perpendicular distance from the path to the baseline
    pub offset: f32,
    pub anchor: LabelAnchor,
    pub upright: bool,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self::road()
    }
}

impl LabelConfig {
    /// Street names: dark text on a white halo, centred and kept upright
    pub fn road() -> Self {
        Self {
            font_size: 12.0,
            fill: "#202020".to_string(),
            shadow: Some("#ffffffcc".to_string()),
            shadow_blur: 2.0,
            letter_spacing: 0.0,
            offset: 0.0,
            anchor: LabelAnchor::Center,
            upright: true,
        }
    }

    /// Water features: letter-spaced blue text without a halo
    pub fn waterway() -> Self {
        Self {
            font_size: 11.0,
            fill: "#2a5db0".to_string(),
            shadow: None,
            shadow_blur: 0.0,
            letter_spacing: 1.5,
            offset: 0.0,
            anchor: LabelAnchor::Center,
            upright: true,
        }
    }

    /// Plain text from the start of the path, as drawn
    pub fn plain() -> Self {
        Self {
            font_size: 12.0,
            fill: "#000000".to_string(),
            shadow: None,
            shadow_blur: 0.0,
            letter_spacing: 0.0,
            offset: 0.0,
            anchor: LabelAnchor::Start,
            upright: false,
        }
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_anchor(mut self, anchor: LabelAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Resolve colours into a [`LabelStyle`]
    pub fn style(&self) -> Result<LabelStyle> {
        let fill = parse_color(&self.fill)?;
        let mut style = LabelStyle::new(self.font_size)
            .with_fill(fill)
            .with_letter_spacing(self.letter_spacing);
        if let Some(shadow) = &self.shadow {
            style = style.with_shadow(Shadow::halo(parse_color(shadow)?, self.shadow_blur));
        }
        Ok(style)
    }

    pub fn options(&self) -> PathLabelOptions {
        PathLabelOptions::default()
            .with_offset(self.offset)
            .with_anchor(self.anchor)
            .upright(self.upright)
    }
}

fn parse_color(s: &str) -> Result<Color> {
    Color::from_hex_str(s).ok_or_else(|| TextError::InvalidColor(s.to_string()))
}
