//! Font loading and glyph metrics
//!
//! Label layout only needs horizontal advances and the vertical extent of a
//! font, so that is all [`GlyphMetrics`] asks for. [`FontFace`] reads real
//! TTF/OTF data via ttf-parser; [`FixedMetrics`] is a uniform-advance
//! approximation used when no font file is available.

use crate::{Result, TextError};
use std::sync::Arc;

/// Per-character metrics at a given font size, in pixels
pub trait GlyphMetrics {
    /// Horizontal advance of `c`
    fn advance(&self, c: char, font_size: f32) -> f32;

    /// Distance from baseline to the top of the tallest glyphs (positive)
    fn ascender(&self, font_size: f32) -> f32;

    /// Distance from baseline to the bottom of descenders (typically negative)
    fn descender(&self, font_size: f32) -> f32;

    /// Total advance of a string, including letter spacing between glyphs
    fn measure(&self, text: &str, font_size: f32, letter_spacing: f32) -> f32 {
        let mut width = 0.0;
        let mut count = 0usize;
        for c in text.chars() {
            width += self.advance(c, font_size);
            count += 1;
        }
        if count > 1 {
            width += letter_spacing * (count - 1) as f32;
        }
        width
    }
}

impl<M: GlyphMetrics + ?Sized> GlyphMetrics for &M {
    fn advance(&self, c: char, font_size: f32) -> f32 {
        (**self).advance(c, font_size)
    }

    fn ascender(&self, font_size: f32) -> f32 {
        (**self).ascender(font_size)
    }

    fn descender(&self, font_size: f32) -> f32 {
        (**self).descender(font_size)
    }
}

/// Uniform metrics expressed as fractions of the font size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedMetrics {
    /// Advance of a regular glyph
    pub advance_ratio: f32,
    /// Advance of whitespace
    pub space_ratio: f32,
    pub ascender_ratio: f32,
    pub descender_ratio: f32,
}

impl FixedMetrics {
    pub const fn new(advance_ratio: f32) -> Self {
        Self {
            advance_ratio,
            space_ratio: advance_ratio,
            ascender_ratio: 0.8,
            descender_ratio: -0.2,
        }
    }
}

impl Default for FixedMetrics {
    /// Roughly the average advance of a proportional sans-serif face
    fn default() -> Self {
        Self {
            advance_ratio: 0.6,
            space_ratio: 0.3,
            ascender_ratio: 0.8,
            descender_ratio: -0.2,
        }
    }
}

impl GlyphMetrics for FixedMetrics {
    fn advance(&self, c: char, font_size: f32) -> f32 {
        if c.is_whitespace() {
            self.space_ratio * font_size
        } else if c.is_control() {
            0.0
        } else {
            self.advance_ratio * font_size
        }
    }

    fn ascender(&self, font_size: f32) -> f32 {
        self.ascender_ratio * font_size
    }

    fn descender(&self, font_size: f32) -> f32 {
        self.descender_ratio * font_size
    }
}

/// Font metrics in font units (typically 1000 or 2048 units per em)
#[derive(Debug, Clone, Copy)]
pub struct FontMetrics {
    /// Units per em (typically 1000 or 2048)
    pub units_per_em: u16,
    /// Ascender (distance from baseline to top of tallest glyph)
    pub ascender: i16,
    /// Descender (distance from baseline to bottom, typically negative)
    pub descender: i16,
}

impl FontMetrics {
    /// Scale a value from font units to pixels
    pub fn scale(&self, value: f32, font_size: f32) -> f32 {
        value * font_size / self.units_per_em as f32
    }
}

/// A parsed font face
pub struct FontFace {
    /// Raw font data (kept alive for ttf-parser)
    data: Arc<Vec<u8>>,
    /// Face index within the font file (for TTC files)
    face_index: u32,
    metrics: FontMetrics,
    family_name: String,
    /// Advance of glyph 0, used for characters the font lacks
    notdef_advance: u16,
}

impl FontFace {
    /// Load a font from raw TTF/OTF data (uses face index 0)
    pub fn from_data(data: Vec<u8>) -> Result<Self> {
        Self::from_data_with_index(data, 0)
    }

    /// Load a font from raw TTF/OTF data with a specific face index
    pub fn from_data_with_index(data: Vec<u8>, face_index: u32) -> Result<Self> {
        let data = Arc::new(data);

        let face = ttf_parser::Face::parse(&data, face_index)
            .map_err(|e| TextError::FontParseError(format!("{:?}", e)))?;

        if face.units_per_em() == 0 {
            return Err(TextError::InvalidFontData);
        }

        let metrics = FontMetrics {
            units_per_em: face.units_per_em(),
            ascender: face.ascender(),
            descender: face.descender(),
        };

        let family_name = face
            .names()
            .into_iter()
            .find(|n| n.name_id == ttf_parser::name_id::FAMILY)
            .and_then(|n| n.to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        let notdef_advance = face.glyph_hor_advance(ttf_parser::GlyphId(0)).unwrap_or(0);

        tracing::debug!(family = %family_name, face_index, "loaded font face");

        Ok(Self {
            data,
            face_index,
            metrics,
            family_name,
            notdef_advance,
        })
    }

    /// Load a font from a file path
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| TextError::FontLoadError(format!("{}: {}", path.display(), e)))?;
        Self::from_data(data)
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    fn as_ttf_face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, self.face_index).ok()
    }

    /// Horizontal advance of `c` in font units
    ///
    /// Characters without a glyph use the `.notdef` advance.
    pub fn char_advance_units(&self, c: char) -> u16 {
        let Some(face) = self.as_ttf_face() else {
            return self.notdef_advance;
        };
        face.glyph_index(c)
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(self.notdef_advance)
    }
}

impl GlyphMetrics for FontFace {
    fn advance(&self, c: char, font_size: f32) -> f32 {
        self.metrics
            .scale(self.char_advance_units(c) as f32, font_size)
    }

    fn ascender(&self, font_size: f32) -> f32 {
        self.metrics.scale(self.metrics.ascender as f32, font_size)
    }

    fn descender(&self, font_size: f32) -> f32 {
        self.metrics.scale(self.metrics.descender as f32, font_size)
    }
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("family_name", &self.family_name)
            .field("face_index", &self.face_index)
            .field("units_per_em", &self.metrics.units_per_em)
            .finish()
    }
}
