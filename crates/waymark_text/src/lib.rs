//! Map label text for Waymark
//!
//! This crate provides:
//! - Glyph metrics (TTF/OTF via ttf-parser, or a fixed-ratio fallback)
//! - Curved label layout: one glyph per character, walked along a path by
//!   arc length and rotated to the path tangent
//! - A renderer that turns labels into [`waymark_core::DrawContext`] calls,
//!   for path labels and point-centred labels
//! - Label styles and their serde configuration
//!
//! # Example
//!
//! ```
//! use waymark_core::{Path, RecordingContext};
//! use waymark_text::{CurvedLabelRenderer, FixedMetrics, LabelStyle, PathLabelOptions};
//!
//! let renderer = CurvedLabelRenderer::new(FixedMetrics::default());
//! let mut ctx = RecordingContext::new();
//! let road = Path::new().move_to(10.0, 200.0).quad_to(128.0, 40.0, 246.0, 200.0);
//!
//! let drawn = renderer.draw_along_path(
//!     &mut ctx,
//!     "High Street",
//!     &road,
//!     &LabelStyle::new(14.0),
//!     &PathLabelOptions::default(),
//! );
//! assert!(drawn);
//! assert_eq!(ctx.drawing_count(), 11);
//! ```

pub mod font;
pub mod layout;
pub mod renderer;
pub mod style;

pub use font::{FixedMetrics, FontFace, FontMetrics, GlyphMetrics};
pub use layout::{
    layout_along_measure, layout_along_path, LabelAnchor, PathLabelOptions, PathLayout,
    PlacedGlyph, MIN_GLYPH_ADVANCE,
};
pub use renderer::CurvedLabelRenderer;
pub use style::{LabelConfig, LabelStyle};

use thiserror::Error;

/// Text errors
#[derive(Error, Debug)]
pub enum TextError {
    #[error("Failed to load font: {0}")]
    FontLoadError(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Invalid font data")]
    InvalidFontData,

    #[error("Invalid colour: {0:?}")]
    InvalidColor(String),
}

pub type Result<T> = std::result::Result<T, TextError>;
