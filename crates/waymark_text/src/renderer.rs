//! Label renderer
//!
//! Turns laid-out labels into draw calls. Each glyph of a path label is drawn
//! in its own rotated frame: the renderer pushes a translate+rotate transform,
//! draws the shadow pass (when the style has one) and the fill pass at the
//! glyph's local baseline origin, then pops the transform.

use waymark_core::{DrawContext, Path, Point, Transform};

use crate::font::GlyphMetrics;
use crate::layout::{layout_along_path, PathLabelOptions, PathLayout};
use crate::style::LabelStyle;

/// Draws map labels through a [`DrawContext`] using a set of glyph metrics
#[derive(Debug, Clone)]
pub struct CurvedLabelRenderer<M> {
    metrics: M,
}

impl<M: GlyphMetrics> CurvedLabelRenderer<M> {
    pub fn new(metrics: M) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Lay out `text` along `path` without drawing it
    pub fn layout(
        &self,
        text: &str,
        path: &Path,
        style: &LabelStyle,
        options: &PathLabelOptions,
    ) -> Option<PathLayout> {
        layout_along_path(text, path, &self.metrics, style, options)
    }

    /// Draw `text` following `path`
    ///
    /// Returns `false`, having issued no draw calls, when the path has no
    /// length.
    pub fn draw_along_path<C: DrawContext + ?Sized>(
        &self,
        ctx: &mut C,
        text: &str,
        path: &Path,
        style: &LabelStyle,
        options: &PathLabelOptions,
    ) -> bool {
        match self.layout(text, path, style, options) {
            Some(layout) => {
                self.draw_layout(ctx, &layout, style);
                true
            }
            None => false,
        }
    }

    /// Draw a label that has already been laid out
    pub fn draw_layout<C: DrawContext + ?Sized>(
        &self,
        ctx: &mut C,
        layout: &PathLayout,
        style: &LabelStyle,
    ) {
        let text_style = style.text_style();
        let mut buf = [0u8; 4];

        for glyph in &layout.glyphs {
            let glyph_str = glyph.ch.encode_utf8(&mut buf);
            let origin = glyph.local_origin();

            ctx.push_transform(Transform::translate_rotate(glyph.position, glyph.angle));
            if let Some(shadow) = style.shadow {
                ctx.draw_text_shadow(glyph_str, origin, &text_style, shadow);
            }
            ctx.draw_text(glyph_str, origin, &text_style);
            ctx.pop_transform();
        }

        tracing::trace!(
            glyphs = layout.glyphs.len(),
            reversed = layout.reversed,
            "drew path label"
        );
    }

    /// Baseline origin that centres `text` on `point`
    ///
    /// Horizontally the advance is centred; vertically the box between the
    /// font's ascender and descender is.
    pub fn centered_origin(&self, text: &str, point: Point, style: &LabelStyle) -> Point {
        let width = self
            .metrics
            .measure(text, style.font_size, style.letter_spacing);
        let ascender = self.metrics.ascender(style.font_size);
        let descender = self.metrics.descender(style.font_size);
        Point::new(
            point.x - width / 2.0,
            point.y + (ascender + descender) / 2.0,
        )
    }

    /// Draw `text` centred on `point`, ignoring any path
    pub fn draw_centered_on_point<C: DrawContext + ?Sized>(
        &self,
        ctx: &mut C,
        text: &str,
        point: Point,
        style: &LabelStyle,
    ) {
        if text.is_empty() {
            return;
        }

        let origin = self.centered_origin(text, point, style);
        let text_style = style
            .text_style()
            .with_letter_spacing(style.letter_spacing);
        if let Some(shadow) = style.shadow {
            ctx.draw_text_shadow(text, origin, &text_style, shadow);
        }
        ctx.draw_text(text, origin, &text_style);
    }
}

impl Default for CurvedLabelRenderer<crate::font::FixedMetrics> {
    fn default() -> Self {
        Self::new(crate::font::FixedMetrics::default())
    }
}
