//! Curved label layout
//!
//! Places one glyph per character at successive arc-length positions along a
//! path. Each glyph is centred on its slot: the path is sampled at the middle
//! of the glyph's advance, the glyph is rotated to the local tangent there and
//! pushed along the normal by the baseline offset.

use smallvec::SmallVec;
use waymark_core::{Path, Point};
use waymark_paint::PathMeasure;

use crate::font::GlyphMetrics;
use crate::style::LabelStyle;

/// Smallest advance a glyph may have, so arc-length positions keep increasing
/// even for zero-width characters
pub const MIN_GLYPH_ADVANCE: f32 = 0.01;

/// Where along the path the label starts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelAnchor {
    /// First glyph at the start of the path
    #[default]
    Start,
    /// Text centred on the midpoint of the path
    Center,
}

/// Placement options for a path label
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathLabelOptions {
    /// Perpendicular distance between the path and the text baseline
    ///
    /// Positive values move the baseline below the path for a path running
    /// left to right (screen coordinates, y down).
    pub baseline_offset: f32,
    pub anchor: LabelAnchor,
    /// Walk the path backwards when it runs right to left, so the text never
    /// reads upside down
    pub upright: bool,
}

impl Default for PathLabelOptions {
    fn default() -> Self {
        Self {
            baseline_offset: 0.0,
            anchor: LabelAnchor::Start,
            upright: false,
        }
    }
}

impl PathLabelOptions {
    pub fn with_offset(mut self, offset: f32) -> Self {
        self.baseline_offset = offset;
        self
    }

    pub fn with_anchor(mut self, anchor: LabelAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn upright(mut self, upright: bool) -> Self {
        self.upright = upright;
        self
    }
}

/// A glyph positioned on a path
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedGlyph {
    pub ch: char,
    /// Arc length at the leading edge of the glyph
    pub arc_length: f32,
    /// Advance along the path, letter spacing excluded
    pub advance: f32,
    /// Centre of the glyph on the offset baseline
    pub position: Point,
    /// Rotation in radians, matching the path tangent at `position`
    pub angle: f32,
}

impl PlacedGlyph {
    /// Baseline origin of the glyph in its own rotated frame
    ///
    /// The frame's origin is `position`; the glyph is drawn half its advance
    /// to the left so it stays centred on its slot.
    pub fn local_origin(&self) -> Point {
        Point::new(-self.advance / 2.0, 0.0)
    }
}

/// The result of laying out a label along a path
#[derive(Clone, Debug, PartialEq)]
pub struct PathLayout {
    pub glyphs: SmallVec<[PlacedGlyph; 32]>,
    /// Total advance of the text, letter spacing included
    pub text_length: f32,
    /// Arc length of the measured path
    pub path_length: f32,
    /// The path was walked end to start
    pub reversed: bool,
}

impl PathLayout {
    /// True when the text runs past the end of the path
    pub fn overflows(&self) -> bool {
        self.text_length > self.path_length
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// Lay out `text` along `path`
///
/// Returns `None` when the path has no length. Every `char` of `text` gets
/// exactly one [`PlacedGlyph`], in order, with strictly increasing arc length.
pub fn layout_along_path<M: GlyphMetrics>(
    text: &str,
    path: &Path,
    metrics: &M,
    style: &LabelStyle,
    options: &PathLabelOptions,
) -> Option<PathLayout> {
    layout_along_measure(text, &PathMeasure::new(path), metrics, style, options)
}

/// Lay out `text` along an already measured path
pub fn layout_along_measure<M: GlyphMetrics>(
    text: &str,
    measure: &PathMeasure,
    metrics: &M,
    style: &LabelStyle,
    options: &PathLabelOptions,
) -> Option<PathLayout> {
    if measure.is_degenerate() {
        tracing::trace!("skipping label on zero-length path");
        return None;
    }

    let reversed = options.upright && measure.runs_right_to_left();
    let flipped;
    let measure = if reversed {
        flipped = measure.reversed();
        &flipped
    } else {
        measure
    };

    let letter_spacing = style.letter_spacing.max(0.0);
    let advances: SmallVec<[(char, f32); 32]> = text
        .chars()
        .map(|c| (c, metrics.advance(c, style.font_size).max(MIN_GLYPH_ADVANCE)))
        .collect();
    let text_length = advances.iter().map(|(_, a)| a).sum::<f32>()
        + letter_spacing * advances.len().saturating_sub(1) as f32;
    let path_length = measure.length();

    let mut cursor = match options.anchor {
        LabelAnchor::Start => 0.0,
        LabelAnchor::Center => ((path_length - text_length) / 2.0).max(0.0),
    };

    let mut glyphs = SmallVec::with_capacity(advances.len());
    for (ch, advance) in advances {
        let sample = measure.sample(cursor + advance / 2.0)?;
        glyphs.push(PlacedGlyph {
            ch,
            arc_length: cursor,
            advance,
            position: sample.offset_position(options.baseline_offset),
            angle: sample.angle,
        });
        cursor = advance_cursor(cursor, advance + letter_spacing);
    }

    Some(PathLayout {
        glyphs,
        text_length,
        path_length,
        reversed,
    })
}

/// `cursor + step`, moved to at least the next representable value when the
/// step is lost to rounding far along a long path
fn advance_cursor(cursor: f32, step: f32) -> f32 {
    let next = cursor + step;
    if next > cursor || !cursor.is_finite() {
        next
    } else {
        f32::from_bits(cursor.to_bits() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FixedMetrics;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn style(size: f32) -> LabelStyle {
        LabelStyle::new(size)
    }

    fn straight(len: f32) -> Path {
        Path::new().move_to(0.0, 0.0).line_to(len, 0.0)
    }

    #[test]
    fn test_zero_width_glyphs_advance_far_along_long_path() {
        let options = PathLabelOptions::default().with_anchor(LabelAnchor::Center);
        let layout = layout_along_path(
            "a\u{7}\u{7}b",
            &straight(600_000.0),
            &FixedMetrics::default(),
            &style(12.0),
            &options,
        )
        .unwrap();

        assert_eq!(layout.len(), 4);
        assert!(layout.glyphs[0].arc_length > 299_000.0);
        assert!(layout
            .glyphs
            .windows(2)
            .all(|w| w[1].arc_length > w[0].arc_length));
    }

    #[test]
    fn test_one_glyph_per_char_increasing() {
        let metrics = FixedMetrics::new(0.5);
        let path = Path::new()
            .move_to(0.0, 0.0)
            .quad_to(40.0, -30.0, 80.0, 0.0)
            .line_to(80.0, 60.0);
        let text = "Main St ✓ é";
        let layout = layout_along_path(
            text,
            &path,
            &metrics,
            &style(12.0),
            &PathLabelOptions::default(),
        )
        .unwrap();

        assert_eq!(layout.len(), text.chars().count());
        assert!(layout
            .glyphs
            .windows(2)
            .all(|w| w[1].arc_length > w[0].arc_length));
        let chars: String = layout.glyphs.iter().map(|g| g.ch).collect();
        assert_eq!(chars, text);
    }

    #[test]
    fn test_zero_width_chars_still_advance() {
        let metrics = FixedMetrics::new(0.5);
        let text = "a\u{7}\u{7}b";
        let layout = layout_along_path(
            text,
            &straight(100.0),
            &metrics,
            &style(10.0),
            &PathLabelOptions::default(),
        )
        .unwrap();
        assert_eq!(layout.len(), 4);
        assert!(layout
            .glyphs
            .windows(2)
            .all(|w| w[1].arc_length > w[0].arc_length));
    }

    #[test]
    fn test_degenerate_path_has_no_layout() {
        let metrics = FixedMetrics::default();
        let point = Path::new().move_to(5.0, 5.0).line_to(5.0, 5.0);
        assert!(layout_along_path("x", &point, &metrics, &style(12.0), &Default::default()).is_none());
        assert!(layout_along_path("x", &Path::new(), &metrics, &style(12.0), &Default::default()).is_none());
    }

    #[test]
    fn test_glyphs_follow_the_tangent() {
        let metrics = FixedMetrics::new(1.0);
        let path = Path::new().move_to(0.0, 0.0).line_to(10.0, 0.0).line_to(10.0, 100.0);
        let layout =
            layout_along_path("abc", &path, &metrics, &style(10.0), &Default::default()).unwrap();

        // "a" sits on the horizontal run, "b" and "c" on the vertical one
        assert!(approx(layout.glyphs[0].angle, 0.0));
        assert!(approx(layout.glyphs[0].position.x, 5.0));
        assert!(approx(layout.glyphs[1].angle, FRAC_PI_2));
        assert!(approx(layout.glyphs[1].position.y, 5.0));
        assert!(approx(layout.glyphs[2].position.y, 15.0));
    }

    #[test]
    fn test_baseline_offset_is_perpendicular() {
        let metrics = FixedMetrics::new(1.0);
        let options = PathLabelOptions::default().with_offset(4.0);
        let layout =
            layout_along_path("a", &straight(100.0), &metrics, &style(10.0), &options).unwrap();
        assert!(approx(layout.glyphs[0].position.x, 5.0));
        assert!(approx(layout.glyphs[0].position.y, 4.0));
    }

    #[test]
    fn test_center_anchor() {
        let metrics = FixedMetrics::new(1.0);
        let options = PathLabelOptions::default().with_anchor(LabelAnchor::Center);
        let layout =
            layout_along_path("ab", &straight(100.0), &metrics, &style(10.0), &options).unwrap();
        assert!(approx(layout.glyphs[0].arc_length, 40.0));
        assert!(approx(layout.glyphs[1].arc_length, 50.0));
        assert!(!layout.overflows());
    }

    #[test]
    fn test_center_anchor_clamps_long_text() {
        let metrics = FixedMetrics::new(1.0);
        let options = PathLabelOptions::default().with_anchor(LabelAnchor::Center);
        let layout =
            layout_along_path("abcdef", &straight(20.0), &metrics, &style(10.0), &options).unwrap();
        assert_eq!(layout.glyphs[0].arc_length, 0.0);
        assert!(layout.overflows());
        assert_eq!(layout.len(), 6);
    }

    #[test]
    fn test_letter_spacing() {
        let metrics = FixedMetrics::new(1.0);
        let layout =
            layout_along_path("abc", &straight(100.0), &metrics, &style(10.0).with_letter_spacing(2.0), &Default::default())
                .unwrap();
        assert!(approx(layout.glyphs[1].arc_length, 12.0));
        assert!(approx(layout.glyphs[2].arc_length, 24.0));
        assert!(approx(layout.text_length, 34.0));
    }

    #[test]
    fn test_upright_reverses_right_to_left_paths() {
        let metrics = FixedMetrics::new(1.0);
        let path = Path::new().move_to(100.0, 0.0).line_to(0.0, 0.0);

        let plain = layout_along_path("a", &path, &metrics, &style(10.0), &Default::default()).unwrap();
        assert!(!plain.reversed);
        assert!(approx(plain.glyphs[0].angle.abs(), PI));

        let options = PathLabelOptions::default().upright(true);
        let upright = layout_along_path("a", &path, &metrics, &style(10.0), &options).unwrap();
        assert!(upright.reversed);
        assert!(approx(upright.glyphs[0].angle, 0.0));
        assert!(approx(upright.glyphs[0].position.x, 5.0));
    }

    #[test]
    fn test_empty_text_on_valid_path() {
        let metrics = FixedMetrics::default();
        let layout =
            layout_along_path("", &straight(10.0), &metrics, &style(12.0), &Default::default())
                .unwrap();
        assert!(layout.is_empty());
        assert_eq!(layout.text_length, 0.0);
    }
}
