//! `waymark label`: lay out a label along a polyline and report its glyphs.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use waymark_core::{Point, RecordingContext};
use waymark_paint::PathBuilder;
use waymark_text::{
    CurvedLabelRenderer, FixedMetrics, FontFace, GlyphMetrics, LabelStyle, PathLabelOptions,
};

/// Parse `"x,y x,y ..."` into at least two points
pub fn parse_points(s: &str) -> Result<Vec<Point>> {
    let points = s
        .split_whitespace()
        .map(|pair| -> Result<Point> {
            let (x, y) = pair
                .split_once(',')
                .with_context(|| format!("Expected x,y but got '{}'", pair))?;
            let x: f32 = x.trim().parse().with_context(|| format!("Invalid x in '{}'", pair))?;
            let y: f32 = y.trim().parse().with_context(|| format!("Invalid y in '{}'", pair))?;
            Ok(Point::new(x, y))
        })
        .collect::<Result<Vec<_>>>()?;

    if points.len() < 2 {
        anyhow::bail!("A label path needs at least two points, got {}", points.len());
    }
    Ok(points)
}

/// Lay out and draw `text` along `points`, printing one JSON line per glyph
pub fn run<W: Write>(
    text: &str,
    points: &[Point],
    style: &LabelStyle,
    options: &PathLabelOptions,
    font: Option<&Path>,
    out: &mut W,
) -> Result<()> {
    let face = font
        .map(|path| {
            FontFace::from_file(path).with_context(|| format!("Failed to load {}", path.display()))
        })
        .transpose()?;
    let fallback = FixedMetrics::default();
    let metrics: &dyn GlyphMetrics = match &face {
        Some(face) => {
            tracing::info!("Using font {}", face.family_name());
            face
        }
        None => &fallback,
    };

    let renderer = CurvedLabelRenderer::new(metrics);
    let path = points.iter().copied().collect::<PathBuilder>().build();

    let Some(layout) = renderer.layout(text, &path, style, options) else {
        anyhow::bail!("The label path has no length");
    };
    if layout.overflows() {
        tracing::warn!(
            "Label is {:.1}px long but the path is only {:.1}px",
            layout.text_length,
            layout.path_length
        );
    }

    for glyph in &layout.glyphs {
        let line = serde_json::json!({
            "char": glyph.ch.to_string(),
            "arc_length": glyph.arc_length,
            "x": glyph.position.x,
            "y": glyph.position.y,
            "angle_deg": glyph.angle.to_degrees(),
        });
        writeln!(out, "{}", line)?;
    }

    let mut ctx = RecordingContext::new();
    renderer.draw_layout(&mut ctx, &layout, style);
    tracing::info!(
        glyphs = layout.len(),
        draw_calls = ctx.drawing_count(),
        reversed = layout.reversed,
        "Laid out label"
    );
    Ok(())
}
