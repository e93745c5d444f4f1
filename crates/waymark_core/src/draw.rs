//! Draw Context
//!
//! The `DrawContext` trait is the seam between Waymark's label layout and
//! whatever actually produces pixels. Renderers only ever talk to a
//! `&mut impl DrawContext`; a platform backend implements it natively, and
//! [`RecordingContext`] records the calls for deferred execution and for tests.
//!
//! # Example
//!
//! ```
//! use waymark_core::{Color, DrawContext, Point, RecordingContext, TextStyle, Transform};
//!
//! let mut ctx = RecordingContext::new();
//! ctx.push_transform(Transform::translate(10.0, 20.0));
//! ctx.draw_text("Hello", Point::new(0.0, 0.0), &TextStyle::new(12.0).with_color(Color::BLACK));
//! ctx.pop_transform();
//!
//! assert_eq!(ctx.commands().len(), 3);
//! assert_eq!(ctx.drawing_count(), 1);
//! ```

use crate::geometry::{Affine2D, Color, Point, Shadow, Vec2};

// ─────────────────────────────────────────────────────────────────────────────
// Transform Types
// ─────────────────────────────────────────────────────────────────────────────

/// A 2D transform pushed onto a draw context
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform(pub Affine2D);

impl Transform {
    /// Create a 2D translation
    pub fn translate(x: f32, y: f32) -> Self {
        Self(Affine2D::translation(x, y))
    }

    /// Translate to `origin`, then rotate by `angle` around it
    ///
    /// This is the frame a glyph placed on a path is drawn in.
    pub fn translate_rotate(origin: Point, angle: f32) -> Self {
        Self(Affine2D::translation(origin.x, origin.y).then(&Affine2D::rotation(angle)))
    }

    /// Create identity transform
    pub fn identity() -> Self {
        Self(Affine2D::IDENTITY)
    }

    /// Compose: the result applies `other` first, then `self`
    pub fn then(&self, other: &Transform) -> Transform {
        Transform(self.0.then(&other.0))
    }

    pub fn transform_point(&self, point: Point) -> Point {
        self.0.transform_point(point)
    }

    pub fn as_affine(&self) -> &Affine2D {
        &self.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Text Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Text style configuration
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    /// Font family name
    pub family: String,
    /// Font size in pixels
    pub size: f32,
    /// Text color
    pub color: Color,
    /// Letter spacing adjustment
    pub letter_spacing: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            family: "system-ui".to_string(),
            size: 14.0,
            color: Color::BLACK,
            letter_spacing: 0.0,
        }
    }
}

impl TextStyle {
    /// Create a new text style with font size
    pub fn new(size: f32) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    pub fn with_letter_spacing(mut self, spacing: f32) -> Self {
        self.letter_spacing = spacing;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Path Types
// ─────────────────────────────────────────────────────────────────────────────

/// Path command for building vector paths
#[derive(Clone, Debug, PartialEq)]
pub enum PathCommand {
    /// Move to a point
    MoveTo(Point),
    /// Line to a point
    LineTo(Point),
    /// Quadratic Bézier curve
    QuadTo { control: Point, end: Point },
    /// Cubic Bézier curve
    CubicTo {
        control1: Point,
        control2: Point,
        end: Point,
    },
    /// Arc to a point
    ArcTo {
        radii: Vec2,
        rotation: f32,
        large_arc: bool,
        sweep: bool,
        end: Point,
    },
    /// Close the current subpath
    Close,
}

/// A vector path
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    commands: Vec<PathCommand>,
}

impl Path {
    /// Create a new empty path
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn move_to(mut self, x: f32, y: f32) -> Self {
        self.commands.push(PathCommand::MoveTo(Point::new(x, y)));
        self
    }

    pub fn line_to(mut self, x: f32, y: f32) -> Self {
        self.commands.push(PathCommand::LineTo(Point::new(x, y)));
        self
    }

    pub fn quad_to(mut self, cx: f32, cy: f32, x: f32, y: f32) -> Self {
        self.commands.push(PathCommand::QuadTo {
            control: Point::new(cx, cy),
            end: Point::new(x, y),
        });
        self
    }

    pub fn cubic_to(mut self, cx1: f32, cy1: f32, cx2: f32, cy2: f32, x: f32, y: f32) -> Self {
        self.commands.push(PathCommand::CubicTo {
            control1: Point::new(cx1, cy1),
            control2: Point::new(cx2, cy2),
            end: Point::new(x, y),
        });
        self
    }

    pub fn close(mut self) -> Self {
        self.commands.push(PathCommand::Close);
        self
    }

    /// SVG Arc to a point
    ///
    /// - `radii`: The x and y radii of the ellipse
    /// - `rotation`: Rotation angle of the ellipse in radians
    /// - `large_arc`: If true, use the larger arc (> 180 degrees)
    /// - `sweep`: If true, draw clockwise; if false, counter-clockwise
    /// - `x`, `y`: End point of the arc
    pub fn arc_to(
        mut self,
        radii: Vec2,
        rotation: f32,
        large_arc: bool,
        sweep: bool,
        x: f32,
        y: f32,
    ) -> Self {
        self.commands.push(PathCommand::ArcTo {
            radii,
            rotation,
            large_arc,
            sweep,
            end: Point::new(x, y),
        });
        self
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DrawContext Trait
// ─────────────────────────────────────────────────────────────────────────────

/// The drawing surface seen by map overlays
pub trait DrawContext {
    // ─────────────────────────────────────────────────────────────────────────
    // Transform Stack
    // ─────────────────────────────────────────────────────────────────────────

    /// Push a transform onto the stack (composed with the current one)
    fn push_transform(&mut self, transform: Transform);

    /// Pop the top transform from the stack
    fn pop_transform(&mut self);

    /// Get the current combined transform
    fn current_transform(&self) -> Transform;

    // ─────────────────────────────────────────────────────────────────────────
    // Text
    // ─────────────────────────────────────────────────────────────────────────

    /// Draw text with its baseline origin at `origin`
    fn draw_text(&mut self, text: &str, origin: Point, style: &TextStyle);

    /// Draw text with a blurred shadow behind it
    ///
    /// Contexts without blur support draw the shadow as plain text in the
    /// shadow color, offset by the shadow offset.
    fn draw_text_shadow(&mut self, text: &str, origin: Point, style: &TextStyle, shadow: Shadow) {
        let shadow_style = TextStyle {
            color: shadow.color,
            ..style.clone()
        };
        self.draw_text(text, origin.offset(shadow.offset()), &shadow_style);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recording Draw Context
// ─────────────────────────────────────────────────────────────────────────────

/// A draw command that can be recorded and replayed
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    PushTransform(Transform),
    PopTransform,
    DrawText {
        text: String,
        origin: Point,
        style: TextStyle,
    },
    DrawTextShadow {
        text: String,
        origin: Point,
        style: TextStyle,
        shadow: Shadow,
    },
}

impl DrawCommand {
    /// True for commands that put pixels on the surface
    pub fn is_drawing(&self) -> bool {
        !matches!(self, DrawCommand::PushTransform(_) | DrawCommand::PopTransform)
    }
}

/// A draw context that records commands for later execution
#[derive(Debug)]
pub struct RecordingContext {
    commands: Vec<DrawCommand>,
    transform_stack: Vec<Transform>,
}

impl RecordingContext {
    /// Create a new recording context
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            transform_stack: vec![Transform::identity()],
        }
    }

    /// Get the recorded commands
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of recorded commands that draw something
    pub fn drawing_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_drawing()).count()
    }
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawContext for RecordingContext {
    fn push_transform(&mut self, transform: Transform) {
        self.commands.push(DrawCommand::PushTransform(transform));
        let combined = self.current_transform().then(&transform);
        self.transform_stack.push(combined);
    }

    fn pop_transform(&mut self) {
        self.commands.push(DrawCommand::PopTransform);
        if self.transform_stack.len() > 1 {
            self.transform_stack.pop();
        } else {
            tracing::trace!("pop_transform past the root transform ignored");
        }
    }

    fn current_transform(&self) -> Transform {
        self.transform_stack.last().copied().unwrap_or_default()
    }

    fn draw_text(&mut self, text: &str, origin: Point, style: &TextStyle) {
        self.commands.push(DrawCommand::DrawText {
            text: text.to_string(),
            origin,
            style: style.clone(),
        });
    }

    fn draw_text_shadow(&mut self, text: &str, origin: Point, style: &TextStyle, shadow: Shadow) {
        self.commands.push(DrawCommand::DrawTextShadow {
            text: text.to_string(),
            origin,
            style: style.clone(),
            shadow,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_context() {
        let mut ctx = RecordingContext::new();

        ctx.push_transform(Transform::translate(10.0, 20.0));
        ctx.draw_text("Hello", Point::new(10.0, 30.0), &TextStyle::default());
        ctx.draw_text_shadow(
            "Hello",
            Point::new(10.0, 30.0),
            &TextStyle::default(),
            Shadow::halo(Color::WHITE, 2.0),
        );
        ctx.pop_transform();

        assert_eq!(ctx.commands().len(), 4);
        assert_eq!(ctx.drawing_count(), 2);
    }

    #[test]
    fn test_path_builder() {
        let path = Path::new()
            .move_to(0.0, 0.0)
            .line_to(100.0, 0.0)
            .quad_to(150.0, 50.0, 100.0, 100.0)
            .close();

        assert_eq!(path.commands().len(), 4);
        assert_eq!(path.commands()[0], PathCommand::MoveTo(Point::new(0.0, 0.0)));
        assert_eq!(path.commands()[3], PathCommand::Close);
    }

    #[test]
    fn test_transform_stack_composes() {
        let mut ctx = RecordingContext::new();

        ctx.push_transform(Transform::translate(10.0, 20.0));
        let quarter = std::f32::consts::FRAC_PI_2;
        ctx.push_transform(Transform::translate_rotate(Point::new(5.0, 0.0), quarter));
        let p = ctx.current_transform().transform_point(Point::new(1.0, 0.0));
        assert!((p.x - 15.0).abs() < 1e-5);
        assert!((p.y - 21.0).abs() < 1e-5);

        ctx.pop_transform();
        ctx.pop_transform();

        // Should not panic when popping past the root
        ctx.pop_transform();
        assert_eq!(ctx.current_transform(), Transform::identity());
    }

    #[test]
    fn test_default_text_shadow_falls_back_to_offset_text() {
        struct Plain(Vec<(Point, Color)>);
        impl DrawContext for Plain {
            fn push_transform(&mut self, _: Transform) {}
            fn pop_transform(&mut self) {}
            fn current_transform(&self) -> Transform {
                Transform::identity()
            }
            fn draw_text(&mut self, _: &str, origin: Point, style: &TextStyle) {
                self.0.push((origin, style.color));
            }
        }

        let mut ctx = Plain(Vec::new());
        let shadow = Shadow::new(1.0, 2.0, 0.0, Color::WHITE);
        ctx.draw_text_shadow("x", Point::new(5.0, 5.0), &TextStyle::default(), shadow);
        assert_eq!(ctx.0, vec![(Point::new(6.0, 7.0), Color::WHITE)]);
    }
}
