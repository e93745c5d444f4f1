//! Waymark Core
//!
//! Foundational types shared by the Waymark map overlay crates:
//!
//! - **Geometry**: points, vectors and 2D affine transforms
//! - **Visuals**: colors and shadows
//! - **Paths**: vector paths built from lines, Béziers and arcs
//! - **Draw Context**: the trait every rendering backend implements, plus a
//!   recording implementation for deferred execution and tests
//!
//! # Example
//!
//! ```rust
//! use waymark_core::{Color, DrawCommand, DrawContext, Point, RecordingContext, Shadow, TextStyle};
//!
//! let mut ctx = RecordingContext::new();
//! let style = TextStyle::new(11.0).with_color(Color::BLACK);
//! ctx.draw_text_shadow("A1", Point::new(20.0, 40.0), &style, Shadow::halo(Color::WHITE, 2.0));
//! ctx.draw_text("A1", Point::new(20.0, 40.0), &style);
//!
//! assert!(matches!(ctx.commands()[0], DrawCommand::DrawTextShadow { .. }));
//! assert_eq!(ctx.drawing_count(), 2);
//! ```

pub mod draw;
pub mod geometry;

pub use draw::{DrawCommand, DrawContext, Path, PathCommand, RecordingContext, TextStyle, Transform};
pub use geometry::{Affine2D, Color, Point, Shadow, Vec2};
