//! Waymark Paint
//!
//! Path utilities used by map overlays: a fluent [`PathBuilder`], flattening
//! of curves into line segments (lyon), and [`PathMeasure`] for arc-length
//! sampling along a path.
//!
//! # Example
//!
//! ```
//! use waymark_paint::{PathBuilder, PathMeasure};
//!
//! let road = PathBuilder::new()
//!     .move_to(0.0, 0.0)
//!     .line_to(30.0, 40.0)
//!     .build();
//!
//! let measure = PathMeasure::new(&road);
//! assert!((measure.length() - 50.0).abs() < 1e-3);
//!
//! let mid = measure.sample(25.0).unwrap();
//! assert!((mid.position.x - 15.0).abs() < 1e-3);
//! ```

pub mod flatten;
pub mod measure;
pub mod path;

// ─────────────────────────────────────────────────────────────────────────────
// Core type re-exports from waymark_core (unified type system)
// ─────────────────────────────────────────────────────────────────────────────

pub use waymark_core::{Color, Path, PathCommand, Point, Vec2};

// ─────────────────────────────────────────────────────────────────────────────
// waymark_paint specific exports
// ─────────────────────────────────────────────────────────────────────────────

pub use flatten::{flatten, LineSegment, DEFAULT_TOLERANCE};
pub use measure::{PathMeasure, PathSample, DEGENERATE_LENGTH};
pub use path::PathBuilder;
