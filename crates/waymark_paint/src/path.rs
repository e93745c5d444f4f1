//! Path building
//!
//! Core types are re-exported from waymark_core for unified type system.
//! PathBuilder provides a fluent API for path construction.

// Re-export core types
pub use waymark_core::{Path, PathCommand, Point};

/// Builder for constructing paths with fluent API
///
/// PathBuilder keeps the cursor position, so map geometry can be fed to it
/// point by point without tracking whether a subpath has been started.
pub struct PathBuilder {
    path: Path,
    current: Point,
    started: bool,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self {
            path: Path::new(),
            current: Point::ZERO,
            started: false,
        }
    }

    pub fn move_to(mut self, x: f32, y: f32) -> Self {
        self.path = self.path.move_to(x, y);
        self.current = Point::new(x, y);
        self.started = true;
        self
    }

    pub fn line_to(mut self, x: f32, y: f32) -> Self {
        self.path = self.path.line_to(x, y);
        self.current = Point::new(x, y);
        self.started = true;
        self
    }

    /// Move to the point if no subpath is open yet, otherwise line to it
    pub fn push_point(self, point: Point) -> Self {
        if self.started {
            self.line_to(point.x, point.y)
        } else {
            self.move_to(point.x, point.y)
        }
    }

    pub fn quad_to(mut self, cx: f32, cy: f32, x: f32, y: f32) -> Self {
        self.path = self.path.quad_to(cx, cy, x, y);
        self.current = Point::new(x, y);
        self
    }

    pub fn cubic_to(mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) -> Self {
        self.path = self.path.cubic_to(c1x, c1y, c2x, c2y, x, y);
        self.current = Point::new(x, y);
        self
    }

    pub fn close(mut self) -> Self {
        self.path = self.path.close();
        self.started = false;
        self
    }

    pub fn build(self) -> Path {
        self.path
    }

    /// Get the current cursor position
    pub fn current_position(&self) -> Point {
        self.current
    }
}

impl Default for PathBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Point> for PathBuilder {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        iter.into_iter()
            .fold(PathBuilder::new(), |builder, p| builder.push_point(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_point_starts_subpath() {
        let path = PathBuilder::new()
            .push_point(Point::new(0.0, 0.0))
            .push_point(Point::new(10.0, 0.0))
            .build();

        assert_eq!(
            path.commands(),
            &[
                PathCommand::MoveTo(Point::new(0.0, 0.0)),
                PathCommand::LineTo(Point::new(10.0, 0.0)),
            ]
        );
    }

    #[test]
    fn test_collect_points() {
        let builder: PathBuilder = vec![Point::new(1.0, 1.0), Point::new(2.0, 3.0)]
            .into_iter()
            .collect();
        assert_eq!(builder.current_position(), Point::new(2.0, 3.0));
        assert_eq!(builder.build().commands().len(), 2);
    }
}
