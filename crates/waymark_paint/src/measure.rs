//! Arc-length measurement
//!
//! [`PathMeasure`] flattens a path once and then answers "where is the point
//! `d` pixels along this path, and which way is it heading" in O(log n).
//! Labels use it to walk glyphs along roads and rivers.

use waymark_core::{Path, Point, Vec2};

use crate::flatten::{flatten, LineSegment, DEFAULT_TOLERANCE};

/// Paths shorter than this are treated as zero-length
pub const DEGENERATE_LENGTH: f32 = 1e-4;

/// A position on a measured path
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathSample {
    /// Point on the path (or on the extension of its end segments)
    pub position: Point,
    /// Unit tangent in the direction of travel
    pub tangent: Vec2,
    /// Tangent angle in radians from the positive x axis
    pub angle: f32,
}

impl PathSample {
    /// Unit normal, a quarter turn clockwise from the tangent on screen
    pub fn normal(&self) -> Vec2 {
        self.tangent.perpendicular()
    }

    /// The sample pushed along its normal by `distance`
    pub fn offset_position(&self, distance: f32) -> Point {
        self.position.offset(self.normal().scale(distance))
    }
}

#[derive(Clone, Copy, Debug)]
struct MeasuredSegment {
    segment: LineSegment,
    /// Arc length at `segment.from`
    start: f32,
    length: f32,
    direction: Vec2,
}

/// Cumulative arc-length table over a flattened path
#[derive(Clone, Debug, Default)]
pub struct PathMeasure {
    segments: Vec<MeasuredSegment>,
    length: f32,
}

impl PathMeasure {
    /// Measure a path with the default flattening tolerance
    pub fn new(path: &Path) -> Self {
        Self::with_tolerance(path, DEFAULT_TOLERANCE)
    }

    /// Measure a path, flattening curves to within `tolerance` pixels
    pub fn with_tolerance(path: &Path, tolerance: f32) -> Self {
        Self::from_segments(flatten(path, tolerance))
    }

    /// Measure an open polyline
    pub fn from_points(points: &[Point]) -> Self {
        Self::from_segments(
            points
                .windows(2)
                .map(|w| LineSegment {
                    from: w[0],
                    to: w[1],
                })
                .collect(),
        )
    }

    fn from_segments(segments: Vec<LineSegment>) -> Self {
        let mut measured = Vec::with_capacity(segments.len());
        let mut length = 0.0;

        for segment in segments {
            let seg_len = segment.length();
            // Zero-length pieces carry no direction
            if seg_len <= f32::EPSILON {
                continue;
            }
            measured.push(MeasuredSegment {
                segment,
                start: length,
                length: seg_len,
                direction: segment.direction(),
            });
            length += seg_len;
        }

        tracing::trace!(segments = measured.len(), length, "measured path");

        Self {
            segments: measured,
            length,
        }
    }

    /// Total arc length in pixels
    pub fn length(&self) -> f32 {
        self.length
    }

    /// True when there is nothing to walk along
    pub fn is_degenerate(&self) -> bool {
        self.segments.is_empty() || self.length <= DEGENERATE_LENGTH
    }

    pub fn start_point(&self) -> Option<Point> {
        self.segments.first().map(|s| s.segment.from)
    }

    pub fn end_point(&self) -> Option<Point> {
        self.segments.last().map(|s| s.segment.to)
    }

    /// True when the path ends to the left of where it starts
    pub fn runs_right_to_left(&self) -> bool {
        match (self.start_point(), self.end_point()) {
            (Some(start), Some(end)) => end.x < start.x,
            _ => false,
        }
    }

    /// The same path walked from its end to its start
    pub fn reversed(&self) -> Self {
        Self::from_segments(
            self.segments
                .iter()
                .rev()
                .map(|s| s.segment.reversed())
                .collect(),
        )
    }

    /// Sample the path at arc length `distance`
    ///
    /// Distances outside `0..=length` extrapolate along the first or last
    /// segment. Returns `None` for a degenerate path.
    pub fn sample(&self, distance: f32) -> Option<PathSample> {
        if self.is_degenerate() {
            return None;
        }

        let idx = self
            .segments
            .partition_point(|s| s.start + s.length < distance)
            .min(self.segments.len() - 1);
        let seg = &self.segments[idx];
        let along = distance - seg.start;

        Some(PathSample {
            position: seg.segment.from.offset(seg.direction.scale(along)),
            tangent: seg.direction,
            angle: seg.direction.angle(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_l_shaped_path() {
        let m = PathMeasure::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ]);
        assert!(approx(m.length(), 20.0));

        let s = m.sample(5.0).unwrap();
        assert_eq!(s.position, Point::new(5.0, 0.0));
        assert!(approx(s.angle, 0.0));

        let s = m.sample(15.0).unwrap();
        assert!(approx(s.position.x, 10.0) && approx(s.position.y, 5.0));
        assert!(approx(s.angle, FRAC_PI_2));
    }

    #[test]
    fn test_extrapolates_past_the_ends() {
        let m = PathMeasure::from_points(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        assert_eq!(m.sample(-2.0).unwrap().position, Point::new(-2.0, 0.0));
        assert_eq!(m.sample(12.0).unwrap().position, Point::new(12.0, 0.0));
    }

    #[test]
    fn test_degenerate_paths() {
        let m = PathMeasure::from_points(&[Point::new(3.0, 3.0), Point::new(3.0, 3.0)]);
        assert!(m.is_degenerate());
        assert!(m.sample(0.0).is_none());

        assert!(PathMeasure::new(&Path::new()).is_degenerate());
        assert!(PathMeasure::new(&Path::new().move_to(1.0, 1.0)).is_degenerate());
    }

    #[test]
    fn test_zero_length_segments_are_skipped() {
        let m = PathMeasure::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
        ]);
        assert!(approx(m.length(), 4.0));
        assert!(approx(m.sample(0.0).unwrap().angle, 0.0));
    }

    #[test]
    fn test_reversed() {
        let m = PathMeasure::from_points(&[Point::new(10.0, 0.0), Point::new(0.0, 0.0)]);
        assert!(m.runs_right_to_left());

        let r = m.reversed();
        assert!(!r.runs_right_to_left());
        assert!(approx(r.length(), m.length()));
        assert_eq!(r.start_point(), Some(Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_normal_offset_is_below_rightward_path() {
        let m = PathMeasure::from_points(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        let s = m.sample(5.0).unwrap();
        assert_eq!(s.offset_position(3.0), Point::new(5.0, 3.0));
    }

    #[test]
    fn test_cubic_path_samples_advance() {
        let path = Path::new().move_to(0.0, 0.0).cubic_to(0.0, 50.0, 100.0, 50.0, 100.0, 0.0);
        let m = PathMeasure::new(&path);
        assert!(m.length() > 100.0);

        // Samples along the path advance monotonically in x for this curve
        let xs: Vec<f32> = (0..=10)
            .map(|i| m.sample(m.length() * i as f32 / 10.0).unwrap().position.x)
            .collect();
        assert!(xs.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_coarser_tolerance_shortens_convex_curve() {
        let path = Path::new().move_to(0.0, 0.0).quad_to(50.0, 80.0, 100.0, 0.0);
        let fine = PathMeasure::with_tolerance(&path, 0.01).length();
        let coarse = PathMeasure::with_tolerance(&path, 5.0).length();
        assert!(coarse <= fine + 1e-3, "coarse {coarse} fine {fine}");
        assert!(fine - coarse < 10.0);
        assert!((PathMeasure::new(&path).length() - fine).abs() < 0.5);
    }
}
