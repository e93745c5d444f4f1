//! Path flattening
//!
//! Converts vector paths into line segments using lyon, so curved map
//! geometry can be measured and sampled by arc length.

use lyon::math::point;
use lyon::path::iterator::PathIterator;
use lyon::path::PathEvent;
use smallvec::SmallVec;
use waymark_core::{Path, PathCommand, Point, Vec2};

/// Default flattening tolerance in pixels
pub const DEFAULT_TOLERANCE: f32 = 0.1;

/// A straight piece of a flattened path
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSegment {
    pub from: Point,
    pub to: Point,
}

impl LineSegment {
    pub fn length(&self) -> f32 {
        self.from.distance(self.to)
    }

    pub fn direction(&self) -> Vec2 {
        (self.to - self.from).normalize()
    }

    pub fn reversed(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}

/// Flatten a path into line segments, in path order
///
/// Closed subpaths include their closing segment. Moves between subpaths
/// produce no segment.
pub fn flatten(path: &Path, tolerance: f32) -> Vec<LineSegment> {
    let events = path_to_lyon_events(path);
    let mut segments = Vec::new();

    for event in events.into_iter().flattened(tolerance) {
        match event {
            PathEvent::Line { from, to } => segments.push(LineSegment {
                from: Point::new(from.x, from.y),
                to: Point::new(to.x, to.y),
            }),
            PathEvent::End {
                last,
                first,
                close: true,
            } => segments.push(LineSegment {
                from: Point::new(last.x, last.y),
                to: Point::new(first.x, first.y),
            }),
            _ => {}
        }
    }

    segments
}

/// Convert an SVG arc to cubic bezier curves
/// Uses the endpoint-to-centre conversion from the SVG implementation notes
fn arc_to_cubics(
    from: Point,
    radii: Vec2,
    x_rotation: f32,
    large_arc: bool,
    sweep: bool,
    to: Point,
) -> SmallVec<[(Point, Point, Point); 4]> {
    let mut curves = SmallVec::new();

    if from == to {
        return curves;
    }

    let mut rx = radii.x.abs();
    let mut ry = radii.y.abs();

    if rx == 0.0 || ry == 0.0 {
        // Treat as a line
        return curves;
    }

    let cos_phi = x_rotation.cos();
    let sin_phi = x_rotation.sin();

    // Transformed start point
    let dx = (from.x - to.x) / 2.0;
    let dy = (from.y - to.y) / 2.0;
    let x1p = cos_phi * dx + sin_phi * dy;
    let y1p = -sin_phi * dx + cos_phi * dy;

    let x1p_sq = x1p * x1p;
    let y1p_sq = y1p * y1p;

    // Ensure radii are large enough
    let lambda = x1p_sq / (rx * rx) + y1p_sq / (ry * ry);
    if lambda > 1.0 {
        let lambda_sqrt = lambda.sqrt();
        rx *= lambda_sqrt;
        ry *= lambda_sqrt;
    }

    let rx_sq = rx * rx;
    let ry_sq = ry * ry;

    let sq_numer = (rx_sq * ry_sq - rx_sq * y1p_sq - ry_sq * x1p_sq).max(0.0);
    let sq_denom = rx_sq * y1p_sq + ry_sq * x1p_sq;
    let sq = if sq_denom > 0.0 {
        (sq_numer / sq_denom).sqrt()
    } else {
        0.0
    };

    let sign = if large_arc == sweep { -1.0 } else { 1.0 };
    let cxp = sign * sq * rx * y1p / ry;
    let cyp = sign * sq * -ry * x1p / rx;

    let cx = cos_phi * cxp - sin_phi * cyp + (from.x + to.x) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (from.y + to.y) / 2.0;

    fn angle(ux: f32, uy: f32, vx: f32, vy: f32) -> f32 {
        let dot = ux * vx + uy * vy;
        let len = (ux * ux + uy * uy).sqrt() * (vx * vx + vy * vy).sqrt();
        let cos_val = (dot / len).clamp(-1.0, 1.0);
        let angle = cos_val.acos();
        if ux * vy - uy * vx < 0.0 {
            -angle
        } else {
            angle
        }
    }

    let theta1 = angle(1.0, 0.0, (x1p - cxp) / rx, (y1p - cyp) / ry);
    let mut dtheta = angle(
        (x1p - cxp) / rx,
        (y1p - cyp) / ry,
        (-x1p - cxp) / rx,
        (-y1p - cyp) / ry,
    );

    if sweep && dtheta < 0.0 {
        dtheta += std::f32::consts::TAU;
    } else if !sweep && dtheta > 0.0 {
        dtheta -= std::f32::consts::TAU;
    }

    // Split arc into segments (max 90 degrees each)
    let num_segments = ((dtheta.abs() / std::f32::consts::FRAC_PI_2).ceil() as usize).clamp(1, 4);
    let segment_angle = dtheta / num_segments as f32;
    let alpha = (segment_angle / 4.0).tan() * 4.0 / 3.0;

    // Point and derivative on the rotated ellipse at parameter t
    let at = |t: f32| {
        let (sin_t, cos_t) = t.sin_cos();
        let ex = rx * cos_t;
        let ey = ry * sin_t;
        let dx = -rx * sin_t;
        let dy = ry * cos_t;
        (
            Point::new(cx + cos_phi * ex - sin_phi * ey, cy + sin_phi * ex + cos_phi * ey),
            Vec2::new(cos_phi * dx - sin_phi * dy, sin_phi * dx + cos_phi * dy),
        )
    };

    for i in 0..num_segments {
        let t1 = theta1 + i as f32 * segment_angle;
        let t2 = t1 + segment_angle;
        let (p0, d0) = at(t1);
        let (p3, d3) = at(t2);

        curves.push((
            Point::new(p0.x + alpha * d0.x, p0.y + alpha * d0.y),
            Point::new(p3.x - alpha * d3.x, p3.y - alpha * d3.y),
            p3,
        ));
    }

    curves
}

/// Convert a waymark_core Path to lyon path events
fn path_to_lyon_events(path: &Path) -> Vec<PathEvent> {
    let mut events = Vec::new();
    let mut first_point: Option<Point> = None;
    let mut current_point = Point::ZERO;

    // Drawing without an open subpath starts one at the cursor (the origin,
    // or the start of the subpath that was just closed)
    fn ensure_begun(events: &mut Vec<PathEvent>, first_point: &mut Option<Point>, at: Point) {
        if first_point.is_none() {
            events.push(PathEvent::Begin {
                at: point(at.x, at.y),
            });
            *first_point = Some(at);
        }
    }

    for cmd in path.commands() {
        match cmd {
            PathCommand::MoveTo(p) => {
                if let Some(first) = first_point {
                    events.push(PathEvent::End {
                        last: point(current_point.x, current_point.y),
                        first: point(first.x, first.y),
                        close: false,
                    });
                }
                events.push(PathEvent::Begin {
                    at: point(p.x, p.y),
                });
                first_point = Some(*p);
                current_point = *p;
            }
            PathCommand::LineTo(p) => {
                ensure_begun(&mut events, &mut first_point, current_point);
                events.push(PathEvent::Line {
                    from: point(current_point.x, current_point.y),
                    to: point(p.x, p.y),
                });
                current_point = *p;
            }
            PathCommand::QuadTo { control, end } => {
                ensure_begun(&mut events, &mut first_point, current_point);
                events.push(PathEvent::Quadratic {
                    from: point(current_point.x, current_point.y),
                    ctrl: point(control.x, control.y),
                    to: point(end.x, end.y),
                });
                current_point = *end;
            }
            PathCommand::CubicTo {
                control1,
                control2,
                end,
            } => {
                ensure_begun(&mut events, &mut first_point, current_point);
                events.push(PathEvent::Cubic {
                    from: point(current_point.x, current_point.y),
                    ctrl1: point(control1.x, control1.y),
                    ctrl2: point(control2.x, control2.y),
                    to: point(end.x, end.y),
                });
                current_point = *end;
            }
            PathCommand::ArcTo {
                radii,
                rotation,
                large_arc,
                sweep,
                end,
            } => {
                ensure_begun(&mut events, &mut first_point, current_point);
                let cubics =
                    arc_to_cubics(current_point, *radii, *rotation, *large_arc, *sweep, *end);

                if cubics.is_empty() {
                    // Degenerate arc - treat as line
                    events.push(PathEvent::Line {
                        from: point(current_point.x, current_point.y),
                        to: point(end.x, end.y),
                    });
                } else {
                    let mut prev = current_point;
                    for (ctrl1, ctrl2, end_pt) in cubics {
                        events.push(PathEvent::Cubic {
                            from: point(prev.x, prev.y),
                            ctrl1: point(ctrl1.x, ctrl1.y),
                            ctrl2: point(ctrl2.x, ctrl2.y),
                            to: point(end_pt.x, end_pt.y),
                        });
                        prev = end_pt;
                    }
                }
                current_point = *end;
            }
            PathCommand::Close => {
                if let Some(first) = first_point {
                    events.push(PathEvent::End {
                        last: point(current_point.x, current_point.y),
                        first: point(first.x, first.y),
                        close: true,
                    });
                    current_point = first;
                    first_point = None;
                }
            }
        }
    }

    // Close any remaining open subpath
    if let Some(first) = first_point {
        events.push(PathEvent::End {
            last: point(current_point.x, current_point.y),
            first: point(first.x, first.y),
            close: false,
        });
    }

    events
}
