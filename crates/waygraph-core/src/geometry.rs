//! Point and segment math used by the graph engine and the route validator.
//!
//! Distances and projections are computed against the *infinite* line through
//! two route endpoints, not the bounded segment. Splitting relies on this.

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

/// Default distance under which a new node splits an existing route
pub const DEFAULT_SPLIT_THRESHOLD: f64 = 4.0;

/// A position on the map plane.
///
/// Serialized as a two element array `[x, y]`, the shape the `roi` column uses.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

fn ensure_not_degenerate(a: Point, b: Point) -> GraphResult<()> {
    if a == b {
        return Err(GraphError::InvalidInput(format!(
            "degenerate segment: both endpoints at {}",
            a
        )));
    }
    Ok(())
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
pub fn distance_point_to_line(p: Point, a: Point, b: Point) -> GraphResult<f64> {
    ensure_not_degenerate(a, b)?;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let cross = (p.x - a.x) * dy - (p.y - a.y) * dx;
    Ok(cross.abs() / dx.hypot(dy))
}

/// Closest point to `p` on the line through `a` and `b`.
pub fn project_point_onto_line(p: Point, a: Point, b: Point) -> GraphResult<Point> {
    ensure_not_degenerate(a, b)?;

    if a.x == b.x {
        return Ok(Point::new(a.x, p.y));
    }
    if a.y == b.y {
        return Ok(Point::new(p.x, a.y));
    }

    // y = k*x + c, and the perpendicular through p has slope -1/k
    let k = (b.y - a.y) / (b.x - a.x);
    let c = a.y - k * a.x;
    let k_perp = -1.0 / k;
    let c_perp = p.y - k_perp * p.x;

    let x = (c_perp - c) / (k - k_perp);
    let y = k * x + c;
    Ok(Point::new(x, y))
}

/// Snapped position of `p` when it lies closer than `threshold` to the line
/// through `a` and `b`.
pub fn point_within_split_threshold(
    p: Point,
    a: Point,
    b: Point,
    threshold: f64,
) -> GraphResult<Option<Point>> {
    if distance_point_to_line(p, a, b)? < threshold {
        Ok(Some(project_point_onto_line(p, a, b)?))
    } else {
        Ok(None)
    }
}

/// Exact cross product test. Only used for diagnostics.
pub fn is_collinear(p: Point, a: Point, b: Point) -> bool {
    (p.x - a.x) * (b.y - a.y) == (p.y - a.y) * (b.x - a.x)
}

/// Integer pixel coordinate produced by [`rasterize_segment`]
pub type Sample = (i64, i64);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stepping {
    /// Constant x, walk y
    Vertical { x: i64 },
    /// Constant y, walk x
    Horizontal { y: i64 },
    /// Walk x, derive y from the slope
    Sloped { origin: Point, slope: f64 },
}

/// Ordered samples between two endpoints.
///
/// The sequence is finite and cloning it restarts iteration from the
/// beginning of whatever remains.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSamples {
    stepping: Stepping,
    next: i64,
    last: i64,
}

impl Iterator for SegmentSamples {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if self.next > self.last {
            return None;
        }
        let step = self.next;
        match self.next.checked_add(1) {
            Some(next) => self.next = next,
            None => self.last = step - 1,
        }

        let sample = match self.stepping {
            Stepping::Vertical { x } => (x, step),
            Stepping::Horizontal { y } => (step, y),
            Stepping::Sloped { origin, slope } => {
                let y = origin.y + slope * (step as f64 - origin.x);
                (step, y.round() as i64)
            }
        };
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (i128::from(self.last) - i128::from(self.next) + 1)
            .clamp(0, usize::MAX as i128) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SegmentSamples {}

impl SegmentSamples {
    /// Restrict the walk to a `width` x `height` grid.
    ///
    /// Only samples outside the grid are dropped, so the walk is bounded by
    /// the grid size whatever the endpoint coordinates are.
    pub fn clipped_to(mut self, width: u32, height: u32) -> Self {
        let (width, height) = (i64::from(width), i64::from(height));
        let (cross, cross_extent, walk_extent) = match self.stepping {
            Stepping::Vertical { x } => (Some(x), width, height),
            Stepping::Horizontal { y } => (Some(y), height, width),
            Stepping::Sloped { .. } => (None, height, width),
        };

        if cross.is_some_and(|c| c < 0 || c >= cross_extent) {
            self.next = 0;
            self.last = -1;
            return self;
        }
        self.next = self.next.max(0);
        self.last = self.last.min(walk_extent - 1);
        self
    }
}

/// Sample points along the segment from `a` to `b`.
///
/// Iteration always runs from the smaller coordinate to the larger one,
/// independent of endpoint order.
pub fn rasterize_segment(a: Point, b: Point) -> SegmentSamples {
    if a.x == b.x {
        let (lo, hi) = if a.y <= b.y { (a.y, b.y) } else { (b.y, a.y) };
        return SegmentSamples {
            stepping: Stepping::Vertical { x: a.x.round() as i64 },
            next: lo.round() as i64,
            last: hi.round() as i64,
        };
    }

    let (lo, hi) = if a.x <= b.x { (a, b) } else { (b, a) };
    let stepping = if a.y == b.y {
        Stepping::Horizontal { y: a.y.round() as i64 }
    } else {
        Stepping::Sloped {
            origin: lo,
            slope: (hi.y - lo.y) / (hi.x - lo.x),
        }
    };

    SegmentSamples {
        stepping,
        next: lo.x.round() as i64,
        last: hi.x.round() as i64,
    }
}
