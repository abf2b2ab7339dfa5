//! Traced path segments and their normalization into cubic Beziers.
//!
//! Every segment a tracer can produce is mapped onto the same four-point
//! [`CubicControlSet`], so downstream consumers (equation emitter, plot
//! renderer) only ever deal with one curve shape. Straight segments become
//! degenerate cubics whose inner controls sit at the thirds of the chord,
//! which makes the Bernstein expansion trace the original line exactly.

use serde::{Deserialize, Serialize};

use crate::types::{AxisConvention, Point};

/// One segment of a traced outline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathSegment {
    /// Straight segment.
    Line {
        /// Start point.
        start: Point,
        /// End point.
        end: Point,
    },
    /// Cubic Bezier segment with explicit controls.
    CubicCurve {
        /// Start point.
        start: Point,
        /// First control point.
        control1: Point,
        /// Second control point.
        control2: Point,
        /// End point.
        end: Point,
    },
    /// Any other segment kind (quadratic, arc, ...). Only its endpoints
    /// are kept and it is treated as a line.
    Other {
        /// Start point.
        start: Point,
        /// End point.
        end: Point,
    },
}

impl PathSegment {
    /// Start point of the segment.
    #[must_use]
    pub const fn start(&self) -> Point {
        match *self {
            Self::Line { start, .. } | Self::CubicCurve { start, .. } | Self::Other { start, .. } => {
                start
            }
        }
    }

    /// End point of the segment.
    #[must_use]
    pub const fn end(&self) -> Point {
        match *self {
            Self::Line { end, .. } | Self::CubicCurve { end, .. } | Self::Other { end, .. } => end,
        }
    }
}

/// An ordered run of segments belonging to one traced outline.
pub type TracedPath = Vec<PathSegment>;

/// The canonical four control points every segment is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicControlSet {
    /// Start point (`t = 0`).
    pub p0: Point,
    /// First control point.
    pub p1: Point,
    /// Second control point.
    pub p2: Point,
    /// End point (`t = 1`).
    pub p3: Point,
}

impl CubicControlSet {
    /// Evaluate the Bernstein expansion at `t`.
    #[must_use]
    pub fn eval(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        let b0 = mt * mt * mt;
        let b1 = 3.0 * mt * mt * t;
        let b2 = 3.0 * mt * t * t;
        let b3 = t * t * t;
        Point::new(
            b3.mul_add(
                self.p3.x,
                b2.mul_add(self.p2.x, b1.mul_add(self.p1.x, b0 * self.p0.x)),
            ),
            b3.mul_add(
                self.p3.y,
                b2.mul_add(self.p2.y, b1.mul_add(self.p1.y, b0 * self.p0.y)),
            ),
        )
    }

    /// Map all four points into the given axis convention.
    #[must_use]
    pub fn oriented(&self, axis: AxisConvention) -> Self {
        Self {
            p0: axis.apply(self.p0),
            p1: axis.apply(self.p1),
            p2: axis.apply(self.p2),
            p3: axis.apply(self.p3),
        }
    }

    /// Sample `samples + 1` evenly spaced points over `t in [0, 1]`.
    #[must_use]
    pub fn sample(&self, samples: usize) -> Vec<Point> {
        let n = samples.max(1);
        #[allow(clippy::cast_precision_loss)]
        (0..=n).map(|i| self.eval(i as f64 / n as f64)).collect()
    }
}

/// Map one traced segment to its cubic control set.
///
/// Total: every segment kind has a mapping.
#[must_use]
pub fn normalize_segment(segment: &PathSegment) -> CubicControlSet {
    match *segment {
        PathSegment::CubicCurve {
            start,
            control1,
            control2,
            end,
        } => CubicControlSet {
            p0: start,
            p1: control1,
            p2: control2,
            p3: end,
        },
        PathSegment::Line { start, end } | PathSegment::Other { start, end } => CubicControlSet {
            p0: start,
            p1: start.lerp(end, 1.0 / 3.0),
            p2: start.lerp(end, 2.0 / 3.0),
            p3: end,
        },
    }
}

/// Normalize every segment of every path, preserving path order and then
/// segment order within each path. Nothing is filtered or de-duplicated.
#[must_use]
pub fn normalize_paths(paths: &[TracedPath]) -> Vec<CubicControlSet> {
    paths.iter().flatten().map(normalize_segment).collect()
}
