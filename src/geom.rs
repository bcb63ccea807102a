//! Shared geometry utilities.

use kurbo::{
    CubicBez, Line, ParamCurve, ParamCurveArclen, ParamCurveExtrema, ParamCurveNearest, PathSeg,
    Point, Rect,
};

use crate::contour::{Contour, Node, NodeKind};

/// Arc-length accuracy used by [`ArcPrecision::Exact`], in font units.
const EXACT_ACCURACY: f64 = 1e-4;

/// Arc-length accuracy used by [`ArcPrecision::Approximate`], in font units.
const APPROXIMATE_ACCURACY: f64 = 0.1;

/// Control-point offsets for a 45° unit-circle arc, counter-clockwise from (1, 0).
const UNIT_CIRCLE: [[(f64, f64); 3]; 8] = [
    [(1.0, 0.265216), (0.894643, 0.51957), (0.7071, 0.7071)],
    [(0.51957, 0.894643), (0.265216, 1.0), (0.0, 1.0)],
    [(-0.265216, 1.0), (-0.51957, 0.894643), (-0.7071, 0.7071)],
    [(-0.894643, 0.51957), (-1.0, 0.265216), (-1.0, 0.0)],
    [(-1.0, -0.265216), (-0.894643, -0.51957), (-0.7071, -0.7071)],
    [(-0.51957, -0.894643), (-0.265216, -1.0), (0.0, -1.0)],
    [(0.265216, -1.0), (0.51957, -0.894643), (0.7071, -0.7071)],
    [(0.894643, -0.51957), (1.0, -0.265216), (1.0, 0.0)],
];

/// How carefully arc lengths are integrated.
///
/// A single table build must stick to one precision so that spacing
/// computed from it stays visually stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArcPrecision {
    Exact,
    #[default]
    Approximate,
}

impl ArcPrecision {
    fn accuracy(self) -> f64 {
        match self {
            ArcPrecision::Exact => EXACT_ACCURACY,
            ArcPrecision::Approximate => APPROXIMATE_ACCURACY,
        }
    }
}

/// A single line or cubic piece of a contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line(Line),
    Cubic(CubicBez),
}

impl Segment {
    pub fn start(&self) -> Point {
        match self {
            Segment::Line(l) => l.p0,
            Segment::Cubic(c) => c.p0,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Segment::Line(l) => l.p1,
            Segment::Cubic(c) => c.p3,
        }
    }

    pub fn eval(&self, t: f64) -> Point {
        match self {
            Segment::Line(l) => l.eval(t),
            Segment::Cubic(c) => c.eval(t),
        }
    }

    /// Split into the pieces before and after `t`.
    pub fn split(&self, t: f64) -> (Segment, Segment) {
        match self {
            Segment::Line(l) => {
                let mid = l.eval(t);
                (
                    Segment::Line(Line::new(l.p0, mid)),
                    Segment::Line(Line::new(mid, l.p1)),
                )
            }
            Segment::Cubic(c) => (
                Segment::Cubic(c.subsegment(0.0..t)),
                Segment::Cubic(c.subsegment(t..1.0)),
            ),
        }
    }

    /// The piece from the start up to `t`.
    pub fn head(&self, t: f64) -> Segment {
        match self {
            Segment::Line(l) => Segment::Line(l.subsegment(0.0..t)),
            Segment::Cubic(c) => Segment::Cubic(c.subsegment(0.0..t)),
        }
    }

    pub fn arclen(&self, precision: ArcPrecision) -> f64 {
        match self {
            Segment::Line(l) => l.length(),
            Segment::Cubic(c) => c.arclen(precision.accuracy()),
        }
    }

    /// Tight bounding box (includes curve extrema, not just control points).
    pub fn bounding_box(&self) -> Rect {
        match self {
            Segment::Line(l) => l.bounding_box(),
            Segment::Cubic(c) => c.bounding_box(),
        }
    }

    /// Parameter and distance of the point on this segment closest to `p`.
    pub fn nearest(&self, p: Point) -> (f64, f64) {
        let nearest = match self {
            Segment::Line(l) => l.nearest(p, 1e-9),
            Segment::Cubic(c) => c.nearest(p, 1e-9),
        };
        (nearest.t, nearest.distance_sq.sqrt())
    }

    pub fn to_path_seg(self) -> PathSeg {
        match self {
            Segment::Line(l) => PathSeg::Line(l),
            Segment::Cubic(c) => PathSeg::Cubic(c),
        }
    }
}

/// Closed-interval overlap test; boxes that merely touch count as overlapping.
pub fn bounds_overlap(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}

/// A closed circle built from eight 45° cubic arcs.
///
/// Eight arcs instead of four keeps the shape accurate at small sizes.
pub fn circle_contour(center: Point, radius: f64) -> Contour {
    let mut nodes = Vec::with_capacity(24);
    for arc in &UNIT_CIRCLE {
        for (i, &(x, y)) in arc.iter().enumerate() {
            let pos = Point::new(center.x + x * radius, center.y + y * radius);
            let kind = if i == 2 { NodeKind::Curve } else { NodeKind::OffCurve };
            nodes.push(Node::new(pos, kind));
        }
    }
    Contour::new(nodes, true)
}

/// A closed axis-aligned rectangle.
pub fn rect_contour(bottom_left: Point, top_right: Point) -> Contour {
    let corners = [
        bottom_left,
        Point::new(top_right.x, bottom_left.y),
        top_right,
        Point::new(bottom_left.x, top_right.y),
    ];
    Contour::new(
        corners.iter().map(|&p| Node::new(p, NodeKind::Line)).collect(),
        true,
    )
}
