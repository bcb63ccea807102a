//! Segment/segment intersection.
//!
//! Lines against lines use the closed-form determinant, lines against
//! cubics defer to kurbo's root finder, and cubics against cubics are
//! found by recursive bisection with bounding-box pruning.

use kurbo::{CubicBez, Line, ParamCurve, PathSeg, Point, Rect};

use crate::geom::{bounds_overlap, Segment};

/// Maximum recursion depth for cubic bisection.
const MAX_DEPTH: u32 = 40;

/// Sub-curves smaller than this (font units) are taken as a hit.
const INTERSECT_TOL: f64 = 1e-3;

/// Two hits closer than this in both parameters are the same hit.
const DEDUP_T: f64 = 1e-4;

/// Two cubics cross at most nine times; more means the curves coincide.
const MAX_HITS: usize = 9;

/// Parameter slack when deciding whether a hit lies on the segment.
const T_EPSILON: f64 = 1e-9;

/// A crossing between two segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub point: Point,
    /// Parameter on the first segment.
    pub t1: f64,
    /// Parameter on the second segment.
    pub t2: f64,
}

/// All crossings of `a` and `b` with both parameters inside `[0, 1]`.
pub fn intersect(a: &Segment, b: &Segment) -> Vec<Hit> {
    let hits = match (a, b) {
        (Segment::Line(l1), Segment::Line(l2)) => line_line(l1, l2).into_iter().collect(),
        (Segment::Line(l), Segment::Cubic(c)) => line_cubic(l, c),
        (Segment::Cubic(c), Segment::Line(l)) => line_cubic(l, c)
            .into_iter()
            .map(|h| Hit {
                point: h.point,
                t1: h.t2,
                t2: h.t1,
            })
            .collect(),
        (Segment::Cubic(c1), Segment::Cubic(c2)) => cubic_cubic(c1, c2),
    };
    hits.into_iter()
        .filter(|h| on_segment(h.t1) && on_segment(h.t2))
        .collect()
}

fn on_segment(t: f64) -> bool {
    (-T_EPSILON..=1.0 + T_EPSILON).contains(&t)
}

/// Crossing of two infinite lines, parameterized on each segment.
///
/// Parallel and degenerate lines have a zero determinant and report no hit.
fn line_line(a: &Line, b: &Line) -> Option<Hit> {
    let d1 = a.p1 - a.p0;
    let d2 = b.p1 - b.p0;
    let denom = d1.cross(d2);
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    let w = b.p0 - a.p0;
    let t1 = w.cross(d2) / denom;
    let t2 = w.cross(d1) / denom;
    Some(Hit {
        point: a.eval(t1),
        t1,
        t2,
    })
}

fn line_cubic(line: &Line, cubic: &CubicBez) -> Vec<Hit> {
    PathSeg::Cubic(*cubic)
        .intersect_line(*line)
        .into_iter()
        .map(|ix| Hit {
            point: cubic.eval(ix.segment_t),
            t1: ix.line_t,
            t2: ix.segment_t,
        })
        .collect()
}

fn cubic_cubic(c1: &CubicBez, c2: &CubicBez) -> Vec<Hit> {
    let mut hits = Vec::new();
    bisect(c1, c2, (0.0, 1.0), (0.0, 1.0), 0, &mut hits);
    hits
}

/// Control-polygon bounding box; always contains the curve.
fn hull_box(c: &CubicBez) -> Rect {
    Rect::from_points(c.p0, c.p1).union(Rect::from_points(c.p2, c.p3))
}

fn extent(r: &Rect) -> f64 {
    r.width().max(r.height())
}

fn bisect(
    c1: &CubicBez,
    c2: &CubicBez,
    range1: (f64, f64),
    range2: (f64, f64),
    depth: u32,
    hits: &mut Vec<Hit>,
) {
    if hits.len() >= MAX_HITS {
        return;
    }
    let bb1 = hull_box(c1);
    let bb2 = hull_box(c2);
    if !bounds_overlap(&bb1, &bb2) {
        return;
    }

    let mid1 = f64::midpoint(range1.0, range1.1);
    let mid2 = f64::midpoint(range2.0, range2.1);
    if (extent(&bb1) < INTERSECT_TOL && extent(&bb2) < INTERSECT_TOL) || depth >= MAX_DEPTH {
        let duplicate = hits
            .iter()
            .any(|h| (h.t1 - mid1).abs() < DEDUP_T && (h.t2 - mid2).abs() < DEDUP_T);
        if !duplicate {
            hits.push(Hit {
                point: c1.eval(0.5),
                t1: mid1,
                t2: mid2,
            });
        }
        return;
    }

    let (l1, r1) = (c1.subsegment(0.0..0.5), c1.subsegment(0.5..1.0));
    let (l2, r2) = (c2.subsegment(0.0..0.5), c2.subsegment(0.5..1.0));
    let d = depth + 1;
    bisect(&l1, &l2, (range1.0, mid1), (range2.0, mid2), d, hits);
    bisect(&l1, &r2, (range1.0, mid1), (mid2, range2.1), d, hits);
    bisect(&r1, &l2, (mid1, range1.1), (range2.0, mid2), d, hits);
    bisect(&r1, &r2, (mid1, range1.1), (mid2, range2.1), d, hits);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hump() -> Segment {
        Segment::Cubic(CubicBez::new((0.0, 0.0), (0.0, 100.0), (100.0, 100.0), (100.0, 0.0)))
    }

    fn valley() -> Segment {
        Segment::Cubic(CubicBez::new((0.0, 100.0), (0.0, 0.0), (100.0, 0.0), (100.0, 100.0)))
    }

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Segment {
        Segment::Line(Line::new((x0, y0), (x1, y1)))
    }

    #[test]
    fn crossing_lines_meet_once() {
        let hits = intersect(&line(0.0, 5.0, 10.0, 5.0), &line(5.0, 0.0, 5.0, 10.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].point, Point::new(5.0, 5.0));
        assert!((hits[0].t1 - 0.5).abs() < 1e-12);
        assert!((hits[0].t2 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn parallel_lines_have_no_hit() {
        assert!(intersect(&line(0.0, 0.0, 10.0, 0.0), &line(0.0, 5.0, 10.0, 5.0)).is_empty());
        // Collinear and overlapping is still a zero determinant.
        assert!(intersect(&line(0.0, 0.0, 10.0, 0.0), &line(5.0, 0.0, 15.0, 0.0)).is_empty());
        // A zero-length segment is degenerate, not a crash.
        assert!(intersect(&line(3.0, 3.0, 3.0, 3.0), &line(0.0, 0.0, 10.0, 10.0)).is_empty());
    }

    #[test]
    fn extrapolated_crossings_are_discarded() {
        // The infinite lines cross at (20, 5), beyond the first segment.
        assert!(intersect(&line(0.0, 5.0, 10.0, 5.0), &line(20.0, 0.0, 20.0, 10.0)).is_empty());
    }

    #[test]
    fn line_through_cubic() {
        // The hump is symmetric and peaks at y = 75 on x = 50.
        let hits = intersect(&line(50.0, -10.0, 50.0, 100.0), &hump());
        assert_eq!(hits.len(), 1);
        assert!(hits[0].point.distance(Point::new(50.0, 75.0)) < 1e-6, "{:?}", hits[0]);
        assert!((hits[0].t2 - 0.5).abs() < 1e-6);

        let swapped = intersect(&hump(), &line(50.0, -10.0, 50.0, 100.0));
        assert_eq!(swapped.len(), 1);
        assert!((swapped[0].t1 - 0.5).abs() < 1e-6);

        assert!(intersect(&line(50.0, -10.0, 50.0, 10.0), &hump()).is_empty());
    }

    #[test]
    fn crossing_cubics() {
        // Both curves share x(t), so they cross where 300t(1-t) = 50,
        // i.e. t = (1 ± 1/sqrt(3)) / 2, at y = 50.
        let mut hits = intersect(&hump(), &valley());
        hits.sort_by(|a, b| a.t1.total_cmp(&b.t1));
        assert_eq!(hits.len(), 2, "{hits:?}");
        let expected = [(1.0 - 1.0 / 3f64.sqrt()) / 2.0, (1.0 + 1.0 / 3f64.sqrt()) / 2.0];
        for (hit, t) in hits.iter().zip(expected) {
            assert!((hit.t1 - t).abs() < 1e-3, "{hit:?}");
            assert!((hit.t2 - t).abs() < 1e-3, "{hit:?}");
            assert!((hit.point.y - 50.0).abs() < 0.01, "{hit:?}");
        }
    }
}
