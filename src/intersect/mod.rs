//! Mark contour crossings as forced nodes.
//!
//! Every pair of contours is tested in three stages: whole-contour bounding
//! boxes, per-segment bounding boxes, then exact segment intersection. Each
//! crossing point is written into both contours, either by re-using a node
//! already sitting there or by splitting the segment under it.

pub mod narrow;

use kurbo::{ParamCurve, Point, Rect};

use crate::contour::{Contour, Node, NodeKind};
use crate::error::EffectError;
use crate::geom::{bounds_overlap, Segment};

/// An existing node closer than this to a crossing is re-used.
pub const NODE_TOLERANCE: f64 = 1.0;

/// Nodes this close to a previously forced position inherit the forcing.
pub const FORCED_PROPAGATION: f64 = 0.5;

/// Coarse search resolution along each segment.
pub const TICKS: usize = 1000;

/// What [`insert_point`] did to the contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// A node within tolerance was marked; its index.
    Existing(usize),
    /// A segment was split; index of the new on-curve node.
    Inserted(usize),
}

/// Insert locally forced nodes at every crossing between distinct contours.
///
/// Returns the number of nodes added. A contour that cannot locate a
/// crossing on itself is logged and left out of later pairs; a broken
/// insertion index aborts the whole run.
pub fn split_at_intersections(contours: &mut [Contour]) -> Result<usize, EffectError> {
    let mut inserted = 0;
    let mut abandoned = vec![false; contours.len()];

    for i in 0..contours.len() {
        for j in (i + 1)..contours.len() {
            if abandoned[i] || abandoned[j] || contours[i].same_outline(&contours[j]) {
                continue;
            }
            let points = crossings(&contours[i], &contours[j]);
            if points.is_empty() {
                continue;
            }
            tracing::debug!(i, j, count = points.len(), "contours cross");
            for pt in points {
                for k in [i, j] {
                    if abandoned[k] {
                        continue;
                    }
                    match insert_point(&mut contours[k], pt) {
                        Ok(Insertion::Inserted(_)) => inserted += 1,
                        Ok(Insertion::Existing(_)) => {}
                        Err(err @ EffectError::PointNotOnPath { .. }) => {
                            tracing::warn!(contour = k, %err, "skipping contour");
                            abandoned[k] = true;
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }
    }
    Ok(inserted)
}

/// Crossing points between two contours.
///
/// Points are collected before either contour is touched, so insertion
/// never runs while segments of the same contour are being walked.
pub fn crossings(a: &Contour, b: &Contour) -> Vec<Point> {
    let (Some(box_a), Some(box_b)) = (a.bounds(), b.bounds()) else {
        return Vec::new();
    };
    if !bounds_overlap(&box_a, &box_b) {
        return Vec::new();
    }

    let segs_a = boxed_segments(a);
    let segs_b = boxed_segments(b);
    let mut points = Vec::new();
    for (s1, r1) in &segs_a {
        for (s2, r2) in &segs_b {
            if bounds_overlap(r1, r2) {
                points.extend(narrow::intersect(s1, s2).into_iter().map(|h| h.point));
            }
        }
    }
    points
}

fn boxed_segments(contour: &Contour) -> Vec<(Segment, Rect)> {
    contour
        .segments()
        .into_iter()
        .map(|span| (span.segment, span.segment.bounding_box()))
        .collect()
}

/// Make sure `contour` has a locally forced on-curve node at `pt`.
///
/// The new node is placed exactly at `pt`, so a crossing inserted into
/// two contours lands on the same coordinates in both.
pub fn insert_point(contour: &mut Contour, pt: Point) -> Result<Insertion, EffectError> {
    if let Some(idx) = contour
        .nodes
        .iter()
        .position(|n| n.pos.distance(pt) < NODE_TOLERANCE)
    {
        contour.nodes[idx].force_locally();
        return Ok(Insertion::Existing(idx));
    }

    let spans = contour.segments();
    let mut best: Option<(usize, f64, f64)> = None;
    for (k, span) in spans.iter().enumerate() {
        for tick in 1..TICKS {
            let t = tick as f64 / TICKS as f64;
            let dist = span.segment.eval(t).distance(pt);
            if best.map_or(true, |(_, _, d)| dist < d) {
                best = Some((k, t, dist));
            }
        }
    }
    let Some((k, coarse_t, _)) = best else {
        return Err(EffectError::PointNotOnPath { x: pt.x, y: pt.y });
    };
    let span = spans[k];
    if span.end() >= contour.nodes.len() {
        return Err(EffectError::MissingInsertionIndex(span.first));
    }

    // Refine, but never onto an existing end point.
    let (refined, _) = span.segment.nearest(pt);
    let t = if refined > 0.0 && refined < 1.0 { refined } else { coarse_t };

    let end = contour.nodes[span.end()];
    let (replacement, anchor_offset) = match span.segment {
        Segment::Line(_) => (vec![Node::new(pt, NodeKind::Line), end], 0),
        Segment::Cubic(c) => {
            let left = c.subsegment(0.0..t);
            let right = c.subsegment(t..1.0);
            (
                vec![
                    Node::new(left.p1, NodeKind::OffCurve),
                    Node::new(left.p2, NodeKind::OffCurve),
                    Node::new(pt, NodeKind::Curve),
                    Node::new(right.p1, NodeKind::OffCurve),
                    Node::new(right.p2, NodeKind::OffCurve),
                    end,
                ],
                2,
            )
        }
    };

    let forced_positions: Vec<Point> = contour
        .nodes
        .iter()
        .filter(|n| n.is_forced())
        .map(|n| n.pos)
        .collect();

    let mut nodes = Vec::with_capacity(contour.nodes.len() + replacement.len());
    nodes.extend_from_slice(&contour.nodes[..span.first]);
    nodes.extend(replacement);
    nodes.extend_from_slice(&contour.nodes[span.first + span.count..]);

    let anchor = span.first + anchor_offset;
    nodes[anchor].force_locally();
    for node in &mut nodes {
        if forced_positions
            .iter()
            .any(|p| node.pos.distance(*p) < FORCED_PROPAGATION)
        {
            node.force_locally();
        }
    }
    contour.nodes = nodes;
    Ok(Insertion::Inserted(anchor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::Forcing;
    use crate::dotter::split_at_forced;
    use crate::geom::{rect_contour, ArcPrecision};

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Contour {
        Contour::new(
            vec![
                Node::new(Point::new(x0, y0), NodeKind::Line),
                Node::new(Point::new(x1, y1), NodeKind::Line),
            ],
            false,
        )
    }

    fn cubic(p: [(f64, f64); 4]) -> Contour {
        Contour::new(
            vec![
                Node::new(p[0].into(), NodeKind::Line),
                Node::new(p[1].into(), NodeKind::OffCurve),
                Node::new(p[2].into(), NodeKind::OffCurve),
                Node::new(p[3].into(), NodeKind::Curve),
            ],
            false,
        )
    }

    #[test]
    fn crossing_lines_gain_one_node_each() {
        let mut contours = vec![line(0.0, 50.0, 100.0, 50.0), line(50.0, 0.0, 50.0, 100.0)];
        assert_eq!(split_at_intersections(&mut contours).expect("no errors"), 2);
        for c in &contours {
            assert_eq!(c.nodes.len(), 3);
            assert_eq!(c.nodes[1].pos, Point::new(50.0, 50.0));
            assert_eq!(c.nodes[1].forcing, Forcing::LocallyForced);
            assert_eq!(c.nodes[1].kind, NodeKind::Line);
        }
        assert_eq!(contours[0].nodes[1].pos, contours[1].nodes[1].pos);
        // Splitting now breaks both contours at the crossing.
        assert_eq!(split_at_forced(&contours[0]).count(), 2);
        assert_eq!(split_at_forced(&contours[1]).count(), 2);
    }

    #[test]
    fn second_run_inserts_nothing() {
        let mut contours = vec![line(0.0, 50.0, 100.0, 50.0), line(50.0, 0.0, 50.0, 100.0)];
        split_at_intersections(&mut contours).expect("no errors");
        let after_first = contours.clone();
        for c in &mut contours {
            c.clear_local_forcing();
        }
        assert_eq!(split_at_intersections(&mut contours).expect("no errors"), 0);
        assert_eq!(contours, after_first);
    }

    #[test]
    fn crossing_cubics_are_split_in_place() {
        let hump = cubic([(0.0, 0.0), (0.0, 100.0), (100.0, 100.0), (100.0, 0.0)]);
        let valley = cubic([(0.0, 100.0), (0.0, 0.0), (100.0, 0.0), (100.0, 100.0)]);
        let lengths = [hump.length(ArcPrecision::Exact), valley.length(ArcPrecision::Exact)];
        let mut contours = vec![hump, valley];
        assert_eq!(split_at_intersections(&mut contours).expect("no errors"), 4);

        for (c, before) in contours.iter().zip(lengths) {
            assert_eq!(c.nodes.len(), 10);
            let forced: Vec<Point> = c.nodes.iter().filter(|n| n.is_forced()).map(|n| n.pos).collect();
            assert_eq!(forced.len(), 2, "{forced:?}");
            for p in forced {
                assert!((p.y - 50.0).abs() < 0.01, "{p:?}");
            }
            // Splitting a cubic keeps its shape.
            assert!((c.length(ArcPrecision::Exact) - before).abs() < 0.05);
        }
        let shared: Vec<Point> = contours[0].nodes.iter().filter(|n| n.is_forced()).map(|n| n.pos).collect();
        assert!(shared
            .iter()
            .all(|p| contours[1].nodes.iter().any(|n| n.pos == *p)));
    }

    #[test]
    fn split_cubic_anchor_sits_on_the_curve() {
        let mut c = cubic([(0.0, 0.0), (0.0, 100.0), (100.0, 100.0), (100.0, 0.0)]);
        let original = c.segments()[0].segment;
        let target = original.eval(0.3);
        assert_eq!(insert_point(&mut c, target).expect("on path"), Insertion::Inserted(3));
        assert_eq!(c.nodes[3].pos, target);
        assert_eq!(c.nodes[3].kind, NodeKind::Curve);
        let spans = c.segments();
        assert_eq!(spans.len(), 2);
        assert!(spans[0].segment.eval(0.5).distance(original.eval(0.15)) < 1e-3);
    }

    #[test]
    fn nearby_node_is_reused() {
        let mut c = rect_contour(Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        let result = insert_point(&mut c, Point::new(100.4, 0.3)).expect("on path");
        assert_eq!(result, Insertion::Existing(1));
        assert_eq!(c.nodes.len(), 4);
        assert!(c.nodes[1].is_forced());
    }

    #[test]
    fn insertion_keeps_forcing_on_neighbours() {
        let mut c = line(0.0, 0.0, 100.0, 0.0);
        c.nodes[1] = c.nodes[1].forced();
        insert_point(&mut c, Point::new(30.0, 0.0)).expect("on path");
        assert_eq!(c.nodes.len(), 3);
        assert_eq!(c.nodes[2].forcing, Forcing::Forced);
        assert_eq!(c.nodes[1].forcing, Forcing::LocallyForced);
        assert_eq!(c.nodes[0].forcing, Forcing::Unforced);
    }

    #[test]
    fn contour_without_segments_cannot_take_a_point() {
        let mut c = Contour::new(vec![Node::new(Point::new(500.0, 500.0), NodeKind::Line)], false);
        assert!(matches!(
            insert_point(&mut c, Point::new(0.0, 0.0)),
            Err(EffectError::PointNotOnPath { .. })
        ));
    }

    #[test]
    fn identical_and_distant_contours_are_skipped() {
        let a = line(0.0, 50.0, 100.0, 50.0);
        let mut contours = vec![a.clone(), a, line(500.0, 0.0, 500.0, 100.0)];
        assert_eq!(split_at_intersections(&mut contours).expect("no errors"), 0);
        assert!(contours.iter().all(|c| c.nodes.len() == 2));
    }

    #[test]
    fn closed_contour_crossing_its_wraparound_segment() {
        // The rectangle's closing segment runs from (0, 100) down to (0, 0).
        let rect = rect_contour(Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        let mut contours = vec![rect, line(-20.0, 40.0, 20.0, 40.0)];
        assert_eq!(split_at_intersections(&mut contours).expect("no errors"), 2);
        let rect = &contours[0];
        assert!(rect.closed);
        assert_eq!(rect.nodes.len(), 5);
        // Inserted ahead of (0, 0), the end of the closing segment.
        assert_eq!(rect.nodes[0].pos, Point::new(0.0, 40.0));
        assert!(rect.nodes[0].is_forced());
        assert_eq!(rect.nodes[4].pos, Point::new(0.0, 100.0));
        assert!((rect.length(ArcPrecision::Exact) - 400.0).abs() < 1e-9);
    }
}
