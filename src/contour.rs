//! Contours and nodes: the pipeline's own copy of a glyph outline.
//!
//! Node lists follow the font-editor convention: a closed contour is read
//! cyclically, the first segment running from the last node to the first
//! on-curve node. An open contour starts and ends on-curve.

use kurbo::{Affine, BezPath, CubicBez, Line, PathEl, Point, Rect};

use crate::geom::{ArcPrecision, Segment};

/// What a node contributes to the outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// On-curve point ending a straight segment.
    Line,
    /// On-curve point ending a cubic segment.
    Curve,
    /// Bezier control point.
    OffCurve,
}

impl NodeKind {
    pub fn is_on_curve(self) -> bool {
        !matches!(self, NodeKind::OffCurve)
    }
}

/// Whether a node must anchor a dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Forcing {
    #[default]
    Unforced,
    /// Persisted marker set by the user.
    Forced,
    /// Set during one run (e.g. at an intersection) and cleared afterwards.
    LocallyForced,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub pos: Point,
    pub kind: NodeKind,
    pub forcing: Forcing,
}

impl Node {
    pub fn new(pos: Point, kind: NodeKind) -> Self {
        Node {
            pos,
            kind,
            forcing: Forcing::Unforced,
        }
    }

    pub fn forced(mut self) -> Self {
        self.forcing = Forcing::Forced;
        self
    }

    pub fn is_forced(&self) -> bool {
        self.forcing != Forcing::Unforced
    }

    /// Mark as locally forced. A persisted `Forced` marker is left alone.
    pub fn force_locally(&mut self) {
        if self.forcing == Forcing::Unforced {
            self.forcing = Forcing::LocallyForced;
        }
    }
}

/// A segment together with the node indices it was read from.
///
/// `start` is the index of the on-curve node the segment leaves from;
/// `first..first + count` are the nodes after it, the last of which is the
/// segment's end point. The tail range never wraps around the node list.
#[derive(Debug, Clone, Copy)]
pub struct SegmentSpan {
    pub start: usize,
    pub first: usize,
    pub count: usize,
    pub segment: Segment,
}

impl SegmentSpan {
    pub fn end(&self) -> usize {
        self.first + self.count - 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub nodes: Vec<Node>,
    pub closed: bool,
}

impl Contour {
    pub fn new(nodes: Vec<Node>, closed: bool) -> Self {
        Contour { nodes, closed }
    }

    /// Build a closed contour, rotating the nodes so the last one is on-curve.
    ///
    /// Returns `None` if there is no on-curve node at all.
    pub fn closed_from(mut nodes: Vec<Node>) -> Option<Self> {
        let last_on = nodes.iter().rposition(|n| n.kind.is_on_curve())?;
        let shift = nodes.len() - 1 - last_on;
        nodes.rotate_right(shift);
        Some(Contour::new(nodes, true))
    }

    /// Segments with the node indices they cover.
    ///
    /// Stops early at a dangling control point (fewer than two off-curves
    /// followed by an on-curve node), which only malformed input produces.
    pub fn segments(&self) -> Vec<SegmentSpan> {
        let n = self.nodes.len();
        let mut spans = Vec::new();
        let mut idx = 0;
        while idx < n {
            let start = if idx == 0 { n - 1 } else { idx - 1 };
            let p0 = self.nodes[start].pos;
            if self.nodes[idx].kind == NodeKind::OffCurve {
                if idx + 2 >= n || self.nodes[idx + 1].kind != NodeKind::OffCurve {
                    break;
                }
                let cubic = CubicBez::new(
                    p0,
                    self.nodes[idx].pos,
                    self.nodes[idx + 1].pos,
                    self.nodes[idx + 2].pos,
                );
                spans.push(SegmentSpan {
                    start,
                    first: idx,
                    count: 3,
                    segment: Segment::Cubic(cubic),
                });
                idx += 3;
            } else {
                spans.push(SegmentSpan {
                    start,
                    first: idx,
                    count: 1,
                    segment: Segment::Line(Line::new(p0, self.nodes[idx].pos)),
                });
                idx += 1;
            }
        }
        if !self.closed && !spans.is_empty() {
            spans.remove(0);
        }
        spans
    }

    /// Nodes in traversal order from the start point to the end point.
    ///
    /// A closed contour starts (and ends) at its last node.
    pub fn walk(&self) -> Vec<Node> {
        match (self.closed, self.nodes.last()) {
            (true, Some(&last)) => {
                let mut walk = Vec::with_capacity(self.nodes.len() + 1);
                walk.push(last);
                walk.extend_from_slice(&self.nodes);
                walk
            }
            _ => self.nodes.clone(),
        }
    }

    pub fn length(&self, precision: ArcPrecision) -> f64 {
        self.segments()
            .iter()
            .map(|s| s.segment.arclen(precision))
            .sum()
    }

    /// Tight bounding box of the outline, `None` for a contour without segments.
    pub fn bounds(&self) -> Option<Rect> {
        self.segments()
            .iter()
            .map(|s| s.segment.bounding_box())
            .reduce(|a, b| a.union(b))
    }

    pub fn transform(&mut self, affine: Affine) {
        for node in &mut self.nodes {
            node.pos = affine * node.pos;
        }
    }

    /// Drop every run-local forcing marker, keeping persisted ones.
    pub fn clear_local_forcing(&mut self) {
        for node in &mut self.nodes {
            if node.forcing == Forcing::LocallyForced {
                node.forcing = Forcing::Unforced;
            }
        }
    }

    /// True if both contours have nodes at the same positions.
    pub fn same_outline(&self, other: &Contour) -> bool {
        self.closed == other.closed
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&other.nodes)
                .all(|(a, b)| a.pos == b.pos && a.kind == b.kind)
    }

    pub fn to_bezpath(&self) -> BezPath {
        let mut path = BezPath::new();
        let spans = self.segments();
        let Some(first) = spans.first() else {
            return path;
        };
        path.move_to(first.segment.start());
        for span in &spans {
            match span.segment {
                Segment::Line(l) => path.line_to(l.p1),
                Segment::Cubic(c) => path.curve_to(c.p1, c.p2, c.p3),
            }
        }
        if self.closed {
            path.close_path();
        }
        path
    }

    /// Convert one sub-path of a `BezPath` back into nodes.
    ///
    /// Quadratic segments are raised to cubics. A closing segment that returns
    /// to the start point is folded into the cyclic node list.
    pub fn from_bezpath(path: &BezPath) -> Option<Self> {
        let mut nodes = Vec::new();
        let mut first = None;
        let mut current = Point::ZERO;
        let mut closed = false;
        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => {
                    if first.is_some() {
                        break;
                    }
                    first = Some(p);
                    current = p;
                }
                PathEl::LineTo(p) => {
                    nodes.push(Node::new(p, NodeKind::Line));
                    current = p;
                }
                PathEl::QuadTo(a, p) => {
                    let cubic = kurbo::QuadBez::new(current, a, p).raise();
                    nodes.push(Node::new(cubic.p1, NodeKind::OffCurve));
                    nodes.push(Node::new(cubic.p2, NodeKind::OffCurve));
                    nodes.push(Node::new(p, NodeKind::Curve));
                    current = p;
                }
                PathEl::CurveTo(a, b, p) => {
                    nodes.push(Node::new(a, NodeKind::OffCurve));
                    nodes.push(Node::new(b, NodeKind::OffCurve));
                    nodes.push(Node::new(p, NodeKind::Curve));
                    current = p;
                }
                PathEl::ClosePath => closed = true,
            }
        }
        let first = first?;
        if !closed {
            nodes.insert(0, Node::new(first, NodeKind::Line));
            return Some(Contour::new(nodes, false));
        }
        // The explicit return to the start duplicates the implicit closing
        // segment of a cyclic node list.
        let returns_home = nodes
            .last()
            .is_some_and(|n| n.pos.distance(first) < 1e-9);
        if !returns_home {
            nodes.push(Node::new(first, NodeKind::Line));
        }
        Contour::closed_from(nodes)
    }
}
