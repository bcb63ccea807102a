//! Constant-width stroking of contours.
//!
//! The offsetting itself is delegated to a [`StrokeEngine`]. This module
//! only marshals contours into flat point lists, hands them to the engine,
//! and turns the results back into closed contours.

use kurbo::{Affine, BezPath, Shape, Stroke, StrokeOpts};

use crate::config::{Cap, Join, StrokeParams};
use crate::contour::{Contour, Node, NodeKind};
use crate::error::EffectError;
use crate::geom::Segment;

/// Point type in the engine's wire format (UFO conventions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    /// First point of an open contour.
    Move,
    Line,
    Curve,
    OffCurve,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    pub kind: PointKind,
}

impl StrokePoint {
    fn to_node(self) -> Node {
        let kind = match self.kind {
            PointKind::Move | PointKind::Line => NodeKind::Line,
            PointKind::Curve => NodeKind::Curve,
            PointKind::OffCurve => NodeKind::OffCurve,
        };
        Node::new((self.x, self.y).into(), kind)
    }
}

/// Everything the engine needs besides the contours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeRequest {
    /// Half the nib width.
    pub width: f64,
    /// Half the nib height.
    pub height: f64,
    /// Nib rotation in degrees.
    pub angle: f64,
    pub start_cap: Cap,
    pub end_cap: Cap,
    pub join: Join,
    pub remove_internal: bool,
    pub remove_external: bool,
    pub segmentwise: bool,
}

impl From<&StrokeParams> for StrokeRequest {
    fn from(params: &StrokeParams) -> Self {
        StrokeRequest {
            width: params.stroker_width / 2.0,
            height: params.height() / 2.0,
            angle: params.stroker_angle,
            start_cap: params.start_cap,
            end_cap: params.end_cap,
            join: params.join_type,
            remove_internal: params.remove_internal,
            remove_external: params.remove_external,
            segmentwise: params.segment_wise,
        }
    }
}

/// An external constant-width offsetting engine.
///
/// Receives one point list per contour and returns one point list per
/// closed output contour.
pub trait StrokeEngine: Sync {
    fn stroke(
        &self,
        contours: &[Vec<StrokePoint>],
        request: &StrokeRequest,
    ) -> Result<Vec<Vec<StrokePoint>>, EffectError>;
}

/// Flatten a contour into the engine's point format.
pub fn to_points(contour: &Contour) -> Vec<StrokePoint> {
    contour
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let kind = match node.kind {
                _ if i == 0 && !contour.closed => PointKind::Move,
                NodeKind::Line => PointKind::Line,
                NodeKind::Curve => PointKind::Curve,
                NodeKind::OffCurve => PointKind::OffCurve,
            };
            StrokePoint {
                x: node.pos.x,
                y: node.pos.y,
                kind,
            }
        })
        .collect()
}

/// Rebuild a contour from engine points; a leading `Move` means open.
pub fn from_points(points: &[StrokePoint]) -> Option<Contour> {
    let open = points.first()?.kind == PointKind::Move;
    let nodes = points.iter().map(|p| p.to_node()).collect();
    if open {
        Some(Contour::new(nodes, false))
    } else {
        Contour::closed_from(nodes)
    }
}

/// Stroke `contours` and return the closed outline contours.
pub fn stroke_contours(
    contours: &[Contour],
    params: &StrokeParams,
    engine: &dyn StrokeEngine,
) -> Result<Vec<Contour>, EffectError> {
    if contours.is_empty() {
        return Ok(Vec::new());
    }
    let request = StrokeRequest::from(params);
    let input: Vec<Vec<StrokePoint>> = contours.iter().map(to_points).collect();
    let output = engine.stroke(&input, &request)?;

    let mut result = Vec::with_capacity(output.len());
    for points in &output {
        let nodes: Vec<Node> = points.iter().map(|p| p.to_node()).collect();
        match Contour::closed_from(nodes) {
            Some(contour) => result.push(contour),
            None => tracing::debug!(points = points.len(), "dropping stroke result without on-curve points"),
        }
    }
    Ok(result)
}

/// Default engine built on kurbo's stroker.
///
/// An elliptical nib is stroked as a circle in a space where the ellipse
/// becomes round, then mapped back.
#[derive(Debug, Clone, Copy)]
pub struct KurboStroker {
    /// Curve fitting tolerance in font units.
    pub tolerance: f64,
}

impl Default for KurboStroker {
    fn default() -> Self {
        KurboStroker { tolerance: 0.1 }
    }
}

impl KurboStroker {
    fn nib(request: &StrokeRequest) -> Affine {
        Affine::rotate(request.angle.to_radians())
            * Affine::scale_non_uniform(1.0, request.height / request.width)
    }

    fn style(request: &StrokeRequest) -> Stroke {
        Stroke::new(request.width * 2.0)
            .with_start_cap(kurbo_cap(request.start_cap))
            .with_end_cap(kurbo_cap(request.end_cap))
            .with_join(kurbo_join(request.join))
    }

    fn stroke_path(&self, path: &BezPath, nib: Affine, style: &Stroke) -> Vec<BezPath> {
        let mut local = path.clone();
        local.apply_affine(nib.inverse());
        let mut stroked = kurbo::stroke(local.iter(), style, &StrokeOpts::default(), self.tolerance);
        stroked.apply_affine(nib);
        subpaths(&stroked)
    }
}

impl StrokeEngine for KurboStroker {
    fn stroke(
        &self,
        contours: &[Vec<StrokePoint>],
        request: &StrokeRequest,
    ) -> Result<Vec<Vec<StrokePoint>>, EffectError> {
        if !(request.width > 0.0 && request.height > 0.0)
            || !request.width.is_finite()
            || !request.height.is_finite()
        {
            return Err(EffectError::Stroke(format!(
                "nib must have a positive size, got {} x {}",
                request.width * 2.0,
                request.height * 2.0
            )));
        }
        let nib = Self::nib(request);
        let style = Self::style(request);

        let mut out = Vec::new();
        for points in contours {
            let Some(contour) = from_points(points) else {
                continue;
            };
            if request.segmentwise {
                for span in contour.segments() {
                    for piece in self.stroke_path(&segment_path(span.segment), nib, &style) {
                        out.extend(piece_points(&piece));
                    }
                }
                continue;
            }
            let mut pieces = self.stroke_path(&contour.to_bezpath(), nib, &style);
            if contour.closed && pieces.len() == 2 {
                remove_sides(&mut pieces, request);
            }
            out.extend(pieces.iter().filter_map(piece_points));
        }
        Ok(out)
    }
}

/// Drop the inner and/or outer offset of a stroked closed contour.
fn remove_sides(pieces: &mut Vec<BezPath>, request: &StrokeRequest) {
    if !(request.remove_internal || request.remove_external) {
        return;
    }
    pieces.sort_by(|a, b| a.area().abs().total_cmp(&b.area().abs()));
    if request.remove_external {
        pieces.pop();
    }
    if request.remove_internal && !pieces.is_empty() {
        pieces.remove(0);
    }
}

fn kurbo_cap(cap: Cap) -> kurbo::Cap {
    match cap {
        Cap::Round | Cap::Circle => kurbo::Cap::Round,
        Cap::Square => kurbo::Cap::Square,
    }
}

fn kurbo_join(join: Join) -> kurbo::Join {
    match join {
        Join::Round | Join::Circle => kurbo::Join::Round,
        Join::Bevel => kurbo::Join::Bevel,
        Join::Mitre => kurbo::Join::Miter,
    }
}

fn segment_path(segment: Segment) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(segment.start());
    match segment {
        Segment::Line(l) => path.line_to(l.p1),
        Segment::Cubic(c) => path.curve_to(c.p1, c.p2, c.p3),
    }
    path
}

/// Split a path at each `MoveTo`.
fn subpaths(path: &BezPath) -> Vec<BezPath> {
    let mut out: Vec<BezPath> = Vec::new();
    for el in path.elements() {
        if matches!(el, kurbo::PathEl::MoveTo(_)) || out.is_empty() {
            out.push(BezPath::new());
        }
        if let Some(current) = out.last_mut() {
            current.push(*el);
        }
    }
    out.retain(|p| p.elements().len() > 1);
    out
}

fn piece_points(piece: &BezPath) -> Option<Vec<StrokePoint>> {
    let mut contour = Contour::from_bezpath(piece)?;
    contour.closed = true;
    Some(to_points(&contour))
}
