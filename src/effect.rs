//! Effects: what happens to each glyph layer.
//!
//! An effect reads the layer's decomposed contours and its resolved
//! parameters and emits new shapes. Several effects can run on the same
//! layer; their outputs are concatenated in order.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use kurbo::{Affine, Point, Vec2};

use crate::config::{DotParams, GuideHeight, GuidelineParams, ParamLayers, StartDotParams, StrokeParams};
use crate::contour::Contour;
use crate::dotter;
use crate::error::EffectError;
use crate::geom::{circle_contour, rect_contour};
use crate::normalize::{decompose, Reference, Shape, ShapeSource};
use crate::stroke::{stroke_contours, StrokeEngine};

/// Name of the glyph that dot components point at.
pub const DOT_GLYPH: &str = "_dot";

/// `contourSource` value meaning "the layer itself".
pub const DEFAULT_SOURCE: &str = "<Default>";

/// Effects produce the same kinds of shapes glyphs are made of.
pub type OutputShape = Shape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Replace outlines with evenly spaced dots.
    Dotter,
    /// Replace outlines with a constant-width stroke.
    Stroker,
    /// Horizontal bars at font metric heights.
    Guidelines,
    /// A dot where each contour starts.
    StartDot,
    /// Keep the original outlines.
    Copy,
}

impl Effect {
    pub const ALL: [Effect; 5] = [
        Effect::Copy,
        Effect::Stroker,
        Effect::Dotter,
        Effect::Guidelines,
        Effect::StartDot,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Effect::Dotter => "Dotter",
            Effect::Stroker => "Stroker",
            Effect::Guidelines => "Guidelines",
            Effect::StartDot => "StartDot",
            Effect::Copy => "Copy",
        }
    }

    /// Parse every parameter this effect reads, without touching geometry.
    pub fn validate(self, params: &ParamLayers) -> Result<(), EffectError> {
        match self {
            Effect::Dotter => params.resolve::<DotParams>().map(drop),
            Effect::Stroker => params.resolve::<StrokeParams>().map(drop),
            Effect::Guidelines => params.resolve::<GuidelineParams>().map(drop),
            Effect::StartDot => params.resolve::<StartDotParams>().map(drop),
            Effect::Copy => Ok(()),
        }
    }

    /// One-line summary such as `Dotter(dotSize=15; dotSpacing=15)`.
    pub fn describe(self, params: &ParamLayers) -> String {
        let detail = match self {
            Effect::Dotter => params
                .resolve::<DotParams>()
                .map(|p| format!("dotSize={}; dotSpacing={}", p.dot_size, p.dot_spacing)),
            Effect::Stroker => params
                .resolve::<StrokeParams>()
                .map(|p| format!("strokerWidth={}", p.stroker_width)),
            Effect::StartDot => params
                .resolve::<StartDotParams>()
                .map(|p| format!("startDotSize={}", p.start_dot_size)),
            Effect::Guidelines | Effect::Copy => Ok(String::new()),
        };
        match detail {
            Ok(detail) => format!("{}({detail})", self.name()),
            Err(err) => format!("{}(<{err}>)", self.name()),
        }
    }

    /// Run this effect on one layer.
    ///
    /// `contours` are the layer's decomposed outlines, shared by every
    /// effect in the run; effects that modify contours work on a copy.
    pub fn process(
        self,
        input: &LayerInput<'_>,
        contours: &[Contour],
        ctx: &EffectContext<'_>,
    ) -> Result<Vec<OutputShape>, EffectError> {
        match self {
            Effect::Dotter => dot_layer(input, contours, ctx),
            Effect::Stroker => {
                let params: StrokeParams = input.params.resolve()?;
                let stroked = stroke_contours(contours, &params, ctx.engine)?;
                Ok(stroked.into_iter().map(Shape::Contour).collect())
            }
            Effect::Guidelines => guidelines(input),
            Effect::StartDot => {
                let params: StartDotParams = input.params.resolve()?;
                Ok(contours
                    .iter()
                    .filter_map(|c| c.walk().first().map(|n| n.pos))
                    .map(|start| Shape::Contour(circle_contour(start, params.start_dot_size / 2.0)))
                    .collect())
            }
            Effect::Copy => {
                if input.copy_disabled {
                    return Ok(Vec::new());
                }
                Ok(contours.iter().cloned().map(Shape::Contour).collect())
            }
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Effect {
    type Err = EffectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Effect::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| EffectError::UnknownEffect(s.to_string()))
    }
}

/// Vertical font metrics used by guidelines. The baseline is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub ascender: Option<f64>,
    pub descender: Option<f64>,
    pub x_height: Option<f64>,
    pub cap_height: Option<f64>,
}

impl Metrics {
    /// Look up a metric by name, ignoring case, spaces, hyphens and underscores.
    pub fn get(&self, name: &str) -> Option<f64> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "ascender" => self.ascender,
            "descender" => self.descender,
            "xheight" => self.x_height,
            "capheight" => self.cap_height,
            "baseline" => Some(0.0),
            _ => None,
        }
    }
}

/// Everything an effect may read about one glyph layer.
pub struct LayerInput<'a> {
    pub glyph: &'a str,
    /// Advance width.
    pub width: f64,
    pub shapes: &'a [Shape],
    /// Other layers of the same glyph, by layer name.
    pub siblings: &'a HashMap<String, Vec<Shape>>,
    /// Resolves component references.
    pub source: &'a dyn ShapeSource,
    pub metrics: Metrics,
    pub params: ParamLayers,
    /// The glyph asked for its outlines not to be copied.
    pub copy_disabled: bool,
}

/// Run-wide settings shared by every layer.
pub struct EffectContext<'a> {
    /// Draw dots as circles even when an instance is active.
    pub preview: bool,
    /// An instance is active, so dots become `_dot` components.
    pub has_instance: bool,
    /// Size the `_dot` glyph is drawn at.
    pub component_dot_size: f64,
    pub engine: &'a dyn StrokeEngine,
}

/// Decompose the layer once and run every effect over it.
pub fn transform_layer(
    input: &LayerInput<'_>,
    effects: &[Effect],
    ctx: &EffectContext<'_>,
) -> Result<Vec<OutputShape>, EffectError> {
    let contours = decompose(input.shapes, input.source)?;
    let mut out = Vec::new();
    for effect in effects {
        let shapes = effect.process(input, &contours, ctx)?;
        tracing::debug!(glyph = input.glyph, %effect, shapes = shapes.len(), "effect done");
        out.extend(shapes);
    }
    Ok(out)
}

fn dot_layer(
    input: &LayerInput<'_>,
    contours: &[Contour],
    ctx: &EffectContext<'_>,
) -> Result<Vec<OutputShape>, EffectError> {
    if input.glyph == DOT_GLYPH {
        return Ok(contours.iter().cloned().map(Shape::Contour).collect());
    }
    let params: DotParams = input.params.resolve()?;

    let source = params
        .contour_source
        .as_deref()
        .filter(|name| *name != DEFAULT_SOURCE)
        .and_then(|name| {
            let found = input.siblings.get(name);
            if found.is_none() {
                tracing::debug!(glyph = input.glyph, layer = name, "contour source not found, using the layer itself");
            }
            found
        });
    let mut working = match source {
        Some(shapes) => decompose(shapes, input.source)?,
        None => contours.to_vec(),
    };

    let centers = dotter::dot_contours(&mut working, &params)?;
    tracing::debug!(glyph = input.glyph, dots = centers.len(), "placed dots");

    if ctx.preview || !ctx.has_instance {
        return Ok(centers
            .into_iter()
            .map(|c| Shape::Contour(circle_contour(c, params.dot_size / 2.0)))
            .collect());
    }
    Ok(centers
        .into_iter()
        .map(|c| Shape::Reference(dot_reference(c, params.dot_size, ctx.component_dot_size)))
        .collect())
}

/// A `_dot` component at `center`, scaled when this layer's dot size differs
/// from the size the `_dot` glyph is drawn at.
fn dot_reference(center: Point, dot_size: f64, component_size: f64) -> Reference {
    let offset = Vec2::new(center.x.round(), center.y.round());
    let mut transform = Affine::translate(offset);
    if component_size > 0.0 && dot_size != component_size {
        transform = transform * Affine::scale(dot_size / component_size);
    }
    Reference {
        base: DOT_GLYPH.to_string(),
        transform,
    }
}

fn guidelines(input: &LayerInput<'_>) -> Result<Vec<OutputShape>, EffectError> {
    let params: GuidelineParams = input.params.resolve()?;
    let overlap = params.guideline_overlap;
    let mut out = Vec::with_capacity(params.guidelines.len());
    for guideline in &params.guidelines {
        let height = match &guideline.height {
            GuideHeight::Value(v) => Some(*v),
            GuideHeight::Metric(name) => input.metrics.get(name).or_else(|| name.trim().parse().ok()),
        };
        let Some(height) = height else {
            tracing::debug!(glyph = input.glyph, height = ?guideline.height, "skipping guideline");
            continue;
        };
        out.push(Shape::Contour(rect_contour(
            Point::new(-overlap, height),
            Point::new(input.width + overlap, height + guideline.thickness),
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::*;
    use crate::contour::{Node, NodeKind};
    use crate::normalize::NoReferences;
    use crate::stroke::KurboStroker;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    fn line_shape(x0: f64, y0: f64, x1: f64, y1: f64) -> Shape {
        Shape::Contour(Contour::new(
            vec![
                Node::new(Point::new(x0, y0), NodeKind::Line),
                Node::new(Point::new(x1, y1), NodeKind::Line),
            ],
            false,
        ))
    }

    struct Fixture {
        shapes: Vec<Shape>,
        siblings: HashMap<String, Vec<Shape>>,
    }

    impl Fixture {
        fn new(shapes: Vec<Shape>) -> Self {
            Fixture {
                shapes,
                siblings: HashMap::new(),
            }
        }

        fn input(&self, glyph: &'static str, caller: Value) -> LayerInput<'_> {
            LayerInput {
                glyph,
                width: 500.0,
                shapes: &self.shapes,
                siblings: &self.siblings,
                source: &NoReferences,
                metrics: Metrics {
                    ascender: Some(750.0),
                    descender: Some(-250.0),
                    x_height: Some(500.0),
                    cap_height: Some(700.0),
                },
                params: ParamLayers {
                    caller: map(caller),
                    ..ParamLayers::default()
                },
                copy_disabled: false,
            }
        }
    }

    fn context(engine: &KurboStroker, has_instance: bool) -> EffectContext<'_> {
        EffectContext {
            preview: false,
            has_instance,
            component_dot_size: 10.0,
            engine,
        }
    }

    fn run(effect: Effect, input: &LayerInput<'_>, ctx: &EffectContext<'_>) -> Vec<OutputShape> {
        transform_layer(input, &[effect], ctx).expect("effect succeeds")
    }

    #[test]
    fn effect_names_round_trip() {
        for effect in Effect::ALL {
            assert_eq!(effect.name().parse::<Effect>().ok(), Some(effect));
        }
        assert_eq!("startdot".parse::<Effect>().ok(), Some(Effect::StartDot));
        assert!(matches!("Wobble".parse::<Effect>(), Err(EffectError::UnknownEffect(_))));
    }

    #[test]
    fn dotter_draws_circles_without_an_instance() {
        let fixture = Fixture::new(vec![line_shape(0.0, 0.0, 100.0, 0.0)]);
        let input = fixture.input("a", json!({ "dotSize": 10, "dotSpacing": 10 }));
        let engine = KurboStroker::default();
        let out = run(Effect::Dotter, &input, &context(&engine, false));
        assert_eq!(out.len(), 6);
        for shape in &out {
            let Shape::Contour(c) = shape else {
                panic!("expected a circle, got {shape:?}");
            };
            assert_eq!(c.nodes.len(), 24);
        }
    }

    #[test]
    fn dotter_emits_scaled_components_for_an_instance() {
        let fixture = Fixture::new(vec![line_shape(0.4, 0.0, 200.4, 0.0)]);
        let input = fixture.input("a", json!({ "dotSize": 20, "dotSpacing": 20 }));
        let engine = KurboStroker::default();
        let out = run(Effect::Dotter, &input, &context(&engine, true));
        // 200 / 40 = 5 intervals exactly.
        assert_eq!(out.len(), 6);
        let Shape::Reference(first) = &out[0] else {
            panic!("expected a component, got {:?}", out[0]);
        };
        assert_eq!(first.base, DOT_GLYPH);
        assert_eq!(first.transform.as_coeffs(), [2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let Shape::Reference(second) = &out[1] else {
            panic!("expected a component, got {:?}", out[1]);
        };
        assert_eq!(second.transform.translation(), Vec2::new(200.0, 0.0));
    }

    #[test]
    fn preview_forces_circles() {
        let fixture = Fixture::new(vec![line_shape(0.0, 0.0, 100.0, 0.0)]);
        let input = fixture.input("a", json!({}));
        let engine = KurboStroker::default();
        let ctx = EffectContext {
            preview: true,
            ..context(&engine, true)
        };
        let out = run(Effect::Dotter, &input, &ctx);
        assert!(out.iter().all(|s| matches!(s, Shape::Contour(_))));
    }

    #[test]
    fn dot_glyph_is_left_alone() {
        let fixture = Fixture::new(vec![line_shape(0.0, 0.0, 100.0, 0.0)]);
        let input = fixture.input(DOT_GLYPH, json!({}));
        let engine = KurboStroker::default();
        let out = run(Effect::Dotter, &input, &context(&engine, true));
        assert_eq!(out, fixture.shapes);
    }

    #[test]
    fn contour_source_reads_a_sibling_layer() {
        let mut fixture = Fixture::new(vec![line_shape(0.0, 0.0, 1000.0, 0.0)]);
        fixture
            .siblings
            .insert("skeleton".into(), vec![line_shape(0.0, 0.0, 0.0, 30.0)]);
        let input = fixture.input("a", json!({ "contourSource": "skeleton" }));
        let engine = KurboStroker::default();
        let out = run(Effect::Dotter, &input, &context(&engine, false));
        // 30 units at a step of 30: just the two endpoints.
        assert_eq!(out.len(), 2);

        let input = fixture.input("a", json!({ "contourSource": "<Default>" }));
        assert!(run(Effect::Dotter, &input, &context(&engine, false)).len() > 2);
    }

    #[test]
    fn stroker_uses_the_engine() {
        let fixture = Fixture::new(vec![line_shape(0.0, 0.0, 100.0, 0.0)]);
        let input = fixture.input("a", json!({ "strokerWidth": 20 }));
        let engine = KurboStroker::default();
        let out = run(Effect::Stroker, &input, &context(&engine, false));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn stroker_rejects_bad_join_before_geometry() {
        let fixture = Fixture::new(vec![line_shape(0.0, 0.0, 100.0, 0.0)]);
        let input = fixture.input("a", json!({ "joinType": "zigzag" }));
        assert!(Effect::Stroker.validate(&input.params).is_err());
        let engine = KurboStroker::default();
        let err = transform_layer(&input, &[Effect::Stroker], &context(&engine, false)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn guidelines_resolve_metrics_and_numbers() {
        let fixture = Fixture::new(Vec::new());
        let input = fixture.input(
            "a",
            json!({
                "guidelineOverlap": 20,
                "guidelines": [
                    { "height": "x-Height", "thickness": 10 },
                    { "height": "BASELINE", "thickness": 5 },
                    { "height": "120", "thickness": 4 },
                    { "height": 300, "thickness": 2 },
                    { "height": "shoulder", "thickness": 10 }
                ]
            }),
        );
        let engine = KurboStroker::default();
        let out = run(Effect::Guidelines, &input, &context(&engine, false));
        let boxes: Vec<_> = out
            .iter()
            .filter_map(|s| match s {
                Shape::Contour(c) => c.bounds(),
                Shape::Reference(_) => None,
            })
            .collect();
        assert_eq!(boxes.len(), 4);
        assert_eq!((boxes[0].y0, boxes[0].y1), (500.0, 510.0));
        assert_eq!((boxes[0].x0, boxes[0].x1), (-20.0, 520.0));
        assert_eq!((boxes[1].y0, boxes[1].y1), (0.0, 5.0));
        assert_eq!((boxes[2].y0, boxes[2].y1), (120.0, 124.0));
        assert_eq!((boxes[3].y0, boxes[3].y1), (300.0, 302.0));
    }

    #[test]
    fn default_guidelines_use_four_metrics() {
        let fixture = Fixture::new(Vec::new());
        let input = fixture.input("a", json!({}));
        let engine = KurboStroker::default();
        assert_eq!(run(Effect::Guidelines, &input, &context(&engine, false)).len(), 4);
    }

    #[test]
    fn start_dot_marks_each_contour_start() {
        let fixture = Fixture::new(vec![
            line_shape(10.0, 20.0, 100.0, 20.0),
            line_shape(300.0, 0.0, 300.0, 100.0),
        ]);
        let input = fixture.input("a", json!({ "startDotSize": 40 }));
        let engine = KurboStroker::default();
        let out = run(Effect::StartDot, &input, &context(&engine, false));
        assert_eq!(out.len(), 2);
        let Shape::Contour(first) = &out[0] else {
            panic!("expected a circle");
        };
        let b = first.bounds().expect("circle has bounds");
        assert!((b.center().x - 10.0).abs() < 1e-6 && (b.center().y - 20.0).abs() < 1e-6, "{b:?}");
        assert!((b.width() - 40.0).abs() < 0.1, "{b:?}");
    }

    #[test]
    fn copy_passes_outlines_through_unless_disabled() {
        let fixture = Fixture::new(vec![line_shape(0.0, 0.0, 100.0, 0.0)]);
        let mut input = fixture.input("a", json!({}));
        let engine = KurboStroker::default();
        assert_eq!(run(Effect::Copy, &input, &context(&engine, false)), fixture.shapes);
        input.copy_disabled = true;
        assert!(run(Effect::Copy, &input, &context(&engine, false)).is_empty());
    }

    #[test]
    fn effects_are_concatenated_in_order() {
        let fixture = Fixture::new(vec![line_shape(0.0, 0.0, 100.0, 0.0)]);
        let input = fixture.input("a", json!({ "dotSize": 10, "dotSpacing": 10 }));
        let engine = KurboStroker::default();
        let out = transform_layer(&input, &[Effect::Copy, Effect::Dotter], &context(&engine, false))
            .expect("effects succeed");
        assert_eq!(out.len(), 7);
        assert_eq!(out[0], fixture.shapes[0]);
    }

    #[test]
    fn describe_lists_display_params() {
        let params = ParamLayers {
            caller: map(json!({ "dotSize": 12 })),
            ..ParamLayers::default()
        };
        assert_eq!(Effect::Dotter.describe(&params), "Dotter(dotSize=12; dotSpacing=15)");
        assert_eq!(Effect::Copy.describe(&params), "Copy()");
    }
}
