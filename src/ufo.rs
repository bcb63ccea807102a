//! UFO fonts as the host object model.
//!
//! Settings live in the font and glyph libs under [`LIB_KEY`]:
//!
//! - `font.lib[LIB_KEY]["instances"][name]`: per-instance parameters,
//!   including the instance's `effects` list
//! - `glyph.lib[LIB_KEY]["forced"]`: `[contourIndex, pointIndex]` pairs
//! - `glyph.lib[LIB_KEY]["overrides"][instance]`: per-glyph parameters
//! - `glyph.lib[LIB_KEY]["disableCopy"]`: keep the Copy effect off this glyph

use std::collections::{BTreeMap, HashMap};

use kurbo::{Affine, BezPath, Point};
use norad::{AffineTransform, ContourPoint, Font, Glyph, Layer, Name, PointType};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{DotParams, ParamLayers};
use crate::contour::{Contour, Node, NodeKind};
use crate::effect::{transform_layer, Effect, EffectContext, LayerInput, Metrics, DOT_GLYPH};
use crate::error::EffectError;
use crate::geom::circle_contour;
use crate::normalize::{Reference, Shape};
use crate::stroke::StrokeEngine;

/// Root key of everything this crate stores in UFO libs.
pub const LIB_KEY: &str = "org.glyphdot";

/// Font-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSettings {
    pub instances: BTreeMap<String, Map<String, Value>>,
}

/// Glyph-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlyphSettings {
    /// Points marked by the user as dot anchors.
    pub forced: Vec<(usize, usize)>,
    /// Parameter overrides, by instance name.
    pub overrides: BTreeMap<String, Map<String, Value>>,
    pub disable_copy: bool,
}

impl FontSettings {
    pub fn load(font: &Font) -> Result<Self, EffectError> {
        read_lib(&font.lib)
    }

    pub fn store(&self, font: &mut Font) -> Result<(), EffectError> {
        font.lib.insert(LIB_KEY.to_string(), plist::to_value(self)?);
        Ok(())
    }
}

impl GlyphSettings {
    pub fn load(glyph: &Glyph) -> Result<Self, EffectError> {
        read_lib(&glyph.lib)
    }

    pub fn store(&self, glyph: &mut Glyph) -> Result<(), EffectError> {
        glyph.lib.insert(LIB_KEY.to_string(), plist::to_value(self)?);
        Ok(())
    }
}

fn read_lib<T: DeserializeOwned + Default>(lib: &plist::Dictionary) -> Result<T, EffectError> {
    match lib.get(LIB_KEY) {
        Some(value) => Ok(plist::from_value(value)?),
        None => Ok(T::default()),
    }
}

/// A named parameter set stored in the font.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub name: String,
    pub params: Map<String, Value>,
}

/// Look up an instance by name; `Ok(None)` if the font has no such instance.
pub fn find_instance(font: &Font, name: &str) -> Result<Option<Instance>, EffectError> {
    let settings = FontSettings::load(font)?;
    Ok(settings.instances.get(name).map(|params| Instance {
        name: name.to_string(),
        params: params.clone(),
    }))
}

/// Effects to run: the caller's `effects` entry wins over the instance's.
///
/// Either may be a single name or a list of names.
pub fn effects_for(
    caller: &Map<String, Value>,
    instance: Option<&Instance>,
) -> Result<Vec<Effect>, EffectError> {
    let listed = caller
        .get("effects")
        .filter(|v| !is_empty_value(v))
        .or_else(|| instance.and_then(|i| i.params.get("effects")));
    let names: Vec<&str> = match listed {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| EffectError::UnknownEffect(v.to_string()))
            })
            .collect::<Result<_, _>>()?,
        Some(other) => return Err(EffectError::UnknownEffect(other.to_string())),
    };
    names.into_iter().map(str::parse).collect()
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

// ── Glyph ↔ shapes ───────────────────────────────────────────────

/// Read a glyph's contours and components, applying its forced flags.
pub fn read_shapes(glyph: &Glyph) -> Result<Vec<Shape>, EffectError> {
    let settings = GlyphSettings::load(glyph)?;
    let mut shapes = Vec::with_capacity(glyph.contours.len() + glyph.components.len());
    for (ci, contour) in glyph.contours.iter().enumerate() {
        let forced: Vec<usize> = settings
            .forced
            .iter()
            .filter(|(c, _)| *c == ci)
            .map(|(_, p)| *p)
            .collect();
        match read_contour(&contour.points, &forced) {
            Some(c) => shapes.push(Shape::Contour(c)),
            None => tracing::debug!(glyph = %glyph.name(), contour = ci, "skipping contour without on-curve points"),
        }
    }
    for component in &glyph.components {
        let t = &component.transform;
        shapes.push(Shape::Reference(Reference {
            base: component.base.to_string(),
            transform: Affine::new([t.x_scale, t.xy_scale, t.yx_scale, t.y_scale, t.x_offset, t.y_offset]),
        }));
    }
    Ok(shapes)
}

fn read_contour(points: &[ContourPoint], forced: &[usize]) -> Option<Contour> {
    if points.iter().any(|p| p.typ == PointType::QCurve) {
        if !forced.is_empty() {
            tracing::debug!("forced flags on quadratic contours are ignored");
        }
        return quadratic_contour(points);
    }
    let open = points.first()?.typ == PointType::Move;
    let nodes: Vec<Node> = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let kind = match p.typ {
                PointType::OffCurve => NodeKind::OffCurve,
                PointType::Curve | PointType::QCurve => NodeKind::Curve,
                PointType::Move | PointType::Line => NodeKind::Line,
            };
            let node = Node::new(Point::new(p.x, p.y), kind);
            if forced.contains(&i) {
                node.forced()
            } else {
                node
            }
        })
        .collect();
    if open {
        Some(Contour::new(nodes, false))
    } else {
        Contour::closed_from(nodes)
    }
}

/// Quadratic contours are raised to cubics, expanding implied on-curve points.
fn quadratic_contour(points: &[ContourPoint]) -> Option<Contour> {
    let at = |p: &ContourPoint| Point::new(p.x, p.y);
    let open = points.first()?.typ == PointType::Move;
    let last_on = points.iter().rposition(|p| p.typ != PointType::OffCurve)?;
    let (start, body): (&ContourPoint, Vec<&ContourPoint>) = if open {
        (&points[0], points[1..].iter().collect())
    } else {
        let body = points[last_on + 1..].iter().chain(&points[..=last_on]).collect();
        (&points[last_on], body)
    };

    let mut path = BezPath::new();
    path.move_to(at(start));
    let mut pending: Vec<Point> = Vec::new();
    for p in body {
        let end = at(p);
        match p.typ {
            PointType::OffCurve => {
                pending.push(end);
                continue;
            }
            PointType::QCurve => {
                for (i, &ctrl) in pending.iter().enumerate() {
                    let to = pending.get(i + 1).map_or(end, |next| ctrl.midpoint(*next));
                    path.quad_to(ctrl, to);
                }
                if pending.is_empty() {
                    path.line_to(end);
                }
            }
            PointType::Curve => match pending.as_slice() {
                [] => path.line_to(end),
                [c] => path.quad_to(*c, end),
                [a, b] => path.curve_to(*a, *b, end),
                _ => return None,
            },
            PointType::Move | PointType::Line => path.line_to(end),
        }
        pending.clear();
    }
    if !open {
        path.close_path();
    }
    Contour::from_bezpath(&path)
}

fn write_contour(contour: &Contour) -> norad::Contour {
    let points = contour
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let typ = match node.kind {
                _ if i == 0 && !contour.closed => PointType::Move,
                NodeKind::Line => PointType::Line,
                NodeKind::Curve => PointType::Curve,
                NodeKind::OffCurve => PointType::OffCurve,
            };
            ContourPoint::new(node.pos.x, node.pos.y, typ, false, None, None, None)
        })
        .collect();
    norad::Contour::new(points, None, None)
}

/// Replace a glyph's outline with `shapes`.
pub fn write_shapes(glyph: &mut Glyph, shapes: &[Shape]) -> Result<(), EffectError> {
    let mut contours = Vec::new();
    let mut components = Vec::new();
    for shape in shapes {
        match shape {
            Shape::Contour(c) => contours.push(write_contour(c)),
            Shape::Reference(r) => {
                let [x_scale, xy_scale, yx_scale, y_scale, x_offset, y_offset] = r.transform.as_coeffs();
                let transform = AffineTransform {
                    x_scale,
                    xy_scale,
                    yx_scale,
                    y_scale,
                    x_offset,
                    y_offset,
                };
                components.push(norad::Component::new(Name::new(&r.base)?, transform, None, None));
            }
        }
    }
    glyph.contours = contours;
    glyph.components = components;
    Ok(())
}

// ── Batch ────────────────────────────────────────────────────────

/// Settings for one [`transform_font`] run.
pub struct TransformOptions<'a> {
    pub instance: Option<&'a Instance>,
    /// Caller overrides (command line or JSON config).
    pub caller: Map<String, Value>,
    /// Draw dots as circles instead of `_dot` components.
    pub preview: bool,
    pub engine: &'a dyn StrokeEngine,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Glyphs whose outline was replaced.
    pub transformed: usize,
    /// Glyphs left as they were because the effects produced nothing.
    pub unchanged: usize,
    /// Glyphs that failed, with the reason.
    pub failures: Vec<(String, EffectError)>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

fn metrics(font: &Font) -> Metrics {
    let info = &font.font_info;
    Metrics {
        ascender: info.ascender,
        descender: info.descender,
        x_height: info.x_height,
        cap_height: info.cap_height,
    }
}

/// Run `effects` over every glyph of the default layer.
///
/// Parameters are validated first; a configuration error aborts the run
/// before any glyph is touched. After that, a failing glyph is recorded in
/// the report and left unchanged while the rest of the batch continues.
pub fn transform_font(
    font: &mut Font,
    effects: &[Effect],
    options: &TransformOptions<'_>,
) -> Result<BatchReport, EffectError> {
    let instance_params = options.instance.map(|i| i.params.clone()).unwrap_or_default();
    let base = ParamLayers {
        layer: Map::new(),
        instance: instance_params,
        caller: options.caller.clone(),
    };
    for effect in effects {
        effect.validate(&base)?;
    }
    let component_dot_size = base.resolve::<DotParams>()?.dot_size;
    let instance_name = options.instance.map(|i| i.name.as_str());

    let mut report = BatchReport::default();
    let mut library: HashMap<String, Vec<Shape>> = HashMap::new();
    for glyph in font.default_layer().iter() {
        match read_shapes(glyph) {
            Ok(shapes) => {
                library.insert(glyph.name().to_string(), shapes);
            }
            Err(err) => report.failures.push((glyph.name().to_string(), err)),
        }
    }

    let ctx = EffectContext {
        preview: options.preview,
        has_instance: options.instance.is_some(),
        component_dot_size,
        engine: options.engine,
    };
    let font_metrics = metrics(font);
    let default_layer = font.default_layer();
    let other_layers: Vec<&Layer> = font
        .iter_layers()
        .filter(|layer| layer.name() != default_layer.name())
        .collect();
    let mut names: Vec<&String> = library.keys().collect();
    names.sort();

    let results: Vec<(String, Result<Vec<Shape>, EffectError>)> = names
        .par_iter()
        .map(|&name| {
            let result = (|| -> Result<Vec<Shape>, EffectError> {
                let glyph = default_layer
                    .get_glyph(name.as_str())
                    .ok_or_else(|| EffectError::MissingReference(name.clone()))?;
                let settings = GlyphSettings::load(glyph)?;
                let layer_params = instance_name
                    .and_then(|i| settings.overrides.get(i).cloned())
                    .unwrap_or_default();
                let siblings = sibling_shapes(&other_layers, name);
                let input = LayerInput {
                    glyph: name,
                    width: glyph.width,
                    shapes: library.get(name).map_or(&[][..], Vec::as_slice),
                    siblings: &siblings,
                    source: &library,
                    metrics: font_metrics,
                    params: ParamLayers {
                        layer: layer_params,
                        ..base.clone()
                    },
                    copy_disabled: settings.disable_copy,
                };
                transform_layer(&input, effects, &ctx)
            })();
            (name.clone(), result)
        })
        .collect();

    let layer = font.default_layer_mut();
    for (name, result) in results {
        match result {
            Ok(shapes) if shapes.is_empty() => report.unchanged += 1,
            Ok(shapes) => match layer.get_glyph_mut(&name) {
                Some(glyph) => match write_shapes(glyph, &shapes) {
                    Ok(()) => report.transformed += 1,
                    Err(err) => report.failures.push((name, err)),
                },
                None => report.failures.push((name.clone(), EffectError::MissingReference(name))),
            },
            Err(err) => {
                tracing::warn!(glyph = %name, %err, "glyph failed");
                report.failures.push((name, err));
            }
        }
    }

    if effects.contains(&Effect::Dotter) {
        install_dot_glyph(font, component_dot_size);
    }
    tracing::info!(
        transformed = report.transformed,
        unchanged = report.unchanged,
        failed = report.failures.len(),
        "font transformed"
    );
    Ok(report)
}

/// Shapes of `glyph` in each of `layers`, keyed by layer name.
fn sibling_shapes(layers: &[&Layer], glyph: &str) -> HashMap<String, Vec<Shape>> {
    layers
        .iter()
        .filter_map(|layer| {
            let g = layer.get_glyph(glyph)?;
            match read_shapes(g) {
                Ok(shapes) => Some((layer.name().to_string(), shapes)),
                Err(err) => {
                    tracing::debug!(glyph, layer = %layer.name(), %err, "unreadable sibling layer");
                    None
                }
            }
        })
        .collect()
}

/// Put a circle of `dot_size` at the origin of the `_dot` glyph.
fn install_dot_glyph(font: &mut Font, dot_size: f64) {
    let circle = write_contour(&circle_contour(Point::ZERO, dot_size / 2.0));
    let layer = font.default_layer_mut();
    match layer.get_glyph_mut(DOT_GLYPH) {
        Some(glyph) => {
            glyph.contours = vec![circle];
            glyph.components.clear();
        }
        None => {
            let mut glyph = Glyph::new(DOT_GLYPH);
            glyph.contours.push(circle);
            layer.insert_glyph(glyph);
        }
    }
}
