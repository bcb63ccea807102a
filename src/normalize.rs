//! Flatten nested component references into concrete contours.

use kurbo::Affine;

use crate::contour::Contour;
use crate::error::EffectError;

/// Deepest component nesting accepted before the source is considered broken.
pub const MAX_REFERENCE_DEPTH: usize = 32;

/// A reference to another glyph's shapes, placed with an affine transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub base: String,
    pub transform: Affine,
}

/// One entry of a glyph layer: a concrete contour or a component.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Contour(Contour),
    Reference(Reference),
}

/// Resolves component base names to the shapes they draw.
pub trait ShapeSource {
    fn shapes(&self, base: &str) -> Option<&[Shape]>;
}

/// A source with nothing to resolve; any reference is reported missing.
pub struct NoReferences;

impl ShapeSource for NoReferences {
    fn shapes(&self, _base: &str) -> Option<&[Shape]> {
        None
    }
}

impl ShapeSource for std::collections::HashMap<String, Vec<Shape>> {
    fn shapes(&self, base: &str) -> Option<&[Shape]> {
        self.get(base).map(Vec::as_slice)
    }
}

/// Decompose `shapes` into a flat list of contours with transforms applied.
///
/// Every contour is an independent copy: forcing markers travel with the
/// copy, so marking a decomposed node never touches the source glyph.
pub fn decompose(shapes: &[Shape], source: &dyn ShapeSource) -> Result<Vec<Contour>, EffectError> {
    let mut out = Vec::new();
    decompose_into(shapes, source, Affine::IDENTITY, 0, &mut out)?;
    Ok(out)
}

fn decompose_into(
    shapes: &[Shape],
    source: &dyn ShapeSource,
    ctm: Affine,
    depth: usize,
    out: &mut Vec<Contour>,
) -> Result<(), EffectError> {
    for shape in shapes {
        match shape {
            Shape::Contour(contour) => {
                let mut copy = contour.clone();
                copy.transform(ctm);
                out.push(copy);
            }
            Shape::Reference(reference) => {
                if depth >= MAX_REFERENCE_DEPTH {
                    return Err(EffectError::ReferenceDepth {
                        base: reference.base.clone(),
                        depth: MAX_REFERENCE_DEPTH,
                    });
                }
                let inner = source
                    .shapes(&reference.base)
                    .ok_or_else(|| EffectError::MissingReference(reference.base.clone()))?;
                // The component's own transform applies first, then the
                // transform of whatever placed this glyph.
                let their_ctm = ctm * reference.transform;
                decompose_into(inner, source, their_ctm, depth + 1, out)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use kurbo::{Point, Vec2};

    use super::*;
    use crate::contour::{Forcing, Node, NodeKind};

    fn bar() -> Contour {
        Contour::new(
            vec![
                Node::new(Point::new(0.0, 0.0), NodeKind::Line).forced(),
                Node::new(Point::new(10.0, 0.0), NodeKind::Line),
            ],
            false,
        )
    }

    #[test]
    fn identity_copy_is_equal_but_independent() {
        let shapes = vec![Shape::Contour(bar())];
        let mut flat = decompose(&shapes, &NoReferences).expect("no references");
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0], bar());
        flat[0].nodes[1].force_locally();
        let Shape::Contour(original) = &shapes[0] else {
            unreachable!()
        };
        assert_eq!(original.nodes[1].forcing, Forcing::Unforced);
    }

    #[test]
    fn nested_transforms_apply_inner_first() {
        let mut glyphs = HashMap::new();
        glyphs.insert("bar".to_string(), vec![Shape::Contour(bar())]);
        glyphs.insert(
            "scaled".to_string(),
            vec![Shape::Reference(Reference {
                base: "bar".into(),
                transform: Affine::scale(2.0),
            })],
        );
        let shapes = vec![Shape::Reference(Reference {
            base: "scaled".into(),
            transform: Affine::translate(Vec2::new(100.0, 0.0)),
        })];
        let flat = decompose(&shapes, &glyphs).expect("references resolve");
        // scale then translate: 10 -> 20 -> 120
        assert_eq!(flat[0].nodes[1].pos, Point::new(120.0, 0.0));
        assert_eq!(flat[0].nodes[0].forcing, Forcing::Forced);
    }

    #[test]
    fn self_reference_hits_depth_limit() {
        let mut glyphs = HashMap::new();
        glyphs.insert(
            "loop".to_string(),
            vec![Shape::Reference(Reference {
                base: "loop".into(),
                transform: Affine::IDENTITY,
            })],
        );
        let err = decompose(glyphs["loop"].as_slice(), &glyphs).unwrap_err();
        assert!(matches!(err, EffectError::ReferenceDepth { .. }));
    }

    #[test]
    fn missing_base_is_reported() {
        let shapes = vec![Shape::Reference(Reference {
            base: "nope".into(),
            transform: Affine::IDENTITY,
        })];
        let err = decompose(&shapes, &NoReferences).unwrap_err();
        assert!(err.is_configuration(), "a dangling component is a font setup error");
        assert!(matches!(err, EffectError::MissingReference(name) if name == "nope"));
    }
}
