//! glyphdot: font glyph outlines → evenly spaced dots or constant-width strokes.
//!
//! Contours are measured by arc length, split at forced nodes and at
//! crossings with other contours, and dotted so that every forced node
//! carries a dot and the spacing between them stays within a tolerance band.
//! Strokes are delegated to a [`stroke::StrokeEngine`]; the bundled engine
//! strokes with kurbo using an elliptical nib.
//!
//! # Example
//!
//! ```
//! use glyphdot::{dot_contours, Contour, DotParams, Node, NodeKind};
//! use glyphdot::kurbo::Point;
//!
//! let line = Contour::new(
//!     vec![
//!         Node::new(Point::new(0.0, 0.0), NodeKind::Line),
//!         Node::new(Point::new(100.0, 0.0), NodeKind::Line),
//!     ],
//!     false,
//! );
//! let params = DotParams { dot_size: 10.0, dot_spacing: 10.0, ..DotParams::default() };
//! let centers = dot_contours(&mut [line], &params)?;
//! assert_eq!(centers.len(), 6);
//! # Ok::<(), glyphdot::EffectError>(())
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod contour;
pub mod dotter;
pub mod effect;
pub mod error;
pub mod geom;
pub mod intersect;
pub mod normalize;
pub mod stroke;

#[cfg(feature = "ufo")]
pub mod ufo;

// Re-export kurbo so callers build contours with the same version.
pub use kurbo;

pub use config::{DotParams, ParamLayers, StrokeParams};
pub use contour::{Contour, Node, NodeKind};
pub use dotter::dot_contours;
pub use effect::{transform_layer, Effect, EffectContext, LayerInput, Metrics};
pub use error::EffectError;
pub use normalize::{decompose, Reference, Shape, ShapeSource};
pub use stroke::{stroke_contours, KurboStroker, StrokeEngine};
