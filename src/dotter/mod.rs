//! Dot placement pipeline: contours → evenly spaced dot centres.
//!
//! 1. Optional intersection pass marks crossings as forced
//! 2. Contours are split into runs between forced nodes
//! 3. Each run gets an arc-length table and a fitted step
//! 4. All centres are merged and filtered for overlaps

pub mod overlap;
pub mod solver;
pub mod split;
pub mod table;

use kurbo::Point;

use crate::config::DotParams;
use crate::contour::Contour;
use crate::error::EffectError;
use crate::geom::{ArcPrecision, Segment};
use crate::intersect;

pub use overlap::filter_overlaps;
pub use solver::{place_centers, Center, StepPlan};
pub use split::{split_at_forced, ForcedSplit};
pub use table::ArcLengthTable;

/// Centres for every run of every contour, in contour order.
///
/// Zero-length runs are skipped; they cannot carry dots.
pub fn find_centers(contours: &[Contour], params: &DotParams, precision: ArcPrecision) -> Vec<Center> {
    let mut centers = Vec::new();
    for contour in contours {
        for run in split_at_forced(contour) {
            let segments: Vec<Segment> = run.segments().iter().map(|s| s.segment).collect();
            match ArcLengthTable::build(&segments, precision) {
                Some(table) => centers.extend(place_centers(&table, params)),
                None => tracing::debug!(nodes = run.nodes.len(), "skipping zero-length run"),
            }
        }
    }
    centers
}

/// Run the whole dot pipeline over one layer's decomposed contours.
///
/// Contours are modified in place by the intersection pass; run-local
/// forcing is cleared again before returning.
pub fn dot_contours(contours: &mut [Contour], params: &DotParams) -> Result<Vec<Point>, EffectError> {
    if params.split_paths {
        let inserted = intersect::split_at_intersections(contours)?;
        tracing::debug!(inserted, "split paths at intersections");
    }
    let centers = find_centers(contours, params, ArcPrecision::default());
    for contour in contours.iter_mut() {
        contour.clear_local_forcing();
    }
    Ok(filter_overlaps(&centers, params.dot_size, params.prevent_overlaps))
}
