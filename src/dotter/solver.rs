//! Dot spacing: choose a step that fits the path, then place centres.

use kurbo::Point;

use super::table::ArcLengthTable;
use crate::config::DotParams;

/// A computed dot position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Center {
    pub pos: Point,
    /// Endpoints and other structural points that must survive overlap filtering.
    pub forced: bool,
}

impl Center {
    pub fn forced(pos: Point) -> Self {
        Center { pos, forced: true }
    }

    pub fn regular(pos: Point) -> Self {
        Center { pos, forced: false }
    }

    pub fn distance(&self, other: &Center) -> f64 {
        self.pos.distance(other.pos)
    }
}

/// Where interior dots go along a path of known length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPlan {
    /// Distance between neighbouring centres along the path.
    pub step: f64,
    /// Number of intervals when the step divides the path evenly.
    /// `None` means the step was left unadjusted and the last gap is uneven.
    pub intervals: Option<usize>,
}

impl StepPlan {
    /// Resolve the step for a path of length `plen`.
    ///
    /// The leftover length an unadjusted walk would waste before the end
    /// point is spread over the `floor(dotcount)` intervals actually placed,
    /// stretching the step. The stretch is applied only while it stays
    /// within `flex_percent` of the spacing; otherwise the nominal step is
    /// kept and the last gap is left uneven.
    pub fn resolve(plen: f64, params: &DotParams) -> StepPlan {
        let preferred = params.preferred_step();
        let unadjusted = StepPlan {
            step: preferred,
            intervals: None,
        };
        if !(plen > 0.0 && preferred > 0.0 && plen.is_finite() && preferred.is_finite()) {
            tracing::warn!(plen, preferred, "cannot fit dot spacing, keeping nominal step");
            return unadjusted;
        }

        let dotcount = plen / preferred;
        let whole = dotcount.floor();
        let residue = (whole - dotcount) * preferred;
        let adjustment = residue / whole.max(1.0);
        let tolerance = params.flex_percent / 100.0 * params.dot_spacing;

        if adjustment.abs() <= tolerance {
            StepPlan {
                step: preferred - adjustment,
                intervals: Some((whole as usize).max(1)),
            }
        } else {
            tracing::debug!(plen, dotcount, adjustment, "no even fit within flex band, keeping step");
            unadjusted
        }
    }

    /// Distances along the path of the interior centres.
    pub fn interior_distances(&self, plen: f64) -> Vec<f64> {
        match self.intervals {
            Some(n) => (1..n).map(|i| i as f64 * self.step).collect(),
            None if self.step > 0.0 => {
                let mut out = Vec::new();
                let mut i = 1;
                loop {
                    let d = i as f64 * self.step;
                    if d >= plen {
                        break;
                    }
                    out.push(d);
                    i += 1;
                }
                out
            }
            None => Vec::new(),
        }
    }
}

/// Centres for one sub-contour: both endpoints (forced) and evenly spaced
/// interior dots.
pub fn place_centers(table: &ArcLengthTable, params: &DotParams) -> Vec<Center> {
    let plen = table.total();
    let plan = StepPlan::resolve(plen, params);
    tracing::debug!(plen, step = plan.step, intervals = ?plan.intervals, "placing dots");

    let mut centers = vec![Center::forced(table.start()), Center::forced(table.end())];
    centers.extend(
        plan.interior_distances(plen)
            .into_iter()
            .map(|d| Center::regular(table.point_at_length(d))),
    );
    centers
}
