//! Keep dots from landing on top of each other.

use kurbo::Point;

use super::solver::Center;

/// Filter merged centres so no two accepted dots are closer than `dot_size`.
///
/// Forced centres are considered first (ties keep input order), so contour
/// endpoints, user markers and intersection points are never dropped in
/// favour of a regularly spaced dot. With `prevent` unset every centre is
/// returned as-is.
pub fn filter_overlaps(centers: &[Center], dot_size: f64, prevent: bool) -> Vec<Point> {
    if !prevent {
        return centers.iter().map(|c| c.pos).collect();
    }
    let mut ordered: Vec<&Center> = centers.iter().collect();
    ordered.sort_by_key(|c| !c.forced);

    let mut accepted: Vec<Point> = Vec::with_capacity(ordered.len());
    for center in ordered {
        if accepted.iter().all(|p| p.distance(center.pos) >= dot_size) {
            accepted.push(center.pos);
        }
    }
    accepted
}
