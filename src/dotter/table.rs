//! Arc-length lookup table for one (sub-)contour.

use kurbo::Point;

use crate::geom::{ArcPrecision, Segment};

/// Samples taken per segment (at `i / LIMIT` for `i` in `1..LIMIT`).
pub const LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Normalized arc-length position in `[0, 1]`.
    pub fraction: f64,
    /// Cumulative arc length from the start.
    pub length: f64,
    pub point: Point,
}

/// Monotonic mapping between arc length, its normalized fraction, and position.
#[derive(Debug, Clone)]
pub struct ArcLengthTable {
    samples: Vec<Sample>,
    total: f64,
}

impl ArcLengthTable {
    /// Sample `segments` into a table.
    ///
    /// Returns `None` when there is nothing to measure: no segments, or a
    /// path of zero length. Callers must place no dots in that case.
    pub fn build(segments: &[Segment], precision: ArcPrecision) -> Option<Self> {
        let first = segments.first()?;
        let last = segments.last()?;
        let seg_lengths: Vec<f64> = segments.iter().map(|s| s.arclen(precision)).collect();
        let total: f64 = seg_lengths.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return None;
        }

        let mut samples = Vec::with_capacity(segments.len() * LIMIT + 1);
        samples.push(Sample {
            fraction: 0.0,
            length: 0.0,
            point: first.start(),
        });

        let mut length_so_far = 0.0;
        for (seg, &seg_len) in segments.iter().zip(&seg_lengths) {
            for i in 1..LIMIT {
                let local_t = i as f64 / LIMIT as f64;
                let left = seg.head(local_t);
                let here = length_so_far + left.arclen(precision).min(seg_len);
                push_monotonic(&mut samples, here, left.end(), total);
            }
            length_so_far += seg_len;
            push_monotonic(&mut samples, length_so_far, seg.end(), total);
        }

        // Pin the end exactly, whatever rounding the running sum picked up.
        if let Some(end) = samples.last_mut() {
            *end = Sample {
                fraction: 1.0,
                length: total,
                point: last.end(),
            };
        }

        Some(ArcLengthTable { samples, total })
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn start(&self) -> Point {
        self.samples[0].point
    }

    pub fn end(&self) -> Point {
        self.samples[self.samples.len() - 1].point
    }

    /// Position at a normalized arc-length fraction.
    pub fn point_at_fraction(&self, t: f64) -> Point {
        self.point_at_length(t * self.total)
    }

    /// Position at a cumulative arc length, interpolating between samples.
    ///
    /// Lengths outside `[0, total]` clamp to the endpoints.
    pub fn point_at_length(&self, d: f64) -> Point {
        if d <= 0.0 {
            return self.start();
        }
        if d >= self.total {
            return self.end();
        }
        // First sample at or beyond `d`; the one before it is strictly shorter.
        let hi = self.samples.partition_point(|s| s.length < d);
        let hi = hi.clamp(1, self.samples.len() - 1);
        let a = self.samples[hi - 1];
        let b = self.samples[hi];
        let span = b.length - a.length;
        if span <= 0.0 {
            return b.point;
        }
        a.point.lerp(b.point, (d - a.length) / span)
    }
}

/// Append a sample, never letting cumulative length run backwards.
fn push_monotonic(samples: &mut Vec<Sample>, length: f64, point: Point, total: f64) {
    let floor = samples.last().map_or(0.0, |s| s.length);
    let length = length.max(floor).min(total);
    samples.push(Sample {
        fraction: length / total,
        length,
        point,
    });
}
