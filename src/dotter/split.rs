//! Break contours into open runs between forced nodes.

use std::iter::FusedIterator;

use crate::contour::{Contour, Node};

/// Lazily yields the open sub-contours of one contour.
///
/// A run ends after every forced on-curve node and the next run starts at
/// that same node, so neighbouring runs share their boundary node. The
/// contour's own start and end always bound the first and last runs.
#[derive(Debug, Clone)]
pub struct ForcedSplit {
    walk: Vec<Node>,
    pos: usize,
    done: bool,
}

/// Split `contour` at its forced nodes.
pub fn split_at_forced(contour: &Contour) -> ForcedSplit {
    let walk = contour.walk();
    ForcedSplit {
        done: walk.is_empty(),
        walk,
        pos: 0,
    }
}

impl Iterator for ForcedSplit {
    type Item = Contour;

    fn next(&mut self) -> Option<Contour> {
        if self.done {
            return None;
        }
        let last = self.walk.len() - 1;
        let start = self.pos;
        let mut end = (start + 1).min(last);
        while end < last {
            let node = &self.walk[end];
            if node.kind.is_on_curve() && node.is_forced() {
                break;
            }
            end += 1;
        }
        if end >= last {
            self.done = true;
        } else {
            self.pos = end;
        }
        Some(Contour::new(self.walk[start..=end].to_vec(), false))
    }
}

impl FusedIterator for ForcedSplit {}
