//! Enumeration of the search spaces.
//!
//! All enumerations are lexicographic so the "later candidate wins on an
//! exact tie" rule of the searches is reproducible.

use std::ops::Range;

use leo_core::Quality;

/// Every sequence of `len` levels drawn from `levels`, lexicographic.
///
/// `len == 0` yields one empty combo.
pub fn quality_combos(levels: &[Quality], len: usize) -> Vec<Vec<Quality>> {
    let mut out: Vec<Vec<Quality>> = vec![Vec::with_capacity(len)];
    for _ in 0..len {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                levels.iter().map(move |&q| {
                    let mut next = prefix.clone();
                    next.push(q);
                    next
                })
            })
            .collect();
    }
    out
}

/// Every handover vector in `[0, horizon]^users`, lexicographic.
pub fn handover_vectors(users: usize, horizon: usize) -> Vec<Vec<usize>> {
    let mut out: Vec<Vec<usize>> = vec![Vec::with_capacity(users)];
    for _ in 0..users {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                (0..=horizon).map(move |h| {
                    let mut next = prefix.clone();
                    next.push(h);
                    next
                })
            })
            .collect();
    }
    out
}

/// Mixed-radix index over the per-user combo lists.
///
/// Joint index `i` selects one combo per user; user 0 is the most
/// significant digit, matching a Cartesian product over users in order.
#[derive(Clone, Debug)]
pub struct JointSpace {
    radices: Vec<usize>,
}

impl JointSpace {
    pub fn new(radices: Vec<usize>) -> Self {
        Self { radices }
    }

    /// Number of joint choices.
    pub fn len(&self) -> usize {
        self.radices.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-user combo indices of joint choice `idx`.
    pub fn decode(&self, mut idx: usize, out: &mut Vec<usize>) {
        out.clear();
        out.resize(self.radices.len(), 0);
        for (slot, &radix) in out.iter_mut().zip(&self.radices).rev() {
            *slot = idx % radix;
            idx /= radix;
        }
    }

    /// Split `0..len` into `shards` contiguous ranges of near-equal size.
    /// Empty ranges are dropped.
    pub fn shards(&self, shards: usize) -> Vec<Range<usize>> {
        let len = self.len();
        let shards = shards.max(1);
        let step = len.div_ceil(shards).max(1);
        (0..len).step_by(step).map(|start| start..(start + step).min(len)).collect()
    }
}
