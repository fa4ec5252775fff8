//! Centralized reduced search.
//!
//! Feasible handover vectors are ranked by mean projected per-user bandwidth
//! and only the best `ho_num` are searched.  Each kept vector's joint quality
//! space is cut into `shards` contiguous ranges scored independently against
//! a shared immutable snapshot; shard winners merge in shard order with the
//! sequential tie-break, so the result does not depend on thread count.

use std::ops::Range;
use std::sync::Arc;

use tracing::{debug, info};

use crate::joint::{merge, JointScore, JointSnapshot, Projection};
use crate::plan::{JointDecision, JointInput};
use crate::{MpcEngine, MpcResult};

impl MpcEngine {
    /// Reduced counterpart of [`MpcEngine::exhaustive`].
    pub fn reduced(&self, input: &JointInput, ratio: bool) -> MpcResult<JointDecision> {
        let snap = Arc::new(self.snapshot(input)?);
        let projections = self.projections(&snap, input.decider);
        let kept = self.rank(&snap, &projections);
        let shards = snap.space.shards(self.tuning().shards);

        let mut best = None;
        for &candidate in &kept {
            let proj = &projections[candidate];
            for result in score_shards(&snap, candidate, proj, &shards, ratio) {
                merge(&mut best, result);
            }
        }

        let decision = snap.decision(&projections, best);
        info!(
            decider = input.decider,
            feasible = projections.len(),
            kept = kept.len(),
            shards = shards.len(),
            ho = ?decision.ho,
            mean_reward = decision.mean_reward(),
            ratio,
            "reduced decision"
        );
        Ok(decision)
    }

    /// Indices of the `ho_num` projections with the highest mean per-user
    /// bandwidth, returned in enumeration order.
    pub(crate) fn rank(&self, snap: &JointSnapshot, projections: &[Projection]) -> Vec<usize> {
        let divisor = self.tuning().divisors.reduced;
        let all_users = snap.users.len();

        let mut scored: Vec<(usize, f64)> = projections
            .iter()
            .enumerate()
            .map(|(idx, proj)| {
                let (sum, n) = snap.users.iter().enumerate().fold((0.0, 0usize), |(sum, n), (u, user)| {
                    let len = self.future_len(user.chunks_remaining);
                    let part: f64 = (0..len)
                        .map(|pos| {
                            let (sat, bw) = match user.next_sat {
                                Some(next) if pos >= proj.ho[u] => (next, user.next_bw),
                                _ => (user.cur_sat, user.cur_bw),
                            };
                            let occupancy = proj.counts.get(&sat).map_or(0, |c| c[pos].max(0) as usize);
                            divisor.apply(bw, occupancy, all_users)
                        })
                        .sum();
                    (sum + part, n + len)
                });
                (idx, if n == 0 { 0.0 } else { sum / n as f64 })
            })
            .collect();

        // Stable: equal means keep enumeration order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        let mut kept: Vec<usize> =
            scored.into_iter().take(self.tuning().ho_num.max(1)).map(|(idx, _)| idx).collect();
        kept.sort_unstable();
        debug!(?kept, "reduced candidates");
        kept
    }
}

#[cfg(feature = "parallel")]
fn score_shards(
    snap:      &Arc<JointSnapshot>,
    candidate: usize,
    proj:      &Projection,
    shards:    &[Range<usize>],
    ratio:     bool,
) -> Vec<Option<JointScore>> {
    use rayon::prelude::*;

    // Each shard receives its own handle on the snapshot plus its range.
    shards
        .par_iter()
        .map(|range| {
            let snap = Arc::clone(snap);
            snap.best_in(candidate, proj, range.clone(), ratio)
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn score_shards(
    snap:      &Arc<JointSnapshot>,
    candidate: usize,
    proj:      &Projection,
    shards:    &[Range<usize>],
    ratio:     bool,
) -> Vec<Option<JointScore>> {
    shards
        .iter()
        .map(|range| snap.best_in(candidate, proj, range.clone(), ratio))
        .collect()
}
