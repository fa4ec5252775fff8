//! Centralized exhaustive search.

use tracing::info;

use crate::joint::merge;
use crate::plan::{JointDecision, JointInput};
use crate::{MpcEngine, MpcResult};

impl MpcEngine {
    /// Search every feasible handover vector × every joint quality choice.
    ///
    /// Handover vectors containing index 1 (when `prune_ho_one` is set) and
    /// the all-zero vector are skipped.  With `ratio`, every contended
    /// satellite's bandwidth split is solved per candidate instead of divided
    /// equally.
    ///
    /// # Errors
    ///
    /// [`MpcError::ZeroBandwidth`][crate::MpcError::ZeroBandwidth] if any
    /// user's current satellite predicts zero bandwidth.
    pub fn exhaustive(&self, input: &JointInput, ratio: bool) -> MpcResult<JointDecision> {
        let snap = self.snapshot(input)?;
        let projections = self.projections(&snap, input.decider);

        let mut best = None;
        for (candidate, proj) in projections.iter().enumerate() {
            merge(&mut best, snap.best_in(candidate, proj, 0..snap.space.len(), ratio));
        }

        let decision = snap.decision(&projections, best);
        info!(
            decider = input.decider,
            candidates = projections.len(),
            ho = ?decision.ho,
            mean_reward = decision.mean_reward(),
            ratio,
            "exhaustive decision"
        );
        Ok(decision)
    }
}
