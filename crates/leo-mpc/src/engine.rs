//! The decision engine and the per-user independent search.

use std::sync::Arc;

use leo_core::{MpcTuning, Quality, StreamConfig};
use leo_trace::VideoSizes;

use crate::combos::quality_combos;
use crate::plan::{MpcChoice, SoloInput, NO_REWARD};
use crate::reward::PlanScorer;

/// Stateless MPC search over immutable inputs.
///
/// The engine never touches live simulation state: every search receives
/// its predictions, occupancies and buffers by value, and returns a plan
/// the orchestrator may or may not commit.
#[derive(Clone, Debug)]
pub struct MpcEngine {
    scorer: PlanScorer,
    tuning: MpcTuning,
    levels: Vec<Quality>,
}

impl MpcEngine {
    pub fn new(cfg: &StreamConfig, video: Arc<VideoSizes>) -> Self {
        Self {
            scorer: PlanScorer::new(cfg, video),
            tuning: cfg.mpc.clone(),
            levels: cfg.ladder.searchable(),
        }
    }

    #[inline]
    pub fn scorer(&self) -> &PlanScorer {
        &self.scorer
    }

    #[inline]
    pub fn tuning(&self) -> &MpcTuning {
        &self.tuning
    }

    #[inline]
    pub fn horizon(&self) -> usize {
        self.tuning.horizon
    }

    /// Levels the search enumerates per chunk.
    pub fn levels(&self) -> &[Quality] {
        &self.levels
    }

    /// Effective look-ahead: the horizon, truncated to the chunks left.
    #[inline]
    pub fn future_len(&self, chunks_remaining: usize) -> usize {
        chunks_remaining.min(self.tuning.horizon)
    }

    /// All quality combos of the effective look-ahead.
    pub fn combos(&self, chunks_remaining: usize) -> Vec<Vec<Quality>> {
        quality_combos(&self.levels, self.future_len(chunks_remaining))
    }

    /// Per-user independent search: best combo over one bandwidth estimate,
    /// no handover.
    ///
    /// A zero or negative estimate yields an empty combo with [`NO_REWARD`].
    pub fn calculate_mpc(&self, input: &SoloInput) -> MpcChoice {
        let mut best = MpcChoice { combo: Vec::new(), reward: NO_REWARD };
        if input.bw <= 0.0 {
            return best;
        }
        let horizon = self.horizon();
        for combo in self.combos(input.chunks_remaining) {
            let score = self.scorer.score(
                &combo,
                input.last_quality,
                input.start_buffer_s,
                input.last_index,
                horizon,
                |_| input.bw,
            );
            if better(score.reward, &combo, best.reward, &best.combo) {
                best = MpcChoice { combo, reward: score.reward };
            }
        }
        best
    }
}

/// Shared tie-break: strictly higher reward wins; on an exact tie the later
/// candidate wins when its first step is at least as high.
#[inline]
pub(crate) fn better(reward: f64, combo: &[Quality], best_reward: f64, best: &[Quality]) -> bool {
    reward > best_reward || (reward == best_reward && first_step_ge(combo, best))
}

#[inline]
pub(crate) fn first_step_ge(combo: &[Quality], best: &[Quality]) -> bool {
    match (combo.first(), best.first()) {
        (Some(a), Some(b)) => a >= b,
        (_, None) => true,
        (None, Some(_)) => false,
    }
}
