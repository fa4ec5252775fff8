//! Inputs and outputs of the searches.

use std::collections::BTreeMap;

use leo_core::{Quality, SatId, UserId};

/// Reward assigned before any candidate has been scored.
pub const NO_REWARD: f64 = -10_000_000.0;

/// One candidate over the look-ahead horizon.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkPlan {
    pub combo:    Vec<Quality>,
    /// Chunk position at which the handover happens; `== horizon` means none.
    pub ho_index: usize,
    pub target:   Option<SatId>,
}

impl ChunkPlan {
    /// `true` if the plan switches satellite within `horizon` chunks.
    #[inline]
    pub fn hands_over(&self, horizon: usize) -> bool {
        self.ho_index < horizon && self.target.is_some()
    }
}

/// Inputs of the winning plan of a dual search, kept so that other users'
/// searches can re-score it under a hypothetical occupancy change.
#[derive(Clone, Debug, PartialEq)]
pub struct QoeLog {
    pub user:             UserId,
    pub last_quality:     Quality,
    pub cur_download_bw:  f64,
    pub start_buffer_s:   f64,
    pub future_len:       usize,
    pub last_index:       usize,
    pub combo:            Vec<Quality>,
    /// `None` when the plan stays on the current satellite.
    pub next_download_bw: Option<f64>,
    pub ho_index:         usize,
    pub next_sat:         Option<SatId>,
    pub reward:           f64,
    pub cur_users:        usize,
    pub next_users:       usize,
    pub cur_sat:          SatId,
}

/// Inputs of a single-user search without handover.
#[derive(Clone, Debug)]
pub struct SoloInput {
    pub last_quality:     Quality,
    pub start_buffer_s:   f64,
    pub last_index:       usize,
    pub chunks_remaining: usize,
    /// Predicted per-user bandwidth (Mbps); must be nonzero.
    pub bw:               f64,
}

/// Best quality sequence of a single-user search.
#[derive(Clone, Debug, PartialEq)]
pub struct MpcChoice {
    pub combo:  Vec<Quality>,
    pub reward: f64,
}

/// An alternative satellite offered to the dual search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub sat:   SatId,
    /// Predicted per-user bandwidth after joining (Mbps).
    pub bw:    f64,
    /// Occupancy of the satellite at the decision tick.
    pub users: usize,
}

/// Inputs of a dual (current vs. alternative satellite) search.
#[derive(Clone, Debug)]
pub struct DualInput {
    pub user:             UserId,
    pub cur_sat:          SatId,
    /// Predicted per-user bandwidth on the current satellite.
    pub cur_bw:           f64,
    pub cur_users:        usize,
    pub last_quality:     Quality,
    pub start_buffer_s:   f64,
    pub last_index:       usize,
    pub chunks_remaining: usize,
    /// Alternatives in ascending satellite order.
    pub candidates:       Vec<Candidate>,
}

/// Outcome of a single-user search with handover option.
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub target:   SatId,
    pub ho_index: usize,
    pub combo:    Vec<Quality>,
    pub reward:   f64,
    /// The winning plan's inputs; `None` when nothing was searched.
    pub log:      Option<QoeLog>,
}

impl Decision {
    pub fn plan(&self) -> ChunkPlan {
        ChunkPlan { combo: self.combo.clone(), ho_index: self.ho_index, target: Some(self.target) }
    }
}

/// One user's state as seen by a joint search.
#[derive(Clone, Debug)]
pub struct UserView {
    pub user:             UserId,
    pub cur_sat:          SatId,
    /// Runner-up satellite, if any is reachable.
    pub next_sat:         Option<SatId>,
    /// Predicted unshared bandwidth of the current satellite.
    pub cur_bw:           f64,
    /// Predicted unshared bandwidth of the runner-up (0 when none).
    pub next_bw:          f64,
    pub start_buffer_s:   f64,
    pub last_quality:     Quality,
    pub last_index:       usize,
    pub chunks_remaining: usize,
}

/// Inputs of a centralized joint search.
#[derive(Clone, Debug)]
pub struct JointInput {
    pub users:      Vec<UserView>,
    /// Index into `users` of the user that triggered the decision.
    pub decider:    usize,
    /// Start-buffer scaling used by the fair-share objective.
    pub buf_ratio:  f64,
}

/// Fair-share ratios of one contended satellite.
pub type ShareRatios = BTreeMap<SatId, Vec<(UserId, f64)>>;

/// Outcome of a centralized joint search, one entry per user.
#[derive(Clone, Debug, PartialEq)]
pub struct JointDecision {
    pub targets:  Vec<Option<SatId>>,
    pub ho:       Vec<usize>,
    pub combos:   Vec<Vec<Quality>>,
    pub rewards:  Vec<f64>,
    /// Solved shares, only for ratio-based searches.
    pub ratios:   Option<ShareRatios>,
}

impl JointDecision {
    /// Plan of the `k`-th user covered by the decision.
    pub fn plan(&self, k: usize) -> Option<ChunkPlan> {
        Some(ChunkPlan {
            combo:    self.combos.get(k)?.clone(),
            ho_index: *self.ho.get(k)?,
            target:   self.targets.get(k).copied().flatten(),
        })
    }

    /// Mean reward over users.
    pub fn mean_reward(&self) -> f64 {
        if self.rewards.is_empty() {
            return NO_REWARD;
        }
        self.rewards.iter().sum::<f64>() / self.rewards.len() as f64
    }
}
