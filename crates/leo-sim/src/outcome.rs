//! Structured results of a chunk request.

use std::collections::BTreeMap;

use leo_core::{Quality, SatId, UserId};
use leo_mpc::JointDecision;

/// What the user observes about its own and neighbouring satellites after a
/// chunk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SatelliteInfo {
    /// Occupancy-shared rate of the current satellite over the last ticks.
    pub cur_bw_log:    Vec<f64>,
    pub next_sat:      Option<SatId>,
    /// `(users + 1)`-shared rate of the runner-up over the same window.
    pub next_bw_log:   Vec<f64>,
    /// Consecutive serving ticks up to now of the current and runner-up
    /// satellites.
    pub up_time:       [u64; 2],
    /// Occupancy of every other satellite that served recently.
    pub other_users:   BTreeMap<SatId, usize>,
    pub other_bw_logs: BTreeMap<SatId, Vec<f64>>,
}

/// A centralized decision taken during this request.
#[derive(Clone, Debug, PartialEq)]
pub struct CentralPlan {
    pub decider:  UserId,
    /// Users the plan covers, in the order of `decision`'s vectors.
    pub users:    Vec<UserId>,
    pub decision: JointDecision,
}

/// Result of one `get_video_chunk` call.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkOutcome {
    pub user:             UserId,
    /// Quality actually delivered.
    pub quality:          Quality,
    pub delay_ms:         f64,
    pub sleep_ms:         f64,
    pub buffer_s:         f64,
    pub rebuffer_s:       f64,
    pub chunk_size:       u64,
    /// Sizes of the next chunk at every level.
    pub next_chunk_sizes: Vec<u64>,
    pub end_of_video:     bool,
    pub chunks_remaining: usize,
    pub handover:         bool,
    /// Forced handovers during this delivery.
    pub forced:           u32,
    pub cur_sat:          SatId,
    pub cur_users:        usize,
    pub next_users:       usize,
    /// `None` on the session's last chunk.
    pub sat_info:         Option<SatelliteInfo>,
    pub central:          Option<CentralPlan>,
    /// Buffers (s) of every other user, in id order.
    pub other_buffers_s:  Vec<f64>,
}
