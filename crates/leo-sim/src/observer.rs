//! Observer trait for per-chunk data collection.

use leo_core::{Quality, SatId, UserId};
use leo_mpc::RewardParts;

use crate::runner::{EpisodeSummary, RunSummary};

/// One delivered chunk as seen by the evaluation runner.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkRecord {
    pub episode:    usize,
    pub trace:      String,
    pub user:       UserId,
    /// Position of the chunk in the user's session, from 0.
    pub chunk:      usize,
    pub quality:    Quality,
    pub delay_ms:   f64,
    pub sleep_ms:   f64,
    pub buffer_s:   f64,
    pub rebuffer_s: f64,
    pub chunk_size: u64,
    pub handover:   bool,
    pub cur_sat:    SatId,
    pub reward:     f64,
    pub parts:      RewardParts,
}

/// Callbacks invoked by [`EvalRunner::run`][crate::EvalRunner::run].
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.
pub trait SimObserver {
    /// Called after every delivered chunk.
    fn on_chunk(&mut self, _record: &ChunkRecord) {}

    /// Called once every user of an episode has finished.
    fn on_episode_end(&mut self, _summary: &EpisodeSummary) {}

    /// Called once after the last episode.
    fn on_run_end(&mut self, _summary: &RunSummary) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
