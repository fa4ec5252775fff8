//! Per-user session state.

use std::collections::VecDeque;

use leo_core::{Quality, SatId, SessionClock, StreamConfig, Tick, UserId, UserRng, MS_IN_S};

/// Entries kept in the satellite decision log.
pub const DECISION_LOG_LEN: usize = 5;

/// Half-width of the per-chunk SNR random-walk step (dB).
const SNR_STEP_DB: f64 = 0.5;

/// A handover scheduled by a centralized plan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingHandover {
    pub target:    SatId,
    /// Chunk requests left before the handover fires; 0 fires on the next.
    pub countdown: usize,
}

/// Everything the orchestrator tracks for one user.
#[derive(Clone, Debug)]
pub struct UserState {
    pub id:           UserId,
    pub clock:        SessionClock,
    /// Playback buffer (ms).
    pub buffer_ms:    f64,
    /// Chunks delivered in the current session.
    pub chunk_index:  usize,
    pub last_quality: Quality,
    pub cur_sat:      SatId,
    pub prev_sat:     Option<SatId>,
    /// Measured per-chunk throughput (Mbps) since the last handover.
    pub download_bw:  Vec<f64>,
    pub snr_db:       f64,
    pub end_of_video: bool,
    /// Remaining qualities of the last centralized plan.
    pub queued:       VecDeque<Quality>,
    pub pending:      Option<PendingHandover>,
    rng:              UserRng,
    snr_min_db:       f64,
    connections:      Vec<(Tick, SatId)>,
    decisions:        VecDeque<Option<SatId>>,
}

impl UserState {
    pub fn new(id: UserId, cfg: &StreamConfig, sat: SatId, origin_secs: f64) -> Self {
        Self {
            id,
            clock: SessionClock::at_start(origin_secs),
            buffer_ms: 0.0,
            chunk_index: 0,
            last_quality: cfg.default_quality,
            cur_sat: sat,
            prev_sat: None,
            download_bw: Vec::new(),
            snr_db: cfg.snr_min_db,
            end_of_video: false,
            queued: VecDeque::new(),
            pending: None,
            rng: UserRng::new(cfg.seed, id),
            snr_min_db: cfg.snr_min_db,
            connections: vec![(Tick::ZERO, sat)],
            decisions: std::iter::repeat_n(None, DECISION_LOG_LEN).collect(),
        }
    }

    #[inline]
    pub fn buffer_s(&self) -> f64 {
        self.buffer_ms / MS_IN_S
    }

    #[inline]
    pub fn chunks_remaining(&self, total: usize) -> usize {
        total.saturating_sub(self.chunk_index)
    }

    /// Satellite this user was connected to at tick `t`.
    pub fn sat_at(&self, t: Tick) -> SatId {
        self.connections
            .iter()
            .rev()
            .find(|(from, _)| *from <= t)
            .or(self.connections.first())
            .map_or(self.cur_sat, |(_, sat)| *sat)
    }

    /// `(tick, satellite)` for every connection, oldest first.
    pub fn connections(&self) -> &[(Tick, SatId)] {
        &self.connections
    }

    /// Record a switch to `sat` at `t`.  Clears the throughput history.
    pub fn switch_to(&mut self, sat: SatId, t: Tick) {
        self.prev_sat = Some(self.cur_sat);
        self.cur_sat = sat;
        self.download_bw.clear();
        self.connections.push((t, sat));
    }

    /// Append to the decision log, dropping the oldest entry.
    pub fn record_decision(&mut self, sat: SatId) {
        self.decisions.pop_front();
        self.decisions.push_back(Some(sat));
    }

    /// The last [`DECISION_LOG_LEN`] serving satellites, oldest first.
    pub fn decision_log(&self) -> Vec<Option<SatId>> {
        self.decisions.iter().copied().collect()
    }

    /// One step of the SNR random walk.
    pub fn step_snr(&mut self) -> f64 {
        self.snr_db = self.rng.walk(self.snr_db, SNR_STEP_DB, self.snr_min_db);
        self.snr_db
    }
}
