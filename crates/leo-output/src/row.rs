//! Plain data row types written by output backends.

use leo_sim::{ChunkRecord, EpisodeSummary};

/// One delivered chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkLogRow {
    pub episode:    u32,
    pub trace:      String,
    pub user:       u32,
    pub chunk:      u32,
    pub quality:    u8,
    pub delay_ms:   f64,
    pub sleep_ms:   f64,
    pub buffer_s:   f64,
    pub rebuffer_s: f64,
    pub chunk_size: u64,
    pub handover:   bool,
    pub cur_sat:    u32,
    pub reward:     f64,
    /// Reward terms; penalties are stored positive.
    pub bitrate:    f64,
    pub rebuffer:   f64,
    pub smoothness: f64,
}

impl From<&ChunkRecord> for ChunkLogRow {
    fn from(r: &ChunkRecord) -> Self {
        Self {
            episode:    r.episode as u32,
            trace:      r.trace.clone(),
            user:       r.user.0,
            chunk:      r.chunk as u32,
            quality:    r.quality.0,
            delay_ms:   r.delay_ms,
            sleep_ms:   r.sleep_ms,
            buffer_s:   r.buffer_s,
            rebuffer_s: r.rebuffer_s,
            chunk_size: r.chunk_size,
            handover:   r.handover,
            cur_sat:    r.cur_sat.0,
            reward:     r.reward,
            bitrate:    r.parts.bitrate,
            rebuffer:   r.parts.rebuffer,
            smoothness: r.parts.smoothness,
        }
    }
}

/// Aggregates of one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummaryRow {
    pub episode:         u32,
    pub trace:           String,
    pub chunks:          u64,
    pub handovers:       u64,
    pub mean_reward:     f64,
    pub mean_bitrate:    f64,
    pub mean_rebuffer:   f64,
    pub mean_smoothness: f64,
}

impl From<&EpisodeSummary> for EpisodeSummaryRow {
    fn from(s: &EpisodeSummary) -> Self {
        Self {
            episode:         s.episode as u32,
            trace:           s.trace.clone(),
            chunks:          s.chunks as u64,
            handovers:       s.handovers as u64,
            mean_reward:     s.mean_reward,
            mean_bitrate:    s.mean_parts.bitrate,
            mean_rebuffer:   s.mean_parts.rebuffer,
            mean_smoothness: s.mean_parts.smoothness,
        }
    }
}
