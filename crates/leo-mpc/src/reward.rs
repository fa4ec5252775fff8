//! QoE reward and plan scoring.

use std::sync::Arc;

use leo_core::{
    BitrateLadder, Quality, RewardConfig, RewardKind, StreamConfig, B_IN_MB, BITS_IN_BYTE,
};
use leo_trace::VideoSizes;

/// The three terms of a QoE reward.  `total = bitrate - rebuffer - smoothness`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RewardParts {
    pub bitrate:    f64,
    pub rebuffer:   f64,
    pub smoothness: f64,
}

impl RewardParts {
    #[inline]
    pub fn total(&self) -> f64 {
        self.bitrate - self.rebuffer - self.smoothness
    }
}

impl std::ops::AddAssign for RewardParts {
    fn add_assign(&mut self, rhs: Self) {
        self.bitrate += rhs.bitrate;
        self.rebuffer += rhs.rebuffer;
        self.smoothness += rhs.smoothness;
    }
}

/// LIN or HD reward over the bitrate ladder.
#[derive(Clone, Debug)]
pub struct RewardModel {
    ladder: BitrateLadder,
    cfg:    RewardConfig,
}

impl RewardModel {
    pub fn new(ladder: BitrateLadder, cfg: RewardConfig) -> Self {
        Self { ladder, cfg }
    }

    pub fn from_config(cfg: &StreamConfig) -> Self {
        Self::new(cfg.ladder.clone(), cfg.reward.clone())
    }

    /// The same weights with the LIN formula forced.
    pub fn linear(&self) -> Self {
        Self {
            ladder: self.ladder.clone(),
            cfg:    RewardConfig { kind: RewardKind::Lin, ..self.cfg.clone() },
        }
    }

    pub fn kind(&self) -> RewardKind {
        self.cfg.kind
    }

    pub fn ladder(&self) -> &BitrateLadder {
        &self.ladder
    }

    /// Penalty per second of rebuffering.
    #[inline]
    pub fn rebuf_weight(&self) -> f64 {
        match self.cfg.kind {
            RewardKind::Lin => self.cfg.rebuf_penalty,
            RewardKind::Hd => self.cfg.hd_rebuf_penalty,
        }
    }

    /// Reward terms of one chunk at quality `q` after `last`, with
    /// `rebuffer_s` seconds of stall.
    pub fn chunk_parts(&self, q: Quality, last: Quality, rebuffer_s: f64) -> RewardParts {
        match self.cfg.kind {
            RewardKind::Lin => {
                let (now, prev) = (self.ladder.kbps(q), self.ladder.kbps(last));
                RewardParts {
                    bitrate:    now * self.cfg.quality_factor / 1_000.0,
                    rebuffer:   self.rebuf_weight() * rebuffer_s,
                    smoothness: self.cfg.smooth_penalty * (now - prev).abs() / 1_000.0,
                }
            }
            RewardKind::Hd => {
                let (now, prev) = (self.ladder.hd_reward(q), self.ladder.hd_reward(last));
                RewardParts {
                    bitrate:    now,
                    rebuffer:   self.rebuf_weight() * rebuffer_s,
                    smoothness: (now - prev).abs(),
                }
            }
        }
    }

    #[inline]
    pub fn chunk_reward(&self, q: Quality, last: Quality, rebuffer_s: f64) -> f64 {
        self.chunk_parts(q, last, rebuffer_s).total()
    }
}

// ── Plan scoring ──────────────────────────────────────────────────────────────

/// Result of walking one quality combo through the buffer model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanScore {
    pub reward:     f64,
    pub rebuffer_s: f64,
    pub end_buffer: f64,
}

/// Everything needed to score a plan: reward weights, chunk sizes, and the
/// timing constants.  Cheap to clone; chunk sizes are shared.
#[derive(Clone, Debug)]
pub struct PlanScorer {
    pub reward:           RewardModel,
    pub video:            Arc<VideoSizes>,
    pub chunk_len_s:      f64,
    pub handover_delay_s: f64,
}

impl PlanScorer {
    pub fn new(cfg: &StreamConfig, video: Arc<VideoSizes>) -> Self {
        Self {
            reward:           RewardModel::from_config(cfg),
            video,
            chunk_len_s:      cfg.chunk_len_s(),
            handover_delay_s: cfg.handover_delay_s,
        }
    }

    /// Seconds to download chunk `index` at `q` over `bw` Mbps.
    #[inline]
    pub fn download_time(&self, q: Quality, index: usize, bw: f64) -> f64 {
        self.video.size(q, index) as f64 / B_IN_MB / bw * BITS_IN_BYTE
    }

    /// Walk `combo` starting from `start_buffer` seconds.
    ///
    /// Chunk `i` downloads over `bw(i)` Mbps.  The chunk at `ho_index` also
    /// pays the handover delay.  `ho_index >= combo.len()` means no handover
    /// inside the plan.
    #[allow(clippy::too_many_arguments)]
    pub fn walk(
        &self,
        model:        &RewardModel,
        combo:        &[Quality],
        last_quality: Quality,
        start_buffer: f64,
        last_index:   usize,
        ho_index:     usize,
        mut bw:       impl FnMut(usize) -> f64,
    ) -> PlanScore {
        let mut buffer = start_buffer;
        let mut rebuffer = 0.0;
        let mut parts = RewardParts::default();
        let mut last = last_quality;

        for (pos, &q) in combo.iter().enumerate() {
            let mut download = self.download_time(q, last_index + pos, bw(pos));
            if pos == ho_index {
                download += self.handover_delay_s;
            }
            if buffer < download {
                rebuffer += download - buffer;
                buffer = 0.0;
            } else {
                buffer -= download;
            }
            buffer += self.chunk_len_s;
            parts += model.chunk_parts(q, last, 0.0);
            last = q;
        }
        parts.rebuffer = model.rebuf_weight() * rebuffer;

        PlanScore { reward: parts.total(), rebuffer_s: rebuffer, end_buffer: buffer }
    }

    /// Walk with the configured reward model.
    #[inline]
    pub fn score(
        &self,
        combo:        &[Quality],
        last_quality: Quality,
        start_buffer: f64,
        last_index:   usize,
        ho_index:     usize,
        bw:           impl FnMut(usize) -> f64,
    ) -> PlanScore {
        self.walk(&self.reward, combo, last_quality, start_buffer, last_index, ho_index, bw)
    }

    /// Total stall time of `combo` only; used by the fair-share objective.
    pub fn rebuffer(
        &self,
        combo:        &[Quality],
        start_buffer: f64,
        last_index:   usize,
        ho_index:     usize,
        bw:           impl FnMut(usize) -> f64,
    ) -> f64 {
        let Some(&first) = combo.first() else { return 0.0 };
        self.score(combo, first, start_buffer, last_index, ho_index, bw).rebuffer_s
    }
}
