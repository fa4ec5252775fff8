//! Simulation configuration.
//!
//! Every tunable the simulator reads lives in one immutable [`StreamConfig`]
//! that is handed to each component at construction.  Two runs with equal
//! configs and equal traces produce identical outcomes, so differently
//! parameterised runs can execute side by side in one process.

use std::fmt;
use std::str::FromStr;

use crate::{BitrateLadder, CoreError, CoreResult, Quality};

// ── Policy enums ──────────────────────────────────────────────────────────────

/// How a contended satellite's throughput is split among its users.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SharingPolicy {
    /// Equal split by occupancy count.
    #[default]
    ResourceFair,
    /// Fractional shares solved by the centralized search.
    RatioBased,
}

impl FromStr for SharingPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "resource-fair" => Ok(SharingPolicy::ResourceFair),
            "ratio-based"   => Ok(SharingPolicy::RatioBased),
            other => Err(CoreError::Parse(format!("unknown sharing policy {other:?}"))),
        }
    }
}

impl fmt::Display for SharingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SharingPolicy::ResourceFair => "resource-fair",
            SharingPolicy::RatioBased   => "ratio-based",
        })
    }
}

/// Throughput divisor used by the delivery loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DeliveryShare {
    /// Unshared rate divided by the number of users in the session.
    #[default]
    AllUsers,
    /// Rate as reported by the registry under the configured [`SharingPolicy`].
    Registry,
}

/// QoE reward formula.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RewardKind {
    /// Linear in kbps: `Σbitrate/1000 - μ·rebuf - λ·Σ|Δbitrate|/1000`.
    #[default]
    Lin,
    /// Integer reward table with a fixed rebuffer weight.
    Hd,
}

impl FromStr for RewardKind {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "LIN" | "lin" => Ok(RewardKind::Lin),
            "HD" | "hd"   => Ok(RewardKind::Hd),
            other => Err(CoreError::Parse(format!("unknown reward function {other:?}"))),
        }
    }
}

/// Bandwidth predictor used for the current satellite in the dual search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Predictor {
    #[default]
    HarmonicMean,
    HoltWinters,
}

/// Which alternative satellites the dual search considers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CandidateScope {
    /// Only the runner-up satellite.
    RunnerUp,
    /// Every other satellite visible at the decision tick.
    AllVisible,
}

/// How a predicted per-satellite bandwidth is turned into a per-user share.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Divisor {
    /// Divide by the total number of users in the session.
    AllUsers,
    /// Divide by the satellite's occupancy (no-op when empty).
    Occupancy,
    /// Divide by occupancy + 1, i.e. as if the user joined (no-op when empty).
    OccupancyPlusOne,
}

impl Divisor {
    /// Apply the divisor to `bw`.
    #[inline]
    pub fn apply(self, bw: f64, occupancy: usize, all_users: usize) -> f64 {
        match self {
            Divisor::AllUsers => bw / all_users.max(1) as f64,
            Divisor::Occupancy if occupancy == 0 => bw,
            Divisor::Occupancy => bw / occupancy as f64,
            Divisor::OccupancyPlusOne if occupancy == 0 => bw,
            Divisor::OccupancyPlusOne => bw / (occupancy + 1) as f64,
        }
    }
}

/// Per-variant divisor choices.  The variants intentionally disagree; each
/// default reproduces the variant's reference behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DivisorTable {
    /// Per-user independent MPC.
    pub separate:       Divisor,
    /// Dual search, current satellite.
    pub dual_current:   Divisor,
    /// Dual search, candidate satellite.
    pub dual_candidate: Divisor,
    /// Reduced centralized search.
    pub reduced:        Divisor,
}

impl Default for DivisorTable {
    fn default() -> Self {
        Self {
            separate:       Divisor::AllUsers,
            dual_current:   Divisor::Occupancy,
            dual_candidate: Divisor::OccupancyPlusOne,
            reduced:        Divisor::AllUsers,
        }
    }
}

// ── RewardConfig ──────────────────────────────────────────────────────────────

/// Weights of the QoE reward.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RewardConfig {
    pub kind:             RewardKind,
    pub quality_factor:   f64,
    pub rebuf_penalty:    f64,
    pub smooth_penalty:   f64,
    /// Rebuffer weight of the HD reward.
    pub hd_rebuf_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            kind:             RewardKind::Lin,
            quality_factor:   1.0,
            rebuf_penalty:    4.3,
            smooth_penalty:   1.0,
            hd_rebuf_penalty: 8.0,
        }
    }
}

// ── MpcTuning ─────────────────────────────────────────────────────────────────

/// Knobs of the decision engine.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MpcTuning {
    /// Look-ahead horizon H in chunks.
    pub horizon:            usize,
    /// Harmonic-mean window and error-history length.
    pub past_window:        usize,
    /// Warm-up length for predictions and bandwidth logs.
    pub past_len:           usize,
    /// Handover assignments kept by the reduced search.
    pub ho_num:             usize,
    /// Combo shards scored in parallel by the reduced search.
    pub shards:             usize,
    /// Lower/upper bound margin for fair-share ratios.
    pub epsilon:            f64,
    /// Start-buffer scaling inside the ratio objective.
    pub buf_ratio:          f64,
    /// Start-buffer scaling after an unexpected change (with `adaptive_buffer`).
    pub buf_ratio_combo:    f64,
    pub adaptive_buffer:    bool,
    /// Fix other users to their last quality and no handover.
    pub freeze_other_users: bool,
    /// Drop handover vectors containing index 1 in the exhaustive search.
    pub prune_ho_one:       bool,
    /// Divide predictions by `1 + max recent error`.
    pub robust:             bool,
    pub predictor:          Predictor,
    pub divisors:           DivisorTable,
    /// Overrides the dual-search candidate scope; `None` keeps each
    /// strategy's own scope.
    pub candidates:         Option<CandidateScope>,
    /// Iteration cap of the fair-share solver.
    pub solver_iterations:  usize,
}

impl Default for MpcTuning {
    fn default() -> Self {
        Self {
            horizon:            5,
            past_window:        5,
            past_len:           8,
            ho_num:             3,
            shards:             4,
            epsilon:            1e-3,
            buf_ratio:          1.0,
            buf_ratio_combo:    0.8,
            adaptive_buffer:    false,
            freeze_other_users: false,
            prune_ho_one:       true,
            robust:             true,
            predictor:          Predictor::HarmonicMean,
            divisors:           DivisorTable::default(),
            candidates:         None,
            solver_iterations:  60,
        }
    }
}

// ── StreamConfig ──────────────────────────────────────────────────────────────

/// Top-level simulation configuration.
///
/// Typically built with `StreamConfig::default()` and struct-update syntax,
/// or deserialized from JSON/TOML by an application crate.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamConfig {
    /// Playback buffer cap before the player sleeps (ms).
    pub buffer_thresh_ms: f64,
    /// Sleep quantum used to drain an overfull buffer (ms).
    pub drain_sleep_ms:   f64,
    /// Fraction of link throughput carrying payload.
    pub payload_portion:  f64,
    pub link_rtt_ms:      f64,
    pub handover_delay_s: f64,
    pub chunk_len_ms:     f64,
    pub total_chunks:     usize,
    pub default_quality:  Quality,
    pub ladder:           BitrateLadder,
    pub reward:           RewardConfig,
    pub mpc:              MpcTuning,
    pub sharing:          SharingPolicy,
    pub delivery_share:   DeliveryShare,
    /// Floor of the per-user SNR random walk (dB).
    pub snr_min_db:       f64,
    /// Master RNG seed.
    pub seed:             u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_thresh_ms: 60_000.0,
            drain_sleep_ms:   500.0,
            payload_portion:  0.95,
            link_rtt_ms:      80.0,
            handover_delay_s: 0.2,
            chunk_len_ms:     4_000.0,
            total_chunks:     48,
            default_quality:  Quality(1),
            ladder:           BitrateLadder::default(),
            reward:           RewardConfig::default(),
            mpc:              MpcTuning::default(),
            sharing:          SharingPolicy::ResourceFair,
            delivery_share:   DeliveryShare::AllUsers,
            snr_min_db:       0.0,
            seed:             42,
        }
    }
}

impl StreamConfig {
    /// Chunk duration in seconds.
    #[inline]
    pub fn chunk_len_s(&self) -> f64 {
        self.chunk_len_ms / crate::MS_IN_S
    }

    /// Reject configurations the simulator cannot run.
    pub fn validate(&self) -> CoreResult<()> {
        let fail = |msg: String| Err(CoreError::Config(msg));

        if self.ladder.levels() == 0 {
            return fail("bitrate ladder is empty".into());
        }
        if self.ladder.hd_reward.len() != self.ladder.levels() {
            return fail(format!(
                "HD reward table has {} entries for {} ladder levels",
                self.ladder.hd_reward.len(),
                self.ladder.levels()
            ));
        }
        if self.ladder.stride == 0 {
            return fail("ladder stride must be at least 1".into());
        }
        self.ladder.check(self.default_quality)?;
        if !(self.payload_portion > 0.0 && self.payload_portion <= 1.0) {
            return fail(format!("payload portion {} not in (0, 1]", self.payload_portion));
        }
        if self.chunk_len_ms <= 0.0 || self.drain_sleep_ms <= 0.0 {
            return fail("chunk length and drain quantum must be positive".into());
        }
        if self.total_chunks == 0 {
            return fail("total_chunks must be positive".into());
        }
        if self.mpc.horizon == 0 || self.mpc.past_window == 0 {
            return fail("MPC horizon and past window must be positive".into());
        }
        if self.mpc.shards == 0 {
            return fail("reduced search needs at least one shard".into());
        }
        if !(self.mpc.epsilon > 0.0 && self.mpc.epsilon < 0.5) {
            return fail(format!("solver epsilon {} not in (0, 0.5)", self.mpc.epsilon));
        }
        Ok(())
    }
}
