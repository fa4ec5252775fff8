//! The video bitrate ladder.

use crate::{CoreError, CoreResult, Quality};

/// Bitrate levels available to the player, lowest first.
///
/// The MPC search only considers every `stride`-th level (`0, 2, 4` for the
/// default six-level ladder), so a quality index passed to the orchestrator
/// must be one of [`BitrateLadder::searchable`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BitrateLadder {
    /// Bitrate of each level in kbps.
    pub kbps:      Vec<f64>,
    /// Integer-valued reward per level used by the HD reward mode.
    pub hd_reward: Vec<f64>,
    /// Search stride over the ladder.
    pub stride:    u8,
}

impl BitrateLadder {
    #[inline]
    pub fn levels(&self) -> usize {
        self.kbps.len()
    }

    /// Number of levels the search enumerates per chunk.
    #[inline]
    pub fn searchable_count(&self) -> usize {
        self.levels().div_ceil(self.stride.max(1) as usize)
    }

    /// The searchable quality levels in ascending order.
    pub fn searchable(&self) -> Vec<Quality> {
        (0..self.searchable_count())
            .map(|i| Quality((i * self.stride.max(1) as usize) as u8))
            .collect()
    }

    /// `true` if `q` is one of the searchable levels.
    pub fn is_searchable(&self, q: Quality) -> bool {
        q.index() < self.levels() && q.0 % self.stride.max(1) == 0
    }

    #[inline]
    pub fn kbps(&self, q: Quality) -> f64 {
        self.kbps[q.index()]
    }

    #[inline]
    pub fn hd_reward(&self, q: Quality) -> f64 {
        self.hd_reward[q.index()]
    }

    /// Bounds-checked level lookup.
    pub fn check(&self, q: Quality) -> CoreResult<Quality> {
        if q.index() < self.levels() {
            Ok(q)
        } else {
            Err(CoreError::QualityOutOfRange(q))
        }
    }
}

impl Default for BitrateLadder {
    fn default() -> Self {
        Self {
            kbps:      vec![300.0, 750.0, 1200.0, 1850.0, 2850.0, 4300.0],
            hd_reward: vec![1.0, 2.0, 3.0, 6.0, 9.0, 14.0],
            stride:    2,
        }
    }
}
