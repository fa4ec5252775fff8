//! Robust harmonic-mean bandwidth prediction.
//!
//! For every `(user, satellite)` pair the oracle remembers the estimates it
//! produced and the relative error of each estimate against the rate later
//! observed at that tick.  A robust prediction is the harmonic mean of the
//! recent window divided by `1 + max(recent errors)`.
//!
//! The histories are part of the simulation state: a prediction is a
//! mutation, and two predictions at the same tick can differ.  Snapshots of
//! the world clone the oracle along with everything else.

use rustc_hash::FxHashMap;

use leo_core::{SatId, Tick, UserId};

use crate::{harmonic_mean, SatelliteRegistry};

#[derive(Clone, Debug, Default)]
struct History {
    estimates: Vec<f64>,
    errors:    Vec<f64>,
}

/// Per-(user, satellite) bandwidth predictor.
#[derive(Clone, Debug)]
pub struct BandwidthOracle {
    window:  usize,
    history: FxHashMap<(UserId, SatId), History>,
}

impl BandwidthOracle {
    /// `window` is both the harmonic-mean sample count and the number of
    /// recent errors considered by the robust discount.
    pub fn new(window: usize) -> Self {
        Self { window: window.max(1), history: FxHashMap::default() }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Forget every history.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Number of estimates recorded for `(user, sat)`.
    pub fn estimate_count(&self, user: UserId, sat: SatId) -> usize {
        self.history.get(&(user, sat)).map_or(0, |h| h.estimates.len())
    }

    /// Predict the unshared bandwidth of `sat` at `ptr` for `user`.
    ///
    /// `lookback`, when set, first replays predictions at
    /// `ptr - lookback ..= ptr - 2` so the error history is warm.
    pub fn predict(
        &mut self,
        registry: &SatelliteRegistry,
        sat:      Option<SatId>,
        user:     UserId,
        ptr:      Tick,
        robust:   bool,
        lookback: Option<usize>,
    ) -> f64 {
        let Some(sat) = sat else { return 0.0 };
        if ptr == Tick::ZERO {
            return registry.unshared_rate(sat, Tick::ZERO);
        }
        if let Some(n) = lookback {
            for i in (2..=n as u64).rev() {
                if ptr.0 > i {
                    self.predict(registry, Some(sat), user, Tick(ptr.0 - i), robust, None);
                }
            }
        }

        let rate = |t: u64| registry.unshared_rate(sat, Tick(t));
        let past_bw = rate(ptr.0 - 1);
        if past_bw == 0.0 {
            return rate(ptr.0);
        }
        self.record_error(user, sat, past_bw);

        let start = ptr.0.saturating_sub(self.window as u64);
        let samples: Vec<f64> = (start..ptr.0).map(rate).collect();
        let Some(estimate) = harmonic_mean(&samples) else {
            return rate(ptr.0);
        };
        self.finish(user, sat, estimate, robust)
    }

    /// Predict the bandwidth `user` would get from `sat` at `ptr` when the
    /// satellite's current occupancy shares it equally.
    ///
    /// Used to rank candidate satellites.  Returns 0 when the satellite is not
    /// visible at `ptr`.
    pub fn predict_shared(
        &mut self,
        registry: &SatelliteRegistry,
        sat:      SatId,
        user:     UserId,
        ptr:      Tick,
        robust:   bool,
        lookback: Option<usize>,
    ) -> f64 {
        if ptr == Tick::ZERO {
            return registry.unshared_rate(sat, Tick::ZERO);
        }
        if let Some(n) = lookback {
            for i in (2..=n as u64).rev() {
                if ptr.0 > i {
                    self.predict_shared(registry, sat, user, Tick(ptr.0 - i), robust, None);
                }
            }
        }

        let users = registry.user_count(sat, ptr);
        let share = |t: u64| {
            let raw = registry.unshared_rate(sat, Tick(t));
            if users == 0 { raw } else { raw / users as f64 }
        };
        let past_bw = share(ptr.0);
        if past_bw == 0.0 {
            return 0.0;
        }
        self.record_error(user, sat, past_bw);

        let start = ptr.0.saturating_sub(self.window as u64);
        let samples: Vec<f64> = (start..ptr.0).map(share).collect();
        let Some(estimate) = harmonic_mean(&samples) else {
            return share(ptr.0);
        };
        self.finish(user, sat, estimate, robust)
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn record_error(&mut self, user: UserId, sat: SatId, observed: f64) {
        let h = self.history.entry((user, sat)).or_default();
        let err = h.estimates.last().map_or(0.0, |est| (est - observed).abs() / observed);
        h.errors.push(err);
    }

    fn finish(&mut self, user: UserId, sat: SatId, estimate: f64, robust: bool) -> f64 {
        let window = self.window;
        let h = self.history.entry((user, sat)).or_default();
        h.estimates.push(estimate);
        if !robust {
            return estimate;
        }
        let from = h.errors.len().saturating_sub(window);
        let max_error = h.errors[from..].iter().copied().fold(0.0, f64::max);
        estimate / (1.0 + max_error)
    }
}
