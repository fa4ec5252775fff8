//! Satellite selection rules.
//!
//! Every scan visits satellites in ascending id order and only replaces the
//! incumbent on a strictly better score, so ties go to the lowest id.  A
//! satellite scoring 0 is never selected.

use leo_core::{SatId, Tick, UserId};

use crate::strategy::Fallback;
use crate::World;

/// Argmax over `(sat, score)` pairs with a strict `>` and a zero floor.
fn argmax(scores: impl Iterator<Item = (SatId, f64)>) -> Option<(SatId, f64)> {
    scores.fold(None, |best: Option<(SatId, f64)>, (sat, score)| {
        if score > best.map_or(0.0, |b| b.1) { Some((sat, score)) } else { best }
    })
}

impl World {
    /// Highest shared rate at `t` for `user`.
    pub fn best_satellite(&self, user: UserId, t: Tick) -> Option<SatId> {
        argmax(self.registry.sat_ids().map(|sat| (sat, self.registry.shared_rate(sat, t, user))))
            .map(|(sat, _)| sat)
    }

    /// Longest run of consecutive serving ticks ending at `t` (MVT).
    pub fn mvt_satellite(&self, t: Tick) -> Option<SatId> {
        argmax(self.registry.sat_ids().map(|sat| (sat, self.visible_run(sat, t) as f64)))
            .map(|(sat, _)| sat)
    }

    /// Serving ticks of `sat` counted backwards from `t` while its rate is
    /// nonzero; tick 0 is never counted.
    pub fn visible_run(&self, sat: SatId, t: Tick) -> u64 {
        let mut run = 0;
        let mut cur = t.0;
        while cur > 0 && self.registry.unshared_rate(sat, Tick(cur)) != 0.0 {
            run += 1;
            cur -= 1;
        }
        run
    }

    /// Maximum rate at `t`.  With `smart`, the robust prediction with a
    /// warmed-up history replaces the instantaneous unshared rate.
    pub fn max_rate_satellite(&mut self, user: UserId, t: Tick, smart: bool) -> Option<SatId> {
        let past_len = self.config.mpc.past_len;
        let sats: Vec<SatId> = self.registry.sat_ids().collect();
        let scores: Vec<(SatId, f64)> = sats
            .into_iter()
            .map(|sat| {
                let score = if smart {
                    self.oracle.predict(&self.registry, Some(sat), user, t, true, Some(past_len))
                } else {
                    self.registry.unshared_rate(sat, t)
                };
                (sat, score)
            })
            .collect();
        argmax(scores.into_iter()).map(|(sat, _)| sat)
    }

    /// Best alternative to the user's current satellite by occupancy-shared
    /// prediction, skipping the current and previous satellites.
    pub fn runner_up_satellite(&mut self, user: UserId, t: Tick) -> Option<(SatId, f64)> {
        let state = &self.users[user.index()];
        let (cur, prev) = (state.cur_sat, state.prev_sat);
        let robust = self.config.mpc.robust;
        let sats: Vec<SatId> =
            self.registry.sat_ids().filter(|&s| s != cur && Some(s) != prev).collect();
        let scores: Vec<(SatId, f64)> = sats
            .into_iter()
            .map(|sat| (sat, self.oracle.predict_shared(&self.registry, sat, user, t, robust, None)))
            .collect();
        argmax(scores.into_iter())
    }

    /// Forced-handover target under `fallback`.
    pub fn fallback_satellite(&self, user: UserId, t: Tick, fallback: Fallback) -> Option<SatId> {
        match fallback {
            Fallback::BestRate => self.best_satellite(user, t),
            Fallback::MostVisibleTime => self.mvt_satellite(t),
        }
    }
}
