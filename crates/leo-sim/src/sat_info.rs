//! Post-chunk observation of the current, runner-up and other satellites.

use std::collections::BTreeMap;

use leo_core::{SatId, Tick, UserId};

use crate::outcome::SatelliteInfo;
use crate::World;

/// Ticks averaged for the other-satellite logs.
const OTHER_WINDOW: u64 = 5;

impl World {
    /// Observation of `user` at tick `ptr`.
    ///
    /// - Current satellite: rate over `ptr - past_len ..= ptr - 2`, divided
    ///   by its occupancy at `ptr`.
    /// - Runner-up: the nonzero rates over the same window, divided by
    ///   `occupancy + 1`.
    /// - Others: nonzero rates over the last five ticks, divided by
    ///   `occupancy + 1`; the best of them by mean is left out of the maps.
    pub fn next_sat_info(&mut self, user: UserId, ptr: Tick) -> SatelliteInfo {
        let cur = self.users[user.index()].cur_sat;
        let past_len = self.config.mpc.past_len as u64;

        let shared_log = |world: &World, sat: SatId, from: u64, to: u64, join: bool, skip_zero: bool| {
            let users = world.registry.user_count(sat, ptr) as f64;
            let divisor = if users == 0.0 { 1.0 } else if join { users + 1.0 } else { users };
            (to..=from)
                .rev()
                .filter_map(|back| ptr.back(back))
                .map(|t| world.registry.unshared_rate(sat, t))
                .filter(|&raw| !skip_zero || raw != 0.0)
                .map(|raw| raw / divisor)
                .collect::<Vec<f64>>()
        };

        // ── Other satellites ──────────────────────────────────────────────
        let mut other_users = BTreeMap::new();
        let mut other_bw_logs = BTreeMap::new();
        let mut best: Option<(SatId, f64)> = None;
        for sat in self.registry.sat_ids().filter(|&s| s != cur) {
            let log = shared_log(self, sat, OTHER_WINDOW, 1, true, true);
            if log.is_empty() {
                continue;
            }
            let mean = log.iter().sum::<f64>() / log.len() as f64;
            if mean > best.map_or(0.0, |b| b.1) {
                best = Some((sat, mean));
            }
            other_users.insert(sat, self.registry.user_count(sat, ptr));
            other_bw_logs.insert(sat, log);
        }
        if let Some((sat, _)) = best {
            other_users.remove(&sat);
            other_bw_logs.remove(&sat);
        }

        // ── Current and runner-up ─────────────────────────────────────────
        let cur_bw_log = shared_log(self, cur, past_len, 2, false, false);
        let cur_up = self.visible_run(cur, ptr.back(1).unwrap_or(Tick::ZERO));

        let next_sat = self.runner_up_satellite(user, ptr).map(|(sat, _)| sat);
        let (next_bw_log, next_up) = match next_sat {
            Some(sat) => (
                shared_log(self, sat, past_len, 2, true, true),
                self.visible_run(sat, ptr.back(1).unwrap_or(Tick::ZERO)),
            ),
            None => (Vec::new(), 0),
        };

        SatelliteInfo {
            cur_bw_log,
            next_sat,
            next_bw_log,
            up_time: [cur_up, next_up],
            other_users,
            other_bw_logs,
        }
    }
}
