//! A single satellite: bandwidth series plus occupancy ledger.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use leo_core::{SatId, SharingPolicy, Tick, UserId};

use crate::{NetworkError, NetworkResult};

/// One user's stay on a satellite.  `until` is exclusive; `None` while the
/// user is still connected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Session {
    user:  UserId,
    from:  Tick,
    until: Option<Tick>,
}

impl Session {
    #[inline]
    fn covers(&self, t: Tick) -> bool {
        self.from <= t && self.until.is_none_or(|u| t < u)
    }
}

/// A satellite as seen by the simulator.
///
/// `counts[t]` is the number of users connected at grid tick `t`.  A user
/// joining at `t` counts from `t` onward; leaving at `t` stops counting from
/// `t` onward.  Counts are never negative.
#[derive(Clone, Debug)]
pub struct Satellite {
    id:       SatId,
    trace:    Arc<[f64]>,
    counts:   Vec<u32>,
    sessions: Vec<Session>,
    /// Fractional shares set by a ratio-based centralized decision.
    ratios:   FxHashMap<UserId, f64>,
}

impl Satellite {
    pub fn new(id: SatId, trace: Arc<[f64]>) -> Self {
        let len = trace.len();
        Self {
            id,
            trace,
            counts:   vec![0; len],
            sessions: Vec::new(),
            ratios:   FxHashMap::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> SatId {
        self.id
    }

    #[inline]
    pub fn trace(&self) -> &Arc<[f64]> {
        &self.trace
    }

    // ── Occupancy ─────────────────────────────────────────────────────────

    /// Connect `user` from tick `t` onward.
    pub fn add_user(&mut self, t: Tick, user: UserId) -> NetworkResult<()> {
        if self.sessions.iter().any(|s| s.user == user && s.until.is_none()) {
            return Err(NetworkError::AlreadyConnected { sat: self.id, user });
        }
        let start = t.index().min(self.counts.len());
        for c in &mut self.counts[start..] {
            *c += 1;
        }
        self.sessions.push(Session { user, from: t, until: None });
        Ok(())
    }

    /// Disconnect `user` from tick `t` onward.
    ///
    /// Removing at a tick before the user joined closes the session empty.
    pub fn remove_user(&mut self, t: Tick, user: UserId) -> NetworkResult<()> {
        let sat = self.id;
        let session = self
            .sessions
            .iter_mut()
            .rev()
            .find(|s| s.user == user && s.until.is_none())
            .ok_or(NetworkError::NotConnected { sat, user })?;

        let end = t.max(session.from);
        let start = end.index().min(self.counts.len());
        if self.counts[start..].iter().any(|&c| c == 0) {
            return Err(NetworkError::OccupancyUnderflow { sat, tick: end, user });
        }
        for c in &mut self.counts[start..] {
            *c -= 1;
        }
        session.until = Some(end);
        self.ratios.remove(&user);
        Ok(())
    }

    /// Number of users connected at `t` (0 past the end of the trace).
    #[inline]
    pub fn user_count(&self, t: Tick) -> usize {
        self.counts.get(t.index()).copied().unwrap_or(0) as usize
    }

    /// Users connected at `t`, ascending.
    pub fn users_at(&self, t: Tick) -> Vec<UserId> {
        let mut users: Vec<UserId> =
            self.sessions.iter().filter(|s| s.covers(t)).map(|s| s.user).collect();
        users.sort_unstable();
        users.dedup();
        users
    }

    /// `true` while `user` has an open session.
    pub fn is_connected(&self, user: UserId) -> bool {
        self.sessions.iter().any(|s| s.user == user && s.until.is_none())
    }

    // ── Rates ─────────────────────────────────────────────────────────────

    /// Raw trace bandwidth (Mbps) at `t`; zero past the end.
    #[inline]
    pub fn unshared_rate(&self, t: Tick) -> f64 {
        self.trace.get(t.index()).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn is_visible(&self, t: Tick) -> bool {
        self.unshared_rate(t) > 0.0
    }

    /// Bandwidth `user` receives at `t` under `policy`.
    ///
    /// Resource-fair divides by `max(count, 1)`.  Ratio-based multiplies by
    /// the user's stored share when the satellite is contended and a share
    /// was set, and falls back to the equal split otherwise.
    pub fn shared_rate(&self, t: Tick, user: UserId, policy: SharingPolicy) -> f64 {
        let raw = self.unshared_rate(t);
        let count = self.user_count(t).max(1);
        match policy {
            SharingPolicy::RatioBased if count > 1 => match self.ratios.get(&user) {
                Some(ratio) => raw * ratio,
                None => raw / count as f64,
            },
            _ => raw / count as f64,
        }
    }

    // ── Fair-share ratios ─────────────────────────────────────────────────

    pub fn set_ratios(&mut self, ratios: impl IntoIterator<Item = (UserId, f64)>) {
        self.ratios.clear();
        self.ratios.extend(ratios);
    }

    pub fn ratio(&self, user: UserId) -> Option<f64> {
        self.ratios.get(&user).copied()
    }

    pub fn clear_ratios(&mut self) {
        self.ratios.clear();
    }
}
