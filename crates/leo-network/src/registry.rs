//! The satellite arena and its shared-rate queries.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use leo_core::{SatId, SharingPolicy, Tick, UserId};
use leo_trace::Trace;

use crate::{NetworkError, NetworkResult, Satellite};

/// All satellites of the current trace, keyed by id.
///
/// `BTreeMap` so that every scan visits satellites in ascending `SatId`
/// order; selection ties are therefore broken toward the lowest id.
///
/// `add_user`/`remove_user`/`handover` are the only mutators.  A handover is
/// always committed as a pair: removal from the source and insertion at the
/// destination at the same tick, or neither.
#[derive(Clone, Debug)]
pub struct SatelliteRegistry {
    sats:   BTreeMap<SatId, Satellite>,
    policy: SharingPolicy,
}

impl SatelliteRegistry {
    /// One empty-ledger satellite per trace series.
    pub fn from_trace(trace: &Trace, policy: SharingPolicy) -> Self {
        let sats = trace
            .satellites()
            .map(|(id, series)| (id, Satellite::new(id, Arc::clone(series))))
            .collect();
        Self { sats, policy }
    }

    #[inline]
    pub fn policy(&self) -> SharingPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.sats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sats.is_empty()
    }

    pub fn get(&self, sat: SatId) -> NetworkResult<&Satellite> {
        self.sats.get(&sat).ok_or(NetworkError::UnknownSatellite(sat))
    }

    fn get_mut(&mut self, sat: SatId) -> NetworkResult<&mut Satellite> {
        self.sats.get_mut(&sat).ok_or(NetworkError::UnknownSatellite(sat))
    }

    pub fn sat_ids(&self) -> impl Iterator<Item = SatId> + '_ {
        self.sats.keys().copied()
    }

    pub fn satellites(&self) -> impl Iterator<Item = &Satellite> + '_ {
        self.sats.values()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Users connected to `sat` at `t`; zero for unknown satellites.
    #[inline]
    pub fn user_count(&self, sat: SatId, t: Tick) -> usize {
        self.sats.get(&sat).map_or(0, |s| s.user_count(t))
    }

    pub fn users_at(&self, sat: SatId, t: Tick) -> Vec<UserId> {
        self.sats.get(&sat).map_or_else(Vec::new, |s| s.users_at(t))
    }

    /// Raw bandwidth of `sat` at `t`; zero for unknown satellites.
    #[inline]
    pub fn unshared_rate(&self, sat: SatId, t: Tick) -> f64 {
        self.sats.get(&sat).map_or(0.0, |s| s.unshared_rate(t))
    }

    /// Bandwidth `user` receives from `sat` at `t` under the registry's policy.
    #[inline]
    pub fn shared_rate(&self, sat: SatId, t: Tick, user: UserId) -> f64 {
        self.sats.get(&sat).map_or(0.0, |s| s.shared_rate(t, user, self.policy))
    }

    #[inline]
    pub fn is_visible(&self, sat: SatId, t: Tick) -> bool {
        self.unshared_rate(sat, t) > 0.0
    }

    /// Satellites visible at `t`, ascending.
    pub fn visible_at(&self, t: Tick) -> Vec<SatId> {
        self.sats.values().filter(|s| s.is_visible(t)).map(Satellite::id).collect()
    }

    /// Every satellite with at least one connected user at `t`, with its count.
    pub fn occupancy_all(&self, t: Tick) -> BTreeMap<SatId, usize> {
        self.sats
            .iter()
            .filter_map(|(id, s)| {
                let n = s.user_count(t);
                (n > 0).then_some((*id, n))
            })
            .collect()
    }

    /// Sum of user counts over all satellites at `t`.
    pub fn total_connected(&self, t: Tick) -> usize {
        self.sats.values().map(|s| s.user_count(t)).sum()
    }

    // ── Mutations ─────────────────────────────────────────────────────────

    pub fn add_user(&mut self, sat: SatId, t: Tick, user: UserId) -> NetworkResult<()> {
        debug!(%sat, %t, %user, "add_user");
        self.get_mut(sat)?.add_user(t, user)
    }

    pub fn remove_user(&mut self, sat: SatId, t: Tick, user: UserId) -> NetworkResult<()> {
        debug!(%sat, %t, %user, "remove_user");
        self.get_mut(sat)?.remove_user(t, user)
    }

    /// Move `user` from `from` to `to` at tick `t` as one transaction.
    ///
    /// Every precondition is checked before either side is touched, so a
    /// failed handover leaves the ledger unchanged.
    pub fn handover(&mut self, user: UserId, from: SatId, to: SatId, t: Tick) -> NetworkResult<()> {
        if from == to {
            return Err(NetworkError::HandoverToSelf { sat: from, user });
        }
        let source = self.get(from)?;
        if !source.is_connected(user) {
            return Err(NetworkError::NotConnected { sat: from, user });
        }
        if self.get(to)?.is_connected(user) {
            return Err(NetworkError::AlreadyConnected { sat: to, user });
        }
        self.remove_user(from, t, user)?;
        self.add_user(to, t, user)
    }

    // ── Fair-share ratios ─────────────────────────────────────────────────

    /// Store ratio-based shares for users of `sat`.
    pub fn set_share_ratios(
        &mut self,
        sat: SatId,
        ratios: impl IntoIterator<Item = (UserId, f64)>,
    ) -> NetworkResult<()> {
        self.get_mut(sat)?.set_ratios(ratios);
        Ok(())
    }

    pub fn clear_share_ratios(&mut self) {
        for s in self.sats.values_mut() {
            s.clear_ratios();
        }
    }
}
