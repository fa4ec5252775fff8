//! Mutable simulation state of one trace.
//!
//! A [`World`] owns the satellite registry, the predictor histories and
//! every user's session.  It is `Clone`: the oracle search replays candidate
//! plans on throwaway copies and never touches the live world.  Traces,
//! chunk sizes and configuration are shared behind `Arc`s, so a clone only
//! copies the per-tick ledgers and user state.

use std::sync::Arc;

use tracing::debug;

use leo_core::{DeliveryShare, SatId, StreamConfig, Tick, UserId};
use leo_mpc::{QoeLog, UserView};
use leo_network::{BandwidthOracle, SatelliteRegistry};
use leo_trace::{Trace, VideoSizes};

use crate::user::UserState;
use crate::{SimError, SimResult};

#[derive(Clone, Debug)]
pub struct World {
    pub(crate) config:            Arc<StreamConfig>,
    pub(crate) trace:             Arc<Trace>,
    pub(crate) video:             Arc<VideoSizes>,
    pub(crate) registry:          SatelliteRegistry,
    pub(crate) oracle:            BandwidthOracle,
    pub(crate) users:             Vec<UserState>,
    /// Last dual-search plan of each user, for coupled strategies.
    pub(crate) qoe_logs:          Vec<Option<QoeLog>>,
    /// Set when a planned handover could not be applied or a forced one
    /// happened; the next centralized request re-plans.
    pub(crate) unexpected_change: bool,
}

impl World {
    /// Fresh state for `trace`: every user connects at tick 0 to the best
    /// satellite at the first playable tick.
    pub fn new(
        config: Arc<StreamConfig>,
        trace:  Arc<Trace>,
        video:  Arc<VideoSizes>,
        users:  usize,
    ) -> SimResult<World> {
        let registry = SatelliteRegistry::from_trace(&trace, config.sharing);
        let oracle = BandwidthOracle::new(config.mpc.past_window);
        let origin = trace.time().first().copied().unwrap_or(0.0);

        let mut world = World {
            config,
            trace,
            video,
            registry,
            oracle,
            users: Vec::with_capacity(users),
            qoe_logs: vec![None; users],
            unexpected_change: false,
        };

        let first = world.best_satellite(UserId(0), Tick::START).ok_or_else(|| {
            SimError::Config(format!("no satellite serves trace {:?} at its first tick", world.trace.name()))
        })?;
        for i in 0..users {
            let id = UserId(i as u32);
            world.registry.add_user(first, Tick::ZERO, id)?;
            world.users.push(UserState::new(id, &world.config, first, origin));
        }
        debug!(trace = world.trace.name(), users, sat = %first, "world initialised");
        Ok(world)
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn registry(&self) -> &SatelliteRegistry {
        &self.registry
    }

    pub fn users(&self) -> &[UserState] {
        &self.users
    }

    pub fn user(&self, user: UserId) -> SimResult<&UserState> {
        self.users
            .get(user.index())
            .ok_or(SimError::UnknownUser { user, users: self.users.len() })
    }

    #[inline]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Live user with the earliest simulated time; ties go to the lowest id.
    pub fn first_agent(&self) -> Option<UserId> {
        self.users
            .iter()
            .filter(|u| !u.end_of_video)
            .fold(None::<&UserState>, |best, u| match best {
                Some(b) if b.clock.last_time <= u.clock.last_time => Some(b),
                _ => Some(u),
            })
            .map(|u| u.id)
    }

    /// `true` once every user has finished its session.
    pub fn all_ended(&self) -> bool {
        self.users.iter().all(|u| u.end_of_video)
    }

    /// Delivery rate (Mbps) of user `u` on its current satellite at `t`.
    pub(crate) fn rate_mbps(&self, u: usize, t: Tick) -> f64 {
        let user = &self.users[u];
        match self.config.delivery_share {
            DeliveryShare::AllUsers => {
                self.registry.unshared_rate(user.cur_sat, t) / self.users.len().max(1) as f64
            }
            DeliveryShare::Registry => self.registry.shared_rate(user.cur_sat, t, user.id),
        }
    }

    /// User `u` as seen by a joint search: robust predictions of its current
    /// and runner-up satellites at its own trace pointer.
    pub(crate) fn user_view(&mut self, u: usize) -> UserView {
        let (id, cur, ptr) = (self.users[u].id, self.users[u].cur_sat, self.users[u].clock.ptr);
        let robust = self.config.mpc.robust;
        let past_len = Some(self.config.mpc.past_len);

        let cur_bw = self.oracle.predict(&self.registry, Some(cur), id, ptr, robust, past_len);
        let next_sat = self.runner_up_satellite(id, ptr).map(|(sat, _)| sat);
        let next_bw = self.oracle.predict(&self.registry, next_sat, id, ptr, robust, past_len);

        let user = &self.users[u];
        UserView {
            user:             id,
            cur_sat:          cur,
            next_sat,
            cur_bw,
            next_bw,
            start_buffer_s:   user.buffer_s(),
            last_quality:     user.last_quality,
            last_index:       user.chunk_index,
            chunks_remaining: user.chunks_remaining(self.config.total_chunks),
        }
    }

    /// Move user `u` to `to` at `t`, updating the registry and the user's
    /// connection log as one step.
    pub(crate) fn switch(&mut self, u: usize, to: SatId, t: Tick) -> SimResult<()> {
        let user = &mut self.users[u];
        if to == user.cur_sat {
            return Err(SimError::HandoverToSelf { user: user.id, sat: to });
        }
        self.registry.handover(user.id, user.cur_sat, to, t)?;
        debug!(user = %user.id, from = %user.cur_sat, to = %to, tick = %t, "handover");
        user.switch_to(to, t);
        Ok(())
    }
}
