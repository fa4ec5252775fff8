//! The multi-user orchestrator.

use std::sync::Arc;

use tracing::{debug, info};

use leo_core::{
    CandidateScope, Predictor, Quality, SatId, SharingPolicy, StreamConfig, Tick, UserId, MS_IN_S,
};
use leo_mpc::{Candidate, DualInput, JointInput, MpcEngine, QoeLog, SoloInput};
use leo_network::holt_winters_forecast;
use leo_trace::{TraceSet, VideoSizes};

use crate::outcome::{CentralPlan, ChunkOutcome};
use crate::strategy::{Fallback, Strategy, StrategyGroup};
use crate::user::PendingHandover;
use crate::{SimError, SimResult, World};

/// What the decision step hands to delivery.
struct Step {
    quality:     Quality,
    fallback:    Fallback,
    /// Penalty of a handover applied before the transfer (s).
    pre_delay_s: f64,
    handover:    bool,
    central:     Option<CentralPlan>,
}

impl Step {
    fn plain(quality: Quality, fallback: Fallback) -> Self {
        Self { quality, fallback, pre_delay_s: 0.0, handover: false, central: None }
    }
}

/// Owns the trace set, the decision engine and the live [`World`] of the
/// current trace.
///
/// One [`Environment::get_video_chunk`] call runs the strategy's decision
/// for one user, delivers one chunk and returns the observation.  Calls are
/// processed to completion one at a time; use
/// [`Environment::first_agent`] to keep users in simulated-time order.
///
/// Create via [`EnvironmentBuilder`][crate::EnvironmentBuilder].
pub struct Environment {
    config:    Arc<StreamConfig>,
    traces:    TraceSet,
    trace_idx: usize,
    engine:    MpcEngine,
    video:     Arc<VideoSizes>,
    users:     usize,
    pub(crate) world: World,
}

impl Environment {
    pub(crate) fn new(
        config: Arc<StreamConfig>,
        traces: TraceSet,
        video:  Arc<VideoSizes>,
        users:  usize,
    ) -> SimResult<Self> {
        let trace = traces
            .get(0)
            .cloned()
            .ok_or_else(|| SimError::Config("trace set is empty".into()))?;
        let world = World::new(Arc::clone(&config), trace, Arc::clone(&video), users)?;
        let engine = MpcEngine::new(&config, Arc::clone(&video));
        Ok(Self { config, traces, trace_idx: 0, engine, video, users, world })
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn engine(&self) -> &MpcEngine {
        &self.engine
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Index of the current trace in the trace set.
    pub fn trace_index(&self) -> usize {
        self.trace_idx
    }

    pub fn trace_name(&self) -> &str {
        self.world.trace().name()
    }

    pub fn traces(&self) -> &TraceSet {
        &self.traces
    }

    #[inline]
    pub fn user_count(&self) -> usize {
        self.users
    }

    /// Live user furthest behind in simulated time.
    pub fn first_agent(&self) -> Option<UserId> {
        self.world.first_agent()
    }

    pub fn all_ended(&self) -> bool {
        self.world.all_ended()
    }

    pub fn last_quality(&self, user: UserId) -> SimResult<Quality> {
        Ok(self.world.user(user)?.last_quality)
    }

    // ── Episode control ───────────────────────────────────────────────────

    /// Move to the next trace, wrapping to the first, and rebuild every
    /// user and satellite from scratch.
    pub fn reset(&mut self) -> SimResult<()> {
        self.trace_idx = self.traces.next_index(self.trace_idx);
        let trace = self
            .traces
            .get(self.trace_idx)
            .cloned()
            .ok_or_else(|| SimError::Config(format!("trace index {} out of range", self.trace_idx)))?;
        self.world = World::new(Arc::clone(&self.config), trace, Arc::clone(&self.video), self.users)?;
        info!(trace = self.trace_name(), index = self.trace_idx, "environment reset");
        Ok(())
    }

    // ── Chunk requests ────────────────────────────────────────────────────

    /// Decide and deliver the next chunk of `user`.
    ///
    /// With `strategy == None` the caller's `quality` is delivered as-is on
    /// the current satellite.  Otherwise the strategy picks the quality and
    /// any handover; `quality` is only validated.  `do_mpc` forces a
    /// centralized strategy to re-plan on this request.
    ///
    /// # Errors
    ///
    /// - [`SimError::UnknownUser`] / [`SimError::SessionEnded`] for a bad user.
    /// - [`SimError::InvalidQuality`] if `quality` is not a searchable level.
    /// - Bookkeeping invariant violations from the registry or the engine.
    pub fn get_video_chunk(
        &mut self,
        quality:  Quality,
        user:     UserId,
        strategy: Option<Strategy>,
        do_mpc:   bool,
    ) -> SimResult<ChunkOutcome> {
        if self.world.user(user)?.end_of_video {
            return Err(SimError::SessionEnded(user));
        }
        if !self.config.ladder.is_searchable(quality) {
            return Err(SimError::InvalidQuality(quality));
        }
        let u = user.index();

        let step = match strategy {
            Some(s) => match s.group() {
                StrategyGroup::Centralized => self.centralized_step(u, s, do_mpc)?,
                StrategyGroup::Distributed => self.distributed_step(u, s)?,
                StrategyGroup::Separate => self.separate_step(u, s)?,
            },
            None => Step::plain(quality, Fallback::default()),
        };
        let Step { quality, fallback, pre_delay_s, handover, central } = step;

        self.world.users[u].step_snr();
        let delivery = self.world.deliver(u, quality, fallback, pre_delay_s)?;

        let state = &mut self.world.users[u];
        state.last_quality = quality;
        let cur_sat = state.cur_sat;
        state.record_decision(cur_sat);
        let ptr = state.clock.ptr;
        let chunk_index = state.chunk_index;

        let next_chunk_sizes = if delivery.end_of_video {
            Vec::new()
        } else {
            self.video.options(chunk_index).unwrap_or_default()
        };
        let sat_info = (!delivery.end_of_video).then(|| self.world.next_sat_info(user, ptr));
        let registry = self.world.registry();
        let cur_users = registry.user_count(cur_sat, ptr);
        let next_users = sat_info
            .as_ref()
            .and_then(|info| info.next_sat)
            .map_or(0, |sat| registry.user_count(sat, ptr));
        let other_buffers_s =
            self.world.users().iter().filter(|o| o.id != user).map(|o| o.buffer_s()).collect();

        debug!(
            user = %user,
            quality = %quality,
            sat = %cur_sat,
            delay_ms = delivery.delay_ms,
            rebuffer_ms = delivery.rebuffer_ms,
            buffer_ms = delivery.buffer_ms,
            forced = delivery.forced,
            "chunk delivered"
        );

        Ok(ChunkOutcome {
            user,
            quality,
            delay_ms:         delivery.delay_ms,
            sleep_ms:         delivery.sleep_ms,
            buffer_s:         delivery.buffer_ms / MS_IN_S,
            rebuffer_s:       delivery.rebuffer_ms / MS_IN_S,
            chunk_size:       delivery.chunk_size,
            next_chunk_sizes,
            end_of_video:     delivery.end_of_video,
            chunks_remaining: delivery.chunks_remaining,
            handover:         handover || delivery.forced > 0,
            forced:           delivery.forced,
            cur_sat,
            cur_users,
            next_users,
            sat_info,
            central,
            other_buffers_s,
        })
    }

    // ── Centralized ───────────────────────────────────────────────────────

    fn centralized_step(&mut self, u: usize, strategy: Strategy, do_mpc: bool) -> SimResult<Step> {
        let mut central = None;
        if u == 0 || do_mpc || self.world.unexpected_change {
            let plan = self.central_plan(u, strategy)?;
            self.commit(&plan)?;
            central = Some(plan);
        }

        let (pre_delay_s, handover) = self.fire_pending(u)?;
        let state = &mut self.world.users[u];
        let quality = state.queued.pop_front().unwrap_or(state.last_quality);
        Ok(Step { quality, fallback: strategy.fallback(), pre_delay_s, handover, central })
    }

    /// Joint plan over every live user, decided by user `u`.
    fn central_plan(&mut self, u: usize, strategy: Strategy) -> SimResult<CentralPlan> {
        let decider = self.world.users[u].id;
        if strategy == Strategy::Oracle {
            return self.world.oracle_plan(&self.engine, decider);
        }

        let live: Vec<usize> = (0..self.users).filter(|&i| !self.world.users[i].end_of_video).collect();
        let index = live.iter().position(|&i| i == u).ok_or(SimError::SessionEnded(decider))?;
        let views: Vec<_> = live.iter().map(|&i| self.world.user_view(i)).collect();

        let tuning = self.engine.tuning();
        let buf_ratio = if tuning.adaptive_buffer && self.world.unexpected_change {
            tuning.buf_ratio_combo
        } else {
            tuning.buf_ratio
        };
        let input = JointInput { users: views, decider: index, buf_ratio };
        let ratio = self.config.sharing == SharingPolicy::RatioBased;
        let decision = match strategy {
            Strategy::CentralizedReduced => self.engine.reduced(&input, ratio)?,
            Strategy::CentralizedExhaustive => self.engine.exhaustive(&input, ratio)?,
            other => return Err(SimError::Config(format!("{other} is not a joint search"))),
        };

        Ok(CentralPlan {
            decider,
            users: live.iter().map(|&i| self.world.users[i].id).collect(),
            decision,
        })
    }

    /// Queue every covered user's combo and handover countdown, and install
    /// the solved shares.
    fn commit(&mut self, plan: &CentralPlan) -> SimResult<()> {
        let horizon = self.engine.horizon();
        let d = &plan.decision;
        for (k, id) in plan.users.iter().enumerate() {
            let Some(chunk_plan) = d.plan(k) else { continue };
            let state = &mut self.world.users[id.index()];
            state.queued = chunk_plan.combo.iter().copied().collect();
            state.pending = match chunk_plan.target {
                Some(target) if chunk_plan.hands_over(horizon) => {
                    Some(PendingHandover { target, countdown: chunk_plan.ho_index })
                }
                _ => None,
            };
        }

        self.world.registry.clear_share_ratios();
        if let Some(ratios) = &d.ratios {
            for (sat, shares) in ratios {
                self.world.registry.set_share_ratios(*sat, shares.iter().copied())?;
            }
        }
        self.world.unexpected_change = false;
        info!(decider = %plan.decider, ho = ?d.ho, mean_reward = d.mean_reward(), "centralized plan committed");
        Ok(())
    }

    /// Count down user `u`'s scheduled handover, applying it when due.
    fn fire_pending(&mut self, u: usize) -> SimResult<(f64, bool)> {
        let Some(pending) = self.world.users[u].pending else {
            return Ok((0.0, false));
        };
        if pending.countdown > 0 {
            self.world.users[u].pending =
                Some(PendingHandover { countdown: pending.countdown - 1, ..pending });
            return Ok((0.0, false));
        }
        self.world.users[u].pending = None;
        self.planned_handover(u, pending.target)
    }

    /// Switch user `u` to `target` at its current tick.  A target that is
    /// already serving the user or is not visible marks an unexpected change
    /// instead.
    ///
    /// Returns the handover penalty (s) and whether a switch happened.
    fn planned_handover(&mut self, u: usize, target: SatId) -> SimResult<(f64, bool)> {
        let state = &self.world.users[u];
        let (id, cur, ptr) = (state.id, state.cur_sat, state.clock.ptr);
        if target == cur || !self.world.registry.is_visible(target, ptr) {
            debug!(user = %id, sat = %cur, target = %target, tick = %ptr, "planned handover not applicable");
            self.world.unexpected_change = true;
            return Ok((0.0, false));
        }
        self.world.switch(u, target, ptr)?;
        Ok((self.config.handover_delay_s, true))
    }

    // ── Distributed ───────────────────────────────────────────────────────

    fn distributed_step(&mut self, u: usize, strategy: Strategy) -> SimResult<Step> {
        let input = self.dual_input(u, strategy);
        let peers: Vec<QoeLog> = if strategy.couples_users() {
            self.world.qoe_logs.iter().flatten().cloned().collect()
        } else {
            Vec::new()
        };

        let decision = self.engine.handover_dist(&input, &peers);
        if strategy.couples_users() {
            self.world.qoe_logs[u] = decision.log.clone();
        }

        let plan = decision.plan();
        let (pre_delay_s, handover) = match plan.target {
            Some(target) if plan.ho_index == 0 && target != input.cur_sat => self.planned_handover(u, target)?,
            _ => (0.0, false),
        };
        let quality = plan.combo.first().copied().unwrap_or(input.last_quality);
        Ok(Step { quality, fallback: strategy.fallback(), pre_delay_s, handover, central: None })
    }

    /// Predictions and candidates of user `u`'s dual search.
    pub(crate) fn dual_input(&mut self, u: usize, strategy: Strategy) -> DualInput {
        let Self { world, engine, users, .. } = self;
        let n = *users;
        let tuning = engine.tuning();
        let (robust, past_len) = (tuning.robust, Some(tuning.past_len));

        let state = &world.users[u];
        let (id, cur, ptr) = (state.id, state.cur_sat, state.clock.ptr);
        let cur_users = world.registry.user_count(cur, ptr);

        let harmonic = tuning.divisors.dual_current.apply(
            world.oracle.predict(&world.registry, Some(cur), id, ptr, robust, past_len),
            cur_users,
            n,
        );
        let cur_bw = match tuning.predictor {
            Predictor::HarmonicMean => harmonic,
            Predictor::HoltWinters => {
                let log = &world.users[u].download_bw;
                let from = log.len().saturating_sub(tuning.past_window);
                holt_winters_forecast(&log[from..]).filter(|bw| *bw > 0.0).unwrap_or(harmonic)
            }
        };

        let sats: Vec<SatId> = match tuning.candidates.unwrap_or(strategy.candidate_scope()) {
            CandidateScope::RunnerUp => world.runner_up_satellite(id, ptr).map(|(sat, _)| sat).into_iter().collect(),
            CandidateScope::AllVisible => world.registry.visible_at(ptr).into_iter().filter(|&s| s != cur).collect(),
        };

        let prev = ptr.back(1).unwrap_or(Tick::ZERO);
        let cur_prev = world.registry.unshared_rate(cur, prev) / cur_users.max(1) as f64;
        let candidates = sats
            .into_iter()
            .map(|sat| {
                let users = world.registry.user_count(sat, ptr);
                let bw = match tuning.predictor {
                    // Scale the forecast by the rate ratio one tick back.
                    Predictor::HoltWinters if cur_prev > 0.0 => {
                        cur_bw * world.registry.unshared_rate(sat, prev) / cur_prev
                    }
                    _ => tuning.divisors.dual_candidate.apply(
                        world.oracle.predict(&world.registry, Some(sat), id, ptr, robust, past_len),
                        users,
                        n,
                    ),
                };
                Candidate { sat, bw, users }
            })
            .collect();

        let state = &world.users[u];
        DualInput {
            user:             id,
            cur_sat:          cur,
            cur_bw,
            cur_users,
            last_quality:     state.last_quality,
            start_buffer_s:   state.buffer_s(),
            last_index:       state.chunk_index,
            chunks_remaining: state.chunks_remaining(world.config.total_chunks),
            candidates,
        }
    }

    // ── Separate ──────────────────────────────────────────────────────────

    fn separate_step(&mut self, u: usize, strategy: Strategy) -> SimResult<Step> {
        let Self { world, engine, users, config, .. } = self;
        let tuning = engine.tuning();
        let state = &world.users[u];
        let (id, cur, ptr) = (state.id, state.cur_sat, state.clock.ptr);

        let raw = world.oracle.predict(&world.registry, Some(cur), id, ptr, tuning.robust, Some(tuning.past_len));
        let bw = tuning.divisors.separate.apply(raw, world.registry.user_count(cur, ptr), *users);
        let state = &world.users[u];
        let last_quality = state.last_quality;
        let choice = engine.calculate_mpc(&SoloInput {
            last_quality,
            start_buffer_s:   state.buffer_s(),
            last_index:       state.chunk_index,
            chunks_remaining: state.chunks_remaining(config.total_chunks),
            bw,
        });
        let quality = choice.combo.first().copied().unwrap_or(last_quality);

        let (pre_delay_s, handover) = match strategy {
            Strategy::Mrss | Strategy::MrssSmart => {
                match world.max_rate_satellite(id, ptr, strategy == Strategy::MrssSmart) {
                    Some(best) if best != cur => {
                        world.switch(u, best, ptr)?;
                        (config.handover_delay_s, true)
                    }
                    _ => (0.0, false),
                }
            }
            _ => (0.0, false),
        };
        Ok(Step { quality, fallback: strategy.fallback(), pre_delay_s, handover, central: None })
    }
}
