//! Integration tests for leo-sim.

use std::collections::BTreeMap;

use leo_core::{MpcTuning, Predictor, Quality, SatId, SharingPolicy, StreamConfig, Tick, UserId};
use leo_trace::{Trace, TraceSet, VideoSizes};

use crate::{
    ChunkRecord, EnvironmentBuilder, Environment, EpisodeSummary, EvalRunner, NoopObserver,
    RunSummary, SimError, SimObserver, Strategy, StrategyGroup,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

const MB: u64 = 1_000_000;

fn config(total_chunks: usize) -> StreamConfig {
    StreamConfig { total_chunks, ..StreamConfig::default() }
}

fn with_mpc(total_chunks: usize, mpc: MpcTuning) -> StreamConfig {
    StreamConfig { total_chunks, mpc, ..StreamConfig::default() }
}

/// Trace on a one-second grid.
fn trace(name: &str, series: &[(u32, Vec<f64>)]) -> Trace {
    let len = series[0].1.len();
    let bw: BTreeMap<SatId, Vec<f64>> = series.iter().map(|(id, s)| (SatId(*id), s.clone())).collect();
    Trace::new(name, (0..len).map(|t| t as f64).collect(), bw).unwrap()
}

/// Satellite 1 drops out at ticks 4-5; satellite 2 appears at tick 2.
fn handover_trace() -> Trace {
    trace("handover", &[
        (1, vec![5.0, 5.0, 5.0, 5.0, 0.0, 0.0, 5.0, 5.0]),
        (2, vec![0.0, 0.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0]),
    ])
}

/// Two equally good satellites for `len` ticks.
fn twin_trace(len: usize) -> Trace {
    trace("twin", &[(1, vec![10.0; len]), (2, vec![10.0; len])])
}

/// Satellite 1 starts best and collapses to 1 Mbps; satellite 2 rises to 20.
fn fading_trace() -> Trace {
    let mut one = vec![10.0; 3];
    one.extend(vec![1.0; 37]);
    let mut two = vec![5.0; 3];
    two.extend(vec![20.0; 37]);
    trace("fading", &[(1, one), (2, two)])
}

/// Every level `bytes` per chunk.
fn flat_video(bytes: u64, chunks: usize) -> VideoSizes {
    VideoSizes::new(vec![vec![bytes; chunks]; 6]).unwrap()
}

fn ladder_video(cfg: &StreamConfig) -> VideoSizes {
    VideoSizes::from_ladder(&cfg.ladder, cfg.chunk_len_s(), cfg.total_chunks).unwrap()
}

fn build(cfg: StreamConfig, traces: Vec<Trace>, video: VideoSizes, users: usize) -> Environment {
    EnvironmentBuilder::new(cfg, TraceSet::new(traces).unwrap(), video).users(users).build().unwrap()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

/// Play `strategy` until every user has finished, returning every outcome.
fn play(env: &mut Environment, strategy: Option<Strategy>) -> Vec<crate::ChunkOutcome> {
    let mut out = Vec::new();
    while let Some(user) = env.first_agent() {
        out.push(env.get_video_chunk(Quality(0), user, strategy, false).unwrap());
    }
    out
}

#[derive(Default)]
struct Collect {
    chunks:   Vec<ChunkRecord>,
    episodes: Vec<EpisodeSummary>,
    runs:     usize,
}

impl SimObserver for Collect {
    fn on_chunk(&mut self, record: &ChunkRecord) {
        self.chunks.push(record.clone());
    }

    fn on_episode_end(&mut self, summary: &EpisodeSummary) {
        self.episodes.push(summary.clone());
    }

    fn on_run_end(&mut self, _summary: &RunSummary) {
        self.runs += 1;
    }
}

// ── Builder validation ────────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        let env = build(config(2), vec![handover_trace()], flat_video(MB, 2), 1);
        assert_eq!(env.user_count(), 1);
        assert_eq!(env.trace_name(), "handover");
        assert_eq!(env.world().users()[0].cur_sat, SatId(1));
    }

    #[test]
    fn zero_users_rejected() {
        let result = EnvironmentBuilder::new(
            config(2),
            TraceSet::new(vec![handover_trace()]).unwrap(),
            flat_video(MB, 2),
        )
        .users(0)
        .build();
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn short_video_rejected() {
        let result = EnvironmentBuilder::new(
            config(10),
            TraceSet::new(vec![handover_trace()]).unwrap(),
            flat_video(MB, 2),
        )
        .build();
        assert!(matches!(result, Err(SimError::Trace(_))));
    }

    #[test]
    fn invalid_config_rejected() {
        let cfg = StreamConfig { payload_portion: 0.0, ..config(2) };
        let result =
            EnvironmentBuilder::new(cfg, TraceSet::new(vec![handover_trace()]).unwrap(), flat_video(MB, 2))
                .build();
        assert!(matches!(result, Err(SimError::Core(_))));
    }

    #[test]
    fn trace_without_serving_satellite_rejected() {
        let dark = trace("dark", &[(1, vec![0.0; 4])]);
        let result =
            EnvironmentBuilder::new(config(2), TraceSet::new(vec![dark]).unwrap(), flat_video(MB, 2)).build();
        assert!(matches!(result, Err(SimError::Config(_))));
    }
}

// ── Strategies ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod strategy_tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for s in Strategy::ALL {
            assert_eq!(s.name().parse::<Strategy>().unwrap(), s);
            assert_eq!(s.to_string(), s.name());
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = "BOLA".parse::<Strategy>().unwrap_err();
        assert!(matches!(err, SimError::UnknownStrategy(name) if name == "BOLA"));
    }

    #[test]
    fn groups() {
        assert_eq!(Strategy::Oracle.group(), StrategyGroup::Centralized);
        assert_eq!(Strategy::CentralizedReduced.group(), StrategyGroup::Centralized);
        assert_eq!(Strategy::DualMpcCentralization.group(), StrategyGroup::Distributed);
        assert_eq!(Strategy::ManifoldMpc.group(), StrategyGroup::Distributed);
        assert_eq!(Strategy::MrssSmart.group(), StrategyGroup::Separate);
        assert!(Strategy::DualMpcCentralization.couples_users());
        assert!(!Strategy::DualMpc.couples_users());
    }
}

// ── Delivery ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod delivery_tests {
    use super::*;

    #[test]
    fn forced_handover_adds_exactly_one_penalty() {
        let mut env = build(config(2), vec![handover_trace()], flat_video(3 * MB, 2), 1);
        let out = env.get_video_chunk(Quality(0), UserId(0), None, false).unwrap();

        // Ticks 1-3 on satellite 1 at 5 Mbps, switch at tick 4, then 3 Mbps.
        let sent_before = 3.0 * 625_000.0 * 0.95;
        let per_tick_after = 375_000.0 * 0.95;
        let left = 3_000_000.0 - sent_before - 3.0 * per_tick_after;
        let expected = (3.0 + 0.2 + 3.0 + left / (375_000.0 * 0.95)) * 1_000.0 + 80.0;

        assert_eq!(out.forced, 1);
        assert!(out.handover);
        assert_eq!(out.cur_sat, SatId(2));
        assert!(approx(out.delay_ms, expected), "delay {} != {expected}", out.delay_ms);
    }

    #[test]
    fn fast_chunk_completes_mid_tick() {
        let cfg = config(2);
        let mut env = build(cfg, vec![twin_trace(10)], flat_video(MB, 2), 1);
        let out = env.get_video_chunk(Quality(0), UserId(0), None, false).unwrap();

        let secs = 1_000_000.0 / 1_250_000.0 / 0.95;
        assert!(approx(out.delay_ms, secs * 1_000.0 + 80.0));
        assert!(approx(out.rebuffer_s, out.delay_ms / 1_000.0));
        assert!(approx(out.buffer_s, 4.0));
        assert_eq!(out.forced, 0);
        let clock = env.world().users()[0].clock;
        assert_eq!(clock.ptr, Tick(1));
        assert!(approx(clock.last_time, secs));
    }

    #[test]
    fn overfull_buffer_sleeps_in_quanta() {
        let cfg = StreamConfig { buffer_thresh_ms: 2_000.0, ..config(2) };
        let mut env = build(cfg, vec![twin_trace(20)], flat_video(MB, 2), 1);
        let out = env.get_video_chunk(Quality(0), UserId(0), None, false).unwrap();

        let secs = 1_000_000.0 / 1_250_000.0 / 0.95;
        assert!(approx(out.sleep_ms, 2_000.0));
        assert!(approx(out.buffer_s, 2.0));
        let clock = env.world().users()[0].clock;
        assert!(approx(clock.last_time, secs + 2.0));
        assert_eq!(clock.ptr, Tick(3));
    }

    #[test]
    fn satellite_lost_while_draining_is_replaced() {
        let cfg = StreamConfig { buffer_thresh_ms: 2_000.0, ..config(2) };
        let mut one = vec![10.0; 3];
        one.extend(vec![0.0; 17]);
        let mut two = vec![0.0; 3];
        two.extend(vec![10.0; 17]);
        let mut env = build(cfg, vec![trace("drain", &[(1, one), (2, two)])], flat_video(MB, 2), 1);
        let out = env.get_video_chunk(Quality(0), UserId(0), None, false).unwrap();

        // Satellite 1 goes dark at tick 3, halfway through the 2 s sleep.
        let secs = 1_000_000.0 / 1_250_000.0 / 0.95;
        assert_eq!(out.forced, 1);
        assert!(approx(out.sleep_ms, 2_000.0));
        assert!(approx(out.delay_ms, secs * 1_000.0 + 80.0 + 200.0), "delay {}", out.delay_ms);
        assert_eq!(out.cur_sat, SatId(2));
        let registry = env.world().registry();
        assert_eq!(registry.user_count(SatId(1), Tick(3)), 0);
        assert_eq!(registry.user_count(SatId(2), Tick(3)), 1);
    }

    #[test]
    fn buffer_never_negative() {
        let mut env = build(config(6), vec![handover_trace()], flat_video(MB / 2, 6), 2);
        for out in play(&mut env, None) {
            assert!(out.buffer_s >= 0.0);
            assert!(out.rebuffer_s >= 0.0);
            assert!(out.other_buffers_s.iter().all(|b| *b >= 0.0));
        }
    }

    #[test]
    fn session_ends_after_last_chunk() {
        let mut env = build(config(2), vec![twin_trace(20)], flat_video(MB, 2), 1);
        let first = env.get_video_chunk(Quality(0), UserId(0), None, false).unwrap();
        assert!(!first.end_of_video);
        assert_eq!(first.chunks_remaining, 1);
        assert_eq!(first.next_chunk_sizes, vec![MB; 6]);
        assert!(first.sat_info.is_some());

        let last = env.get_video_chunk(Quality(0), UserId(0), None, false).unwrap();
        assert!(last.end_of_video);
        assert_eq!(last.chunks_remaining, 0);
        assert!(last.next_chunk_sizes.is_empty());
        assert!(last.sat_info.is_none());
        assert!(env.all_ended());
        assert_eq!(env.first_agent(), None);

        let again = env.get_video_chunk(Quality(0), UserId(0), None, false);
        assert!(matches!(again, Err(SimError::SessionEnded(UserId(0)))));
    }

    #[test]
    fn trace_exhaustion_ends_session() {
        let mut env = build(config(4), vec![trace("short", &[(1, vec![1.0; 3])])], flat_video(MB, 4), 1);
        let out = env.get_video_chunk(Quality(0), UserId(0), None, false).unwrap();
        assert!(out.end_of_video);
        assert!(out.chunks_remaining > 0);
    }

    #[test]
    fn request_validation() {
        let mut env = build(config(2), vec![twin_trace(10)], flat_video(MB, 2), 1);
        // Stride 2: only even levels are requestable.
        let odd = env.get_video_chunk(Quality(1), UserId(0), None, false);
        assert!(matches!(odd, Err(SimError::InvalidQuality(Quality(1)))));
        let stranger = env.get_video_chunk(Quality(0), UserId(3), None, false);
        assert!(matches!(stranger, Err(SimError::UnknownUser { user: UserId(3), users: 1 })));
    }
}

// ── Orchestration ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod orchestration_tests {
    use super::*;

    #[test]
    fn two_users_forced_onto_second_satellite() {
        let mut env = build(config(2), vec![handover_trace()], flat_video(MB, 2), 2);
        assert_eq!(env.first_agent(), Some(UserId(0)));

        let a = env.get_video_chunk(Quality(0), UserId(0), None, false).unwrap();
        // Each user gets half of the raw rate.
        let sent = 3.0 * 312_500.0 * 0.95;
        let tail = (1_000_000.0 - sent) / 187_500.0 / 0.95;
        let expected = (3.0 + 0.2 + tail) * 1_000.0 + 80.0;
        assert_eq!(a.forced, 1);
        assert_eq!(a.cur_sat, SatId(2));
        assert!(approx(a.delay_ms, expected), "delay {} != {expected}", a.delay_ms);
        assert_eq!(a.other_buffers_s, vec![0.0]);

        assert_eq!(env.first_agent(), Some(UserId(1)));
        let b = env.get_video_chunk(Quality(0), UserId(1), None, false).unwrap();
        assert_eq!(b.forced, 1);
        assert_eq!(b.cur_sat, SatId(2));
        assert!(approx(b.delay_ms, expected));

        let reg = env.world().registry();
        assert_eq!(reg.user_count(SatId(1), Tick(3)), 2);
        assert_eq!(reg.user_count(SatId(1), Tick(4)), 0);
        assert_eq!(reg.user_count(SatId(2), Tick(4)), 2);
        assert_eq!(b.cur_users, 2);
    }

    #[test]
    fn occupancy_is_conserved() {
        let mut env = build(config(6), vec![handover_trace()], flat_video(MB / 2, 6), 3);
        while let Some(user) = env.first_agent() {
            env.get_video_chunk(Quality(0), user, Some(Strategy::Mrss), false).unwrap();
            let reg = env.world().registry();
            for t in 0..8 {
                assert_eq!(reg.total_connected(Tick(t)), 3, "tick {t}");
            }
        }
    }

    #[test]
    fn connection_and_decision_logs() {
        let mut env = build(config(2), vec![handover_trace()], flat_video(3 * MB, 2), 1);
        env.get_video_chunk(Quality(0), UserId(0), None, false).unwrap();
        let user = &env.world().users()[0];
        assert_eq!(user.connections(), &[(Tick(0), SatId(1)), (Tick(4), SatId(2))]);
        assert_eq!(user.sat_at(Tick(3)), SatId(1));
        assert_eq!(user.sat_at(Tick(6)), SatId(2));
        assert_eq!(user.prev_sat, Some(SatId(1)));
        assert_eq!(user.decision_log(), vec![None, None, None, None, Some(SatId(2))]);
    }

    #[test]
    fn reset_wraps_to_first_trace() {
        let traces = vec![twin_trace(10), handover_trace()];
        let mut env = build(config(2), traces, flat_video(MB, 2), 2);
        env.get_video_chunk(Quality(0), UserId(0), None, false).unwrap();

        env.reset().unwrap();
        assert_eq!(env.trace_index(), 1);
        assert_eq!(env.trace_name(), "handover");
        for user in env.world().users() {
            assert_eq!(user.chunk_index, 0);
            assert_eq!(user.buffer_ms, 0.0);
            assert_eq!(user.clock.ptr, Tick::START);
        }

        env.reset().unwrap();
        assert_eq!(env.trace_index(), 0);
        assert_eq!(env.trace_name(), "twin");
    }

    #[test]
    fn first_agent_is_furthest_behind() {
        let mut env = build(config(4), vec![twin_trace(30)], flat_video(MB, 4), 3);
        let mut order = Vec::new();
        for _ in 0..6 {
            let user = env.first_agent().unwrap();
            order.push(user);
            env.get_video_chunk(Quality(0), user, None, false).unwrap();
        }
        assert_eq!(order[..3], [UserId(0), UserId(1), UserId(2)]);
        assert_eq!(order[3..], [UserId(0), UserId(1), UserId(2)]);
    }

    #[test]
    fn satellite_observation() {
        let mut env = build(config(4), vec![twin_trace(30)], flat_video(4 * MB, 4), 2);
        let mut out = None;
        for _ in 0..4 {
            let user = env.first_agent().unwrap();
            out = Some(env.get_video_chunk(Quality(0), user, None, false).unwrap());
        }
        let info = out.unwrap().sat_info.unwrap();
        assert_eq!(info.next_sat, Some(SatId(2)));
        // Two users share satellite 1; satellite 2 is empty.
        assert!(info.cur_bw_log.iter().all(|bw| approx(*bw, 5.0)));
        assert!(info.next_bw_log.iter().all(|bw| approx(*bw, 10.0)));
        assert!(info.up_time[0] > 0 && info.up_time[1] > 0);
        assert!(info.other_users.is_empty());
    }
}

// ── Satellite selection ───────────────────────────────────────────────────────

#[cfg(test)]
mod handover_tests {
    use super::*;

    #[test]
    fn best_satellite_is_highest_shared_rate() {
        let env = build(config(2), vec![handover_trace()], flat_video(MB, 2), 1);
        let world = env.world();
        assert_eq!(world.best_satellite(UserId(0), Tick(1)), Some(SatId(1)));
        assert_eq!(world.best_satellite(UserId(0), Tick(4)), Some(SatId(2)));
    }

    #[test]
    fn mvt_prefers_longest_visibility() {
        let t = trace("mvt", &[
            (1, vec![9.0, 9.0, 9.0, 9.0, 9.0, 0.0]),
            (2, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0]),
            (3, vec![0.0, 0.0, 0.0, 50.0, 50.0, 50.0]),
        ]);
        let env = build(config(2), vec![t], flat_video(MB, 2), 1);
        let world = env.world();
        assert_eq!(world.visible_run(SatId(1), Tick(4)), 4);
        assert_eq!(world.visible_run(SatId(3), Tick(4)), 2);
        // Tie at tick 4 between satellites 1 and 2 goes to the lower id.
        assert_eq!(world.mvt_satellite(Tick(4)), Some(SatId(1)));
        assert_eq!(world.mvt_satellite(Tick(5)), Some(SatId(2)));
    }

    #[test]
    fn runner_up_skips_current_and_previous() {
        let t = trace("three", &[
            (1, vec![10.0; 10]),
            (2, vec![8.0; 10]),
            (3, vec![6.0; 10]),
        ]);
        let mut env = build(config(2), vec![t], flat_video(MB, 2), 1);
        let (sat, bw) = env.world.runner_up_satellite(UserId(0), Tick(2)).unwrap();
        assert_eq!(sat, SatId(2));
        assert!(bw > 0.0);

        env.world.switch(0, SatId(3), Tick(2)).unwrap();
        // Current is 3, previous is 1: only 2 is left.
        assert_eq!(env.world.runner_up_satellite(UserId(0), Tick(2)).map(|r| r.0), Some(SatId(2)));
        env.world.switch(0, SatId(2), Tick(3)).unwrap();
        assert_eq!(env.world.runner_up_satellite(UserId(0), Tick(3)).map(|r| r.0), Some(SatId(1)));
    }

    #[test]
    fn switch_to_current_satellite_is_an_error() {
        let mut env = build(config(2), vec![twin_trace(10)], flat_video(MB, 2), 1);
        let err = env.world.switch(0, SatId(1), Tick(1)).unwrap_err();
        assert!(matches!(err, SimError::HandoverToSelf { user: UserId(0), sat: SatId(1) }));
    }

    #[test]
    fn max_rate_uses_instantaneous_rate() {
        let mut env = build(config(2), vec![fading_trace()], flat_video(MB, 2), 1);
        assert_eq!(env.world.max_rate_satellite(UserId(0), Tick(1), false), Some(SatId(1)));
        assert_eq!(env.world.max_rate_satellite(UserId(0), Tick(3), false), Some(SatId(2)));
        assert_eq!(env.world.max_rate_satellite(UserId(0), Tick(10), true), Some(SatId(2)));
    }
}

// ── Decision strategies ───────────────────────────────────────────────────────

#[cfg(test)]
mod decision_tests {
    use super::*;

    fn fading_env(strategy_chunks: usize) -> Environment {
        let cfg = config(strategy_chunks);
        let video = ladder_video(&cfg);
        build(cfg, vec![fading_trace()], video, 1)
    }

    #[test]
    fn mrss_follows_the_strongest_satellite() {
        let mut env = fading_env(10);
        let outs = play(&mut env, Some(Strategy::Mrss));
        assert!(outs.iter().all(|o| o.forced == 0));
        assert!(outs.iter().any(|o| o.handover));
        assert_eq!(env.world().users()[0].cur_sat, SatId(2));
    }

    #[test]
    fn dual_mpc_leaves_a_collapsing_satellite() {
        let mut env = fading_env(10);
        let outs = play(&mut env, Some(Strategy::DualMpc));
        assert!(outs.iter().all(|o| o.forced == 0));
        assert!(outs.iter().any(|o| o.handover));
        assert_eq!(env.world().users()[0].cur_sat, SatId(2));
        assert!(outs.iter().all(|o| env.config().ladder.is_searchable(o.quality)));
    }

    fn holt_winters(total_chunks: usize) -> StreamConfig {
        let mpc = MpcTuning { predictor: Predictor::HoltWinters, ..MpcTuning::default() };
        with_mpc(total_chunks, mpc)
    }

    #[test]
    fn holt_winters_dual_mpc_leaves_a_collapsing_satellite() {
        let cfg = holt_winters(10);
        let video = ladder_video(&cfg);
        let mut env = build(cfg, vec![fading_trace()], video, 1);
        let outs = play(&mut env, Some(Strategy::DualMpc));
        assert_eq!(outs.len(), 10);
        assert!(outs.iter().all(|o| o.forced == 0));
        assert_eq!(outs.iter().filter(|o| o.handover).count(), 1);
        assert_eq!(env.world().users()[0].cur_sat, SatId(2));
    }

    #[test]
    fn holt_winters_candidate_follows_previous_rate_ratio() {
        let cfg = holt_winters(10);
        let video = ladder_video(&cfg);
        let mut env = build(cfg, vec![fading_trace()], video, 1);
        let input = env.dual_input(0, Strategy::DualMpc);

        // Satellite 1 at 10 Mbps and satellite 2 at 5 Mbps one tick back.
        assert_eq!(input.candidates.len(), 1);
        assert_eq!(input.candidates[0].sat, SatId(2));
        assert!(input.cur_bw > 0.0);
        assert!(approx(input.candidates[0].bw, input.cur_bw * 0.5));
    }

    #[test]
    fn holt_winters_without_history_matches_harmonic_mean() {
        // Satellite 1 is dark one tick before the first decision.
        let mut one = vec![0.0, 10.0, 10.0];
        one.extend(vec![1.0; 37]);
        let mut two = vec![5.0; 3];
        two.extend(vec![20.0; 37]);
        let dark_start = trace("dark-start", &[(1, one), (2, two)]);

        let cfg = holt_winters(10);
        let video = ladder_video(&cfg);
        let mut forecast = build(cfg, vec![dark_start.clone()], video.clone(), 1);
        let cfg = config(10);
        let mut harmonic = build(cfg, vec![dark_start], video, 1);

        let a = forecast.dual_input(0, Strategy::DualMpc);
        let b = harmonic.dual_input(0, Strategy::DualMpc);
        assert_eq!(a.cur_sat, SatId(1));
        assert!(approx(a.cur_bw, b.cur_bw));
        assert_eq!(a.candidates.len(), 1);
        assert_eq!(a.candidates[0].sat, b.candidates[0].sat);
        assert!(a.candidates[0].bw > 0.0);
        assert!(approx(a.candidates[0].bw, b.candidates[0].bw));
    }

    #[test]
    fn coupled_dual_mpc_caches_plans() {
        let cfg = config(6);
        let video = ladder_video(&cfg);
        let mut env = build(cfg, vec![twin_trace(40)], video, 2);
        env.get_video_chunk(Quality(0), UserId(0), Some(Strategy::DualMpcCentralization), false).unwrap();
        assert!(env.world.qoe_logs[0].is_some());
        assert!(env.world.qoe_logs[1].is_none());

        env.get_video_chunk(Quality(0), UserId(0), Some(Strategy::DualMpc), false).unwrap();
        assert!(env.world.qoe_logs[1].is_none());
    }

    #[test]
    fn separate_mpc_never_hands_over_on_its_own() {
        let mut env = fading_env(6);
        let outs = play(&mut env, Some(Strategy::Mvt));
        assert!(outs.iter().all(|o| !o.handover));
        assert_eq!(env.world().users()[0].cur_sat, SatId(1));
    }

    #[test]
    fn centralized_plan_splits_users() {
        let mpc = MpcTuning { horizon: 2, ..MpcTuning::default() };
        let cfg = with_mpc(4, mpc);
        let video = ladder_video(&cfg);
        let mut env = build(cfg, vec![twin_trace(40)], video, 2);

        let a = env.get_video_chunk(Quality(0), UserId(0), Some(Strategy::CentralizedExhaustive), false).unwrap();
        let plan = a.central.clone().unwrap();
        assert_eq!(plan.decider, UserId(0));
        assert_eq!(plan.users, vec![UserId(0), UserId(1)]);
        let mut ho = plan.decision.ho.clone();
        ho.sort_unstable();
        assert_eq!(ho, vec![0, 2]);
        assert_eq!(a.quality, plan.decision.combos[0][0]);

        let b = env.get_video_chunk(Quality(0), UserId(1), Some(Strategy::CentralizedExhaustive), false).unwrap();
        assert!(b.central.is_none());
        assert_eq!(b.quality, plan.decision.combos[1][0]);

        let users = env.world().users();
        assert_ne!(users[0].cur_sat, users[1].cur_sat);
        assert!(a.handover != b.handover);
        assert!(users.iter().all(|u| u.pending.is_none()));
    }

    #[test]
    fn forced_decision_by_other_user() {
        let mpc = MpcTuning { horizon: 2, ..MpcTuning::default() };
        let cfg = with_mpc(4, mpc);
        let video = ladder_video(&cfg);
        let mut env = build(cfg, vec![twin_trace(40)], video, 2);

        let out = env.get_video_chunk(Quality(0), UserId(1), Some(Strategy::CentralizedReduced), true).unwrap();
        let plan = out.central.unwrap();
        assert_eq!(plan.decider, UserId(1));
        assert_eq!(plan.decision.ho.len(), 2);
    }

    #[test]
    fn ratio_based_plan_returns_valid_shares() {
        let mpc = MpcTuning { horizon: 1, prune_ho_one: false, ..MpcTuning::default() };
        let cfg = StreamConfig { sharing: SharingPolicy::RatioBased, ..with_mpc(3, mpc) };
        let video = ladder_video(&cfg);
        let eps = cfg.mpc.epsilon;
        let mut env = build(cfg, vec![twin_trace(40)], video, 3);

        let out = env.get_video_chunk(Quality(0), UserId(0), Some(Strategy::CentralizedExhaustive), false).unwrap();
        let ratios = out.central.unwrap().decision.ratios.unwrap();
        assert!(!ratios.is_empty());
        for shares in ratios.values() {
            let sum: f64 = shares.iter().map(|(_, r)| r).sum();
            assert!((sum - 1.0).abs() < 1e-6);
            assert!(shares.iter().all(|(_, r)| *r >= eps - 1e-9 && *r <= 1.0 - eps + 1e-9));
        }
    }

    #[test]
    fn oracle_replays_on_a_copy() {
        let mpc = MpcTuning { horizon: 1, ..MpcTuning::default() };
        let cfg = with_mpc(3, mpc);
        let video = ladder_video(&cfg);
        let mut env = build(cfg, vec![twin_trace(40)], video, 2);

        let out = env.get_video_chunk(Quality(0), UserId(0), Some(Strategy::Oracle), false).unwrap();
        let plan = out.central.unwrap();
        assert_eq!(plan.decision.ho.len(), 2);
        assert!(plan.decision.combos.iter().all(|c| c.len() == 1));
        assert!(plan.decision.rewards.iter().all(|r| r.is_finite()));

        // User 1 has not moved: the replays never touched the live world.
        let other = &env.world().users()[1];
        assert_eq!(other.chunk_index, 0);
        assert_eq!(other.buffer_ms, 0.0);
        assert_eq!(other.clock.ptr, Tick::START);
        assert_eq!(env.world().registry().total_connected(Tick(1)), 2);
    }
}

// ── Evaluation runner ─────────────────────────────────────────────────────────

#[cfg(test)]
mod runner_tests {
    use super::*;

    fn fast_traces() -> Vec<Trace> {
        vec![
            trace("a", &[(1, vec![100.0; 20])]),
            trace("b", &[(1, vec![100.0; 20]), (2, vec![50.0; 20])]),
        ]
    }

    #[test]
    fn one_episode_per_trace() {
        let cfg = config(5);
        let video = ladder_video(&cfg);
        let env = build(cfg, fast_traces(), video, 2);
        let mut runner = EvalRunner::new(env, None);
        let mut obs = Collect::default();
        let summary = runner.run(&mut obs).unwrap();

        assert_eq!(summary.episodes.len(), 2);
        assert_eq!(summary.episodes[0].trace, "a");
        assert_eq!(summary.episodes[1].trace, "b");
        assert_eq!(obs.chunks.len(), 20);
        assert_eq!(obs.episodes, summary.episodes);
        assert_eq!(obs.runs, 1);
        for e in &summary.episodes {
            assert_eq!(e.chunks, 10);
            assert_eq!(e.handovers, 0);
        }
    }

    #[test]
    fn first_chunk_excluded_from_mean_reward() {
        let cfg = config(5);
        let video = ladder_video(&cfg);
        let env = build(cfg, fast_traces(), video, 2);
        let mut runner = EvalRunner::new(env, None).episodes(1);
        let mut obs = Collect::default();
        let summary = runner.run(&mut obs).unwrap();

        // Constant lowest level on a fast link: every later chunk earns 0.3.
        let episode = &summary.episodes[0];
        assert!(approx(episode.mean_reward, 0.3));
        assert!(approx(episode.mean_parts.bitrate, 0.3));
        assert!(approx(episode.mean_parts.rebuffer, 0.0));
        assert!(approx(summary.mean_reward, 0.3));

        let firsts: Vec<&ChunkRecord> = obs.chunks.iter().filter(|c| c.chunk == 0).collect();
        assert_eq!(firsts.len(), 2);
        assert!(firsts.iter().all(|c| c.reward < 0.3));
    }

    #[test]
    fn runs_are_deterministic() {
        let run = || {
            let cfg = config(6);
            let video = ladder_video(&cfg);
            let env = build(cfg, vec![fading_trace(), handover_trace()], video, 2);
            EvalRunner::new(env, Some(Strategy::DualMpc)).run(&mut NoopObserver).unwrap()
        };
        assert_eq!(run(), run());
    }
}
