//! eval — compare handover and bitrate strategies on synthetic LEO passes.
//!
//! Builds a few bandwidth traces from overlapping satellite passes, loads
//! them through the CSV trace loader, and runs every strategy over every
//! trace with two users sharing the constellation.  The DualMPC run is also
//! written to `output/eval/` as flat CSV logs.
//!
//! Set `RUST_LOG=info` (or `debug`) to see the decision log.

use std::fmt::Write as _;
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use leo_core::{MpcTuning, StreamConfig};
use leo_output::{CsvWriter, SimOutputObserver};
use leo_sim::{EnvironmentBuilder, EvalRunner, NoopObserver, RunSummary, Strategy, StrategyGroup};
use leo_trace::{load_trace_reader, Trace, TraceSet, VideoSizes};

// ── Constants ─────────────────────────────────────────────────────────────────

const USERS:        usize = 2;
const TRACE_LEN:    usize = 400;
/// Ticks between consecutive satellite rises.
const PASS_SPACING: isize = 60;
/// Ticks a satellite stays above the horizon.
const PASS_LEN:     isize = 90;
/// Peak downlink (Mbps) of each satellite at the top of its pass.
const PEAKS:        [f64; 7] = [40.0, 25.0, 55.0, 30.0, 45.0, 35.0, 50.0];
/// Rise offsets of the generated traces.
const OFFSETS:      [isize; 3] = [0, 15, 30];
/// Look-ahead of the joint searches, whose cost is exponential in it.
const JOINT_HORIZON: usize = 2;
const OUTPUT_DIR:   &str = "output/eval";

// ── Trace synthesis ───────────────────────────────────────────────────────────

/// CSV text of one trace: a half-sine rate arc per pass, 0 below the horizon.
fn pass_trace_csv(offset: isize) -> Result<String> {
    let mut csv = String::from("time");
    for sat in 0..PEAKS.len() {
        write!(csv, ",{}", sat + 1)?;
    }
    csv.push('\n');

    for tick in 0..TRACE_LEN as isize {
        write!(csv, "{tick}")?;
        for (i, peak) in PEAKS.iter().enumerate() {
            let k = tick - (i as isize * PASS_SPACING - PASS_LEN / 3 + offset);
            let rate = if (1..PASS_LEN).contains(&k) {
                peak * (std::f64::consts::PI * k as f64 / PASS_LEN as f64).sin()
            } else {
                0.0
            };
            write!(csv, ",{rate:.3}")?;
        }
        csv.push('\n');
    }
    Ok(csv)
}

fn load_traces() -> Result<Vec<Trace>> {
    OFFSETS
        .iter()
        .map(|&offset| {
            let csv = pass_trace_csv(offset)?;
            Ok(load_trace_reader(format!("passes-{offset}"), Cursor::new(csv))?)
        })
        .collect()
}

// ── Runs ──────────────────────────────────────────────────────────────────────

fn config_for(strategy: Strategy) -> StreamConfig {
    let mut config = StreamConfig::default();
    if strategy.group() == StrategyGroup::Centralized {
        config.mpc = MpcTuning { horizon: JOINT_HORIZON, ..MpcTuning::default() };
    }
    config
}

fn run(strategy: Strategy, traces: &[Trace], log: bool) -> Result<RunSummary> {
    let config = config_for(strategy);
    let video = VideoSizes::from_ladder(&config.ladder, config.chunk_len_s(), config.total_chunks)?;
    let env = EnvironmentBuilder::new(config, TraceSet::new(traces.to_vec())?, video)
        .users(USERS)
        .build()?;
    let mut runner = EvalRunner::new(env, Some(strategy));

    if !log {
        return Ok(runner.run(&mut NoopObserver)?);
    }
    std::fs::create_dir_all(OUTPUT_DIR)?;
    let mut obs = SimOutputObserver::new(CsvWriter::new(Path::new(OUTPUT_DIR))?);
    let summary = runner.run(&mut obs)?;
    if let Some(e) = obs.take_error() {
        eprintln!("output error: {e}");
    }
    Ok(summary)
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("=== eval — LEO multi-user streaming ===");
    println!("Users: {USERS}  |  Satellites: {}  |  Traces: {}", PEAKS.len(), OFFSETS.len());
    println!();

    let traces = load_traces()?;
    for trace in &traces {
        info!(trace = trace.name(), ticks = trace.len(), "trace loaded");
    }

    println!(
        "{:<34} {:>8} {:>9} {:>9} {:>7} {:>9}",
        "Strategy", "Reward", "Bitrate", "Rebuffer", "HOs", "Time (s)"
    );
    println!("{}", "-".repeat(81));
    for strategy in Strategy::ALL {
        let t0 = Instant::now();
        let summary = run(strategy, &traces, strategy == Strategy::DualMpc)?;
        let elapsed = t0.elapsed();

        let n = summary.episodes.len().max(1) as f64;
        let bitrate = summary.episodes.iter().map(|e| e.mean_parts.bitrate).sum::<f64>() / n;
        let rebuffer = summary.episodes.iter().map(|e| e.mean_parts.rebuffer).sum::<f64>() / n;
        let handovers: usize = summary.episodes.iter().map(|e| e.handovers).sum();
        println!(
            "{:<34} {:>8.3} {:>9.3} {:>9.3} {:>7} {:>9.3}",
            strategy.name(),
            summary.mean_reward,
            bitrate,
            rebuffer,
            handovers,
            elapsed.as_secs_f64()
        );
    }
    println!();
    println!("DualMPC chunk log written to {OUTPUT_DIR}/");

    Ok(())
}
