//! Episode-by-episode evaluation of one strategy.

use tracing::info;

use leo_core::Quality;
use leo_mpc::{RewardModel, RewardParts};

use crate::observer::{ChunkRecord, SimObserver};
use crate::strategy::Strategy;
use crate::{Environment, SimResult};

/// Aggregates of one episode (one trace, every user to the end).
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeSummary {
    pub episode:     usize,
    pub trace:       String,
    /// Chunks delivered over all users.
    pub chunks:      usize,
    /// Mean per-chunk reward, each user's first chunk excluded.
    pub mean_reward: f64,
    pub mean_parts:  RewardParts,
    /// Chunks that involved a planned or forced handover.
    pub handovers:   usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub episodes:    Vec<EpisodeSummary>,
    /// Mean of the episodes' mean rewards.
    pub mean_reward: f64,
}

/// Drives an [`Environment`] through a number of episodes with one strategy.
///
/// Every request goes to the user furthest behind in simulated time and
/// passes that user's last quality.  The environment moves to the next
/// trace between episodes.
pub struct EvalRunner {
    env:      Environment,
    strategy: Option<Strategy>,
    episodes: usize,
    reward:   RewardModel,
    fresh:    bool,
}

impl EvalRunner {
    /// One episode per trace by default.
    pub fn new(env: Environment, strategy: Option<Strategy>) -> Self {
        let episodes = env.traces().len();
        let reward = RewardModel::from_config(env.config());
        Self { env, strategy, episodes, reward, fresh: true }
    }

    pub fn episodes(mut self, episodes: usize) -> Self {
        self.episodes = episodes;
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn into_env(self) -> Environment {
        self.env
    }

    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<RunSummary> {
        let mut episodes = Vec::with_capacity(self.episodes);
        for episode in 0..self.episodes {
            if !self.fresh {
                self.env.reset()?;
            }
            self.fresh = false;
            let summary = self.run_episode(episode, observer)?;
            observer.on_episode_end(&summary);
            episodes.push(summary);
        }

        let mean_reward = if episodes.is_empty() {
            0.0
        } else {
            episodes.iter().map(|e| e.mean_reward).sum::<f64>() / episodes.len() as f64
        };
        let summary = RunSummary { episodes, mean_reward };
        observer.on_run_end(&summary);
        Ok(summary)
    }

    fn run_episode<O: SimObserver>(&mut self, episode: usize, observer: &mut O) -> SimResult<EpisodeSummary> {
        let trace = self.env.trace_name().to_string();
        let lowest = self.env.config().ladder.searchable().first().copied().unwrap_or(Quality(0));
        let mut positions = vec![0usize; self.env.user_count()];
        let mut chunks = 0;
        let mut handovers = 0;
        let mut scored = 0usize;
        let mut total = 0.0;
        let mut parts_sum = RewardParts::default();

        while let Some(user) = self.env.first_agent() {
            let last = self.env.last_quality(user)?;
            let request = if self.env.config().ladder.is_searchable(last) { last } else { lowest };
            let outcome = self.env.get_video_chunk(request, user, self.strategy, false)?;

            let parts = self.reward.chunk_parts(outcome.quality, last, outcome.rebuffer_s);
            let reward = parts.total();
            let chunk = positions[user.index()];
            positions[user.index()] += 1;
            if chunk > 0 {
                scored += 1;
                total += reward;
                parts_sum += parts;
            }
            chunks += 1;
            handovers += usize::from(outcome.handover);

            observer.on_chunk(&ChunkRecord {
                episode,
                trace: trace.clone(),
                user,
                chunk,
                quality: outcome.quality,
                delay_ms: outcome.delay_ms,
                sleep_ms: outcome.sleep_ms,
                buffer_s: outcome.buffer_s,
                rebuffer_s: outcome.rebuffer_s,
                chunk_size: outcome.chunk_size,
                handover: outcome.handover,
                cur_sat: outcome.cur_sat,
                reward,
                parts,
            });
        }

        let n = scored.max(1) as f64;
        let summary = EpisodeSummary {
            episode,
            trace,
            chunks,
            mean_reward: if scored == 0 { 0.0 } else { total / n },
            mean_parts:  RewardParts {
                bitrate:    parts_sum.bitrate / n,
                rebuffer:   parts_sum.rebuffer / n,
                smoothness: parts_sum.smoothness / n,
            },
            handovers,
        };
        info!(
            episode,
            trace = %summary.trace,
            chunks,
            handovers,
            mean_reward = summary.mean_reward,
            strategy = self.strategy.map_or("none", Strategy::name),
            "episode finished"
        );
        Ok(summary)
    }
}
