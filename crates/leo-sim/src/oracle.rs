//! Oracle joint search: every candidate plan is replayed through the real
//! delivery loop on a copy of the world.
//!
//! ```text
//! for each handover vector (all-zero and unreachable targets skipped):
//!   for each joint quality choice:
//!     clone the world
//!     while the user furthest behind has chunks left in its plan:
//!       fire its handover when the countdown hits 0, deliver its next chunk
//!     score = mean LIN reward over users (mean chunk throughput on ties)
//! ```
//!
//! The live world is only touched by the predictions that pick each user's
//! runner-up.  Cost grows as `levels^(H·users) · (H+1)^users` full replays,
//! which is why this search is a baseline and not a strategy to deploy.

use std::collections::VecDeque;

use tracing::info;

use leo_core::{Quality, UserId, B_IN_MB, BITS_IN_BYTE, MS_IN_S};
use leo_mpc::{
    handover_vectors, quality_combos, JointDecision, JointSpace, MpcEngine, RewardModel, UserView,
    NO_REWARD,
};

use crate::outcome::CentralPlan;
use crate::strategy::Fallback;
use crate::{SimError, SimResult, World};

/// Result of replaying one candidate.
#[derive(Clone, Debug)]
struct Replay {
    ho:      Vec<usize>,
    combos:  Vec<Vec<Quality>>,
    rewards: Vec<f64>,
    mean:    f64,
    mean_bw: f64,
}

impl Replay {
    /// Higher mean wins.  On an exact tie the later candidate wins when the
    /// decider hands over no earlier, or the mean throughput is no lower.
    fn beats(&self, best: &Replay, decider: usize) -> bool {
        self.mean > best.mean
            || (self.mean == best.mean
                && (best.ho[decider] <= self.ho[decider] || self.mean_bw >= best.mean_bw))
    }
}

impl World {
    /// Oracle plan for every live user, decided by `decider`.
    pub fn oracle_plan(&mut self, engine: &MpcEngine, decider: UserId) -> SimResult<CentralPlan> {
        let live: Vec<usize> = (0..self.users.len()).filter(|&i| !self.users[i].end_of_video).collect();
        let d = live
            .iter()
            .position(|&i| i == decider.index())
            .ok_or(SimError::SessionEnded(decider))?;
        let views: Vec<UserView> = live.iter().map(|&i| self.user_view(i)).collect();

        let horizon = engine.horizon();
        let freeze = engine.tuning().freeze_other_users;
        let combos: Vec<Vec<Vec<Quality>>> = views
            .iter()
            .enumerate()
            .map(|(k, v)| {
                let len = engine.future_len(v.chunks_remaining);
                if freeze && k != d {
                    vec![vec![v.last_quality; len]]
                } else {
                    quality_combos(engine.levels(), len)
                }
            })
            .collect();
        let space = JointSpace::new(combos.iter().map(Vec::len).collect());
        let lin = engine.scorer().reward.linear();

        let mut best: Option<Replay> = None;
        let mut picks = Vec::with_capacity(views.len());
        let mut replays = 0usize;
        for ho in handover_vectors(views.len(), horizon) {
            if ho.iter().all(|&h| h == 0) {
                continue;
            }
            if freeze && ho.iter().enumerate().any(|(k, &h)| k != d && h != horizon) {
                continue;
            }
            let reachable = views
                .iter()
                .zip(&ho)
                .all(|(v, &h)| h == horizon || v.next_sat.is_some_and(|next| next != v.cur_sat));
            if !reachable {
                continue;
            }

            for joint in 0..space.len() {
                space.decode(joint, &mut picks);
                let plan: Vec<Vec<Quality>> =
                    picks.iter().enumerate().map(|(k, &c)| combos[k][c].clone()).collect();
                let replay = self.replay(&live, &views, ho.clone(), plan, horizon, &lin)?;
                replays += 1;
                if best.as_ref().is_none_or(|b| replay.beats(b, d)) {
                    best = Some(replay);
                }
            }
        }

        let targets = views.iter().map(|v| v.next_sat).collect();
        let decision = match best {
            Some(best) => JointDecision {
                targets,
                ho:      best.ho,
                combos:  best.combos,
                rewards: best.rewards,
                ratios:  None,
            },
            None => JointDecision {
                targets,
                ho:      vec![horizon; views.len()],
                combos:  views.iter().map(|v| vec![v.last_quality; horizon]).collect(),
                rewards: vec![NO_REWARD; views.len()],
                ratios:  None,
            },
        };
        info!(decider = %decider, replays, ho = ?decision.ho, mean_reward = decision.mean_reward(), "oracle decision");

        Ok(CentralPlan {
            decider,
            users: live.iter().map(|&i| self.users[i].id).collect(),
            decision,
        })
    }

    /// Deliver `plan` on a copy of this world in first-agent order.
    fn replay(
        &self,
        live:    &[usize],
        views:   &[UserView],
        ho:      Vec<usize>,
        plan:    Vec<Vec<Quality>>,
        horizon: usize,
        lin:     &RewardModel,
    ) -> SimResult<Replay> {
        let mut sim = self.clone();
        let mut queues: Vec<VecDeque<Quality>> = plan.iter().map(|c| c.iter().copied().collect()).collect();
        let mut countdown: Vec<Option<usize>> = ho.iter().map(|&h| (h < horizon).then_some(h)).collect();
        let mut rewards = vec![0.0; live.len()];
        let mut last: Vec<Quality> = views.iter().map(|v| v.last_quality).collect();
        let mut bws = Vec::new();

        while let Some(id) = sim.first_agent() {
            let Some(k) = live.iter().position(|&i| i == id.index()) else { break };
            let Some(q) = queues[k].pop_front() else { break };
            let u = live[k];

            let mut pre_delay = 0.0;
            countdown[k] = match countdown[k] {
                Some(0) => {
                    if let Some(target) = views[k].next_sat {
                        let ptr = sim.users[u].clock.ptr;
                        if target != sim.users[u].cur_sat && sim.registry.is_visible(target, ptr) {
                            sim.switch(u, target, ptr)?;
                            pre_delay = sim.config.handover_delay_s;
                        }
                    }
                    None
                }
                Some(c) => Some(c - 1),
                None => None,
            };

            let delivery = sim.deliver(u, q, Fallback::BestRate, pre_delay)?;
            sim.users[u].last_quality = q;
            rewards[k] += lin.chunk_reward(q, last[k], delivery.rebuffer_ms / MS_IN_S);
            last[k] = q;
            if delivery.delay_ms > 0.0 {
                bws.push(delivery.chunk_size as f64 * BITS_IN_BYTE / B_IN_MB / (delivery.delay_ms / MS_IN_S));
            }
        }

        let mean = rewards.iter().sum::<f64>() / rewards.len().max(1) as f64;
        let mean_bw = if bws.is_empty() { 0.0 } else { bws.iter().sum::<f64>() / bws.len() as f64 };
        Ok(Replay { ho, combos: plan, rewards, mean, mean_bw })
    }
}
