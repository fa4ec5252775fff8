//! Shared machinery of the centralized searches: projected occupancy of a
//! handover vector, and scoring of one joint quality choice under it.
//!
//! A [`JointSnapshot`] is built once per decision and never mutated.  It owns
//! copies of everything scoring needs so it can be shared across worker
//! threads behind an `Arc`.

use std::collections::BTreeMap;
use std::ops::Range;

use leo_core::{Quality, SatId};

use crate::combos::{handover_vectors, quality_combos, JointSpace};
use crate::plan::{JointDecision, JointInput, ShareRatios, UserView, NO_REWARD};
use crate::reward::PlanScorer;
use crate::solver::{minimize, ShareConstraints};
use crate::{MpcEngine, MpcError, MpcResult};

// ── Projection ────────────────────────────────────────────────────────────────

/// Future per-satellite occupancy over the horizon under one handover vector.
#[derive(Clone, Debug)]
pub(crate) struct Projection {
    pub ho:      Vec<usize>,
    /// `counts[sat][pos]`: users on `sat` while downloading chunk `pos`.
    pub counts:  BTreeMap<SatId, Vec<i64>>,
    /// `members[sat][pos]`: indices (into the snapshot's users) on `sat`.
    pub members: BTreeMap<SatId, Vec<Vec<usize>>>,
}

impl Projection {
    #[inline]
    fn count(&self, sat: SatId, pos: usize) -> i64 {
        self.counts.get(&sat).and_then(|c| c.get(pos)).copied().unwrap_or(0)
    }

    /// Satellite and predicted unshared bandwidth user `u` downloads chunk
    /// `pos` from.
    #[inline]
    fn link(&self, user: &UserView, u: usize, pos: usize) -> (SatId, f64) {
        match user.next_sat {
            Some(next) if pos >= self.ho[u] => (next, user.next_bw),
            _ => (user.cur_sat, user.cur_bw),
        }
    }
}

// ── Scores ────────────────────────────────────────────────────────────────────

/// Score of one joint choice.
#[derive(Clone, Debug)]
pub(crate) struct JointScore {
    pub candidate: usize,
    pub joint:     usize,
    pub mean:      f64,
    pub first_sum: u32,
    pub rewards:   Vec<f64>,
    pub ratios:    Option<ShareRatios>,
}

impl JointScore {
    /// Higher mean wins; on an exact tie the later candidate wins when its
    /// first-step quality sum is at least as high.
    #[inline]
    pub fn beats(&self, best: &JointScore) -> bool {
        self.mean > best.mean || (self.mean == best.mean && self.first_sum >= best.first_sum)
    }
}

/// Fold `next` into `best` with the tie-break rule.
pub(crate) fn merge(best: &mut Option<JointScore>, next: Option<JointScore>) {
    if let Some(next) = next {
        if best.as_ref().is_none_or(|b| next.beats(b)) {
            *best = Some(next);
        }
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Immutable inputs of one centralized decision.
#[derive(Clone, Debug)]
pub(crate) struct JointSnapshot {
    pub scorer:      PlanScorer,
    pub users:       Vec<UserView>,
    /// Per-user combo lists.
    pub combos:      Vec<Vec<Vec<Quality>>>,
    pub space:       JointSpace,
    pub horizon:     usize,
    pub buf_ratio:   f64,
    pub epsilon:     f64,
    pub solver_iter: usize,
}

impl MpcEngine {
    /// Validate `input` and freeze it into a snapshot.
    pub(crate) fn snapshot(&self, input: &JointInput) -> MpcResult<JointSnapshot> {
        if input.users.is_empty() {
            return Err(MpcError::NoUsers);
        }
        if input.decider >= input.users.len() {
            return Err(MpcError::BadDecider { index: input.decider, users: input.users.len() });
        }
        if let Some(u) = input.users.iter().find(|u| u.cur_bw == 0.0) {
            return Err(MpcError::ZeroBandwidth { user: u.user, sat: u.cur_sat });
        }

        let freeze = self.tuning().freeze_other_users;
        let combos: Vec<Vec<Vec<Quality>>> = input
            .users
            .iter()
            .enumerate()
            .map(|(idx, u)| {
                let len = self.future_len(u.chunks_remaining);
                if freeze && idx != input.decider {
                    vec![vec![u.last_quality; len]]
                } else {
                    quality_combos(self.levels(), len)
                }
            })
            .collect();
        let space = JointSpace::new(combos.iter().map(Vec::len).collect());

        Ok(JointSnapshot {
            scorer: self.scorer().clone(),
            users: input.users.clone(),
            combos,
            space,
            horizon: self.horizon(),
            buf_ratio: input.buf_ratio,
            epsilon: self.tuning().epsilon,
            solver_iter: self.tuning().solver_iterations,
        })
    }

    /// Every feasible handover vector with its projected occupancy, in
    /// enumeration order.
    pub(crate) fn projections(&self, snap: &JointSnapshot, decider: usize) -> Vec<Projection> {
        let freeze = self.tuning().freeze_other_users;
        let prune_one = self.tuning().prune_ho_one;
        handover_vectors(snap.users.len(), snap.horizon)
            .into_iter()
            .filter(|ho| !ho.iter().all(|&h| h == 0))
            .filter(|ho| !(prune_one && ho.contains(&1)))
            .filter(|ho| {
                !freeze || ho.iter().enumerate().all(|(i, &h)| i == decider || h == snap.horizon)
            })
            .filter_map(|ho| snap.project(ho))
            .collect()
    }
}

impl JointSnapshot {
    /// Apply `ho` to the current occupancy.  `None` when the vector is
    /// infeasible: a handover with no distinct reachable target, or a
    /// negative projected count.
    pub fn project(&self, ho: Vec<usize>) -> Option<Projection> {
        let h = self.horizon;
        let mut counts: BTreeMap<SatId, Vec<i64>> = BTreeMap::new();
        let mut members: BTreeMap<SatId, Vec<Vec<usize>>> = BTreeMap::new();
        for (idx, u) in self.users.iter().enumerate() {
            counts.entry(u.cur_sat).or_insert_with(|| vec![0; h]).iter_mut().for_each(|c| *c += 1);
            members
                .entry(u.cur_sat)
                .or_insert_with(|| vec![Vec::new(); h])
                .iter_mut()
                .for_each(|m| m.push(idx));
        }
        for u in &self.users {
            if let Some(next) = u.next_sat {
                counts.entry(next).or_insert_with(|| vec![0; h]);
                members.entry(next).or_insert_with(|| vec![Vec::new(); h]);
            }
        }

        for (idx, u) in self.users.iter().enumerate() {
            let point = ho[idx];
            let next = match u.next_sat {
                Some(next) if next != u.cur_sat && u.next_bw > 0.0 => next,
                _ if point != h => return None,
                _ => continue,
            };
            for pos in point..h {
                counts.get_mut(&u.cur_sat)?[pos] -= 1;
                counts.get_mut(&next)?[pos] += 1;
                members.get_mut(&u.cur_sat)?[pos].retain(|&m| m != idx);
                members.get_mut(&next)?[pos].push(idx);
            }
            if counts[&u.cur_sat].iter().any(|&c| c < 0) || counts[&next].iter().any(|&c| c < 0) {
                return None;
            }
        }
        for list in members.values_mut().flat_map(|per_pos| per_pos.iter_mut()) {
            list.sort_unstable();
        }
        Some(Projection { ho, counts, members })
    }

    /// Score joint choice `joint` under `proj`.
    pub fn score(
        &self,
        candidate: usize,
        proj:      &Projection,
        joint:     usize,
        ratio:     bool,
        picks:     &mut Vec<usize>,
    ) -> JointScore {
        self.space.decode(joint, picks);
        let combos: Vec<&[Quality]> =
            picks.iter().enumerate().map(|(u, &c)| self.combos[u][c].as_slice()).collect();

        let ratios = if ratio { self.solve_shares(proj, &combos) } else { None };

        let rewards: Vec<f64> = self
            .users
            .iter()
            .enumerate()
            .map(|(u, user)| {
                self.scorer
                    .score(combos[u], user.last_quality, user.start_buffer_s, user.last_index, proj.ho[u], |pos| {
                        self.user_bw(proj, user, u, pos, ratios.as_ref())
                    })
                    .reward
            })
            .collect();

        let mean = rewards.iter().sum::<f64>() / rewards.len() as f64;
        let first_sum = combos.iter().filter_map(|c| c.first()).map(|q| q.0 as u32).sum();
        JointScore { candidate, joint, mean, first_sum, rewards, ratios }
    }

    /// Best joint choice in `range` under `proj`.
    pub fn best_in(
        &self,
        candidate: usize,
        proj:      &Projection,
        range:     Range<usize>,
        ratio:     bool,
    ) -> Option<JointScore> {
        let mut picks = Vec::with_capacity(self.users.len());
        let mut best = None;
        for joint in range {
            merge(&mut best, Some(self.score(candidate, proj, joint, ratio, &mut picks)));
        }
        best
    }

    /// Per-user bandwidth of chunk `pos`.
    ///
    /// Resource-fair: predicted bandwidth divided by projected occupancy.
    /// Ratio-based: multiplied by the user's solved share where the
    /// satellite is contended, raw otherwise.
    fn user_bw(
        &self,
        proj:   &Projection,
        user:   &UserView,
        u:      usize,
        pos:    usize,
        ratios: Option<&ShareRatios>,
    ) -> f64 {
        let (sat, bw) = proj.link(user, u, pos);
        let count = proj.count(sat, pos);
        match ratios {
            None => bw / count.max(1) as f64,
            Some(shares) if count > 1 => shares
                .get(&sat)
                .and_then(|s| s.iter().find(|(id, _)| *id == user.user))
                .map_or(bw / count as f64, |(_, r)| bw * r),
            Some(_) => bw,
        }
    }

    /// Solve fair-share ratios minimising total rebuffering, per contended
    /// satellite.  `None` when no satellite is contended.
    fn solve_shares(&self, proj: &Projection, combos: &[&[Quality]]) -> Option<ShareRatios> {
        // Variables: one per (contended satellite, user seen there while
        // contended), grouped by satellite.
        let mut groups: Vec<(SatId, Vec<usize>)> = Vec::new();
        for (sat, counts) in &proj.counts {
            let mut users: Vec<usize> = counts
                .iter()
                .enumerate()
                .filter(|(_, c)| **c > 1)
                .flat_map(|(pos, _)| proj.members[sat][pos].iter().copied())
                .collect();
            if users.is_empty() {
                continue;
            }
            users.sort_unstable();
            users.dedup();
            groups.push((*sat, users));
        }
        if groups.is_empty() {
            return None;
        }

        let mut blocks = Vec::with_capacity(groups.len());
        let mut x0 = Vec::new();
        for (_, users) in &groups {
            let start = x0.len();
            x0.extend(std::iter::repeat_n(1.0 / users.len() as f64, users.len()));
            blocks.push(start..x0.len());
        }
        let var = |sat: SatId, u: usize| -> Option<usize> {
            groups.iter().zip(&blocks).find(|((s, _), _)| *s == sat).and_then(|((_, users), block)| {
                users.iter().position(|&m| m == u).map(|i| block.start + i)
            })
        };

        let objective = |x: &[f64]| -> f64 {
            self.users
                .iter()
                .enumerate()
                .map(|(u, user)| {
                    let start = user.start_buffer_s * self.buf_ratio;
                    self.scorer.rebuffer(combos[u], start, user.last_index, proj.ho[u], |pos| {
                        let (sat, bw) = proj.link(user, u, pos);
                        if proj.count(sat, pos) > 1 {
                            var(sat, u).map_or(bw, |i| bw * x[i])
                        } else {
                            bw
                        }
                    })
                })
                .sum()
        };

        let cons = ShareConstraints::with_margin(blocks.clone(), self.epsilon);
        let solution = minimize(objective, x0, &cons, self.solver_iter);

        Some(
            groups
                .iter()
                .zip(&blocks)
                .map(|((sat, users), block)| {
                    let shares = users
                        .iter()
                        .zip(&solution.x[block.clone()])
                        .map(|(&u, &r)| (self.users[u].user, r))
                        .collect();
                    (*sat, shares)
                })
                .collect(),
        )
    }

    /// Turn the winning score into a decision; the no-handover default when
    /// nothing was feasible.
    pub fn decision(&self, projections: &[Projection], best: Option<JointScore>) -> JointDecision {
        let Some(best) = best else {
            return JointDecision {
                targets: self.users.iter().map(|u| u.next_sat).collect(),
                ho:      vec![self.horizon; self.users.len()],
                combos:  self.users.iter().map(|u| vec![u.last_quality; self.horizon]).collect(),
                rewards: vec![NO_REWARD; self.users.len()],
                ratios:  None,
            };
        };
        let mut picks = Vec::with_capacity(self.users.len());
        self.space.decode(best.joint, &mut picks);
        JointDecision {
            targets: self.users.iter().map(|u| u.next_sat).collect(),
            ho:      projections[best.candidate].ho.clone(),
            combos:  picks.iter().enumerate().map(|(u, &c)| self.combos[u][c].clone()).collect(),
            rewards: best.rewards,
            ratios:  best.ratios,
        }
    }
}
