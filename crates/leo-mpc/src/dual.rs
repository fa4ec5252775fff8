//! Dual-satellite search: stay, or hand over to one alternative at some
//! chunk of the horizon.

use tracing::debug;

use leo_core::{Quality, SatId};

use crate::engine::better;
use crate::plan::{Decision, DualInput, MpcChoice, QoeLog, SoloInput, NO_REWARD};
use crate::MpcEngine;

impl MpcEngine {
    /// Joint search over quality combos, candidate satellites, and handover
    /// index in `[0, H]`.
    ///
    /// The baseline is the no-handover search on the current satellite.
    /// Candidates with zero predicted bandwidth are skipped; a zero current
    /// bandwidth only allows `ho == 0`.  When `peers` is non-empty
    /// every candidate's reward also includes the re-scored plans of the
    /// other users (the centralization coupling).
    pub fn handover_dist(&self, input: &DualInput, peers: &[QoeLog]) -> Decision {
        let horizon = self.horizon();
        let future_len = self.future_len(input.chunks_remaining);
        let mut best = Decision {
            target:   input.cur_sat,
            ho_index: horizon,
            combo:    vec![input.last_quality],
            reward:   NO_REWARD,
            log:      None,
        };
        if future_len == 0 {
            return best;
        }

        let log_for = |combo: &[Quality], reward: f64, ho: usize, next: Option<(SatId, f64, usize)>| QoeLog {
            user:             input.user,
            last_quality:     input.last_quality,
            cur_download_bw:  input.cur_bw,
            start_buffer_s:   input.start_buffer_s,
            future_len,
            last_index:       input.last_index,
            combo:            combo.to_vec(),
            next_download_bw: next.map(|n| n.1),
            ho_index:         ho,
            next_sat:         next.map(|n| n.0),
            reward,
            cur_users:        input.cur_users,
            next_users:       next.map_or(0, |n| n.2),
            cur_sat:          input.cur_sat,
        };

        if input.cur_bw != 0.0 {
            let MpcChoice { combo, reward } = self.calculate_mpc(&SoloInput {
                last_quality:     input.last_quality,
                start_buffer_s:   input.start_buffer_s,
                last_index:       input.last_index,
                chunks_remaining: input.chunks_remaining,
                bw:               input.cur_bw,
            });
            best.log = Some(log_for(&combo, reward, horizon, None));
            best.combo = combo;
            best.reward = reward;
        }

        let combos = self.combos(input.chunks_remaining);
        for cand in input.candidates.iter().filter(|c| c.sat != input.cur_sat && c.bw != 0.0) {
            for ho in 0..=horizon {
                if input.cur_bw == 0.0 && ho != 0 {
                    continue;
                }
                for combo in &combos {
                    let mut reward = self
                        .scorer()
                        .score(combo, input.last_quality, input.start_buffer_s, input.last_index, ho, |pos| {
                            if pos < ho { input.cur_bw } else { cand.bw }
                        })
                        .reward;
                    for log in peers.iter().filter(|l| l.user != input.user) {
                        reward += self.simulated_reward(log, input.last_index, ho, input.cur_sat, cand.sat);
                    }

                    if better(reward, combo, best.reward, &best.combo) {
                        best = Decision {
                            target:   cand.sat,
                            ho_index: ho,
                            combo:    combo.clone(),
                            reward,
                            log:      Some(log_for(combo, reward, ho, Some((cand.sat, cand.bw, cand.users)))),
                        };
                    }
                }
            }
        }

        debug!(
            user = %input.user,
            cur_sat = %input.cur_sat,
            target = %best.target,
            ho = best.ho_index,
            reward = best.reward,
            cur_bw = input.cur_bw,
            "dual decision"
        );
        best
    }

    /// Re-score another user's cached plan as if this user moved from
    /// `target_cur` to `target_next` at chunk `target_last_index + target_ho`.
    ///
    /// Leaving a satellite the peer uses scales the peer's bandwidth by
    /// `n / (n - 1)`; joining one scales it by `n / (n + 1)`.  Always scored
    /// with the LIN reward.
    pub fn simulated_reward(
        &self,
        log:               &QoeLog,
        target_last_index: usize,
        target_ho:         usize,
        target_cur:        SatId,
        target_next:       SatId,
    ) -> f64 {
        let switch_at = target_last_index + target_ho;
        let cur_bw = log.cur_download_bw;
        let next_bw = log.next_download_bw.unwrap_or(cur_bw);

        let rescale = |bw: f64, peer_sat: Option<SatId>, users: usize, index: usize| -> f64 {
            if index < switch_at {
                return bw;
            }
            let n = users as f64;
            if peer_sat == Some(target_cur) {
                if users <= 1 { bw } else { bw * n / (n - 1.0) }
            } else if peer_sat == Some(target_next) {
                if users < 1 { bw } else { bw * n / (n + 1.0) }
            } else {
                bw
            }
        };

        let model = self.scorer().reward.linear();
        self.scorer()
            .walk(&model, &log.combo, log.last_quality, log.start_buffer_s, log.last_index, log.ho_index, |pos| {
                let index = log.last_index + pos;
                if pos < log.ho_index {
                    rescale(cur_bw, Some(log.cur_sat), log.cur_users, index)
                } else {
                    rescale(next_bw, log.next_sat, log.next_users, index)
                }
            })
            .reward
    }
}
