//! Chunk delivery over the trace.
//!
//! ```text
//! loop over trace ticks from the user's clock:
//!   rate == 0            → forced handover (+ handover delay)
//!   payload this tick    = rate · Δt · payload_portion
//!   chunk completes      → fractional tick, stop
//!   otherwise            → consume the tick
//! delay  = Σ Δt (+ penalties) · 1000 + RTT
//! buffer = max(buffer - delay, 0) + chunk length, drained above the cap
//! ```

use tracing::{debug, info, warn};

use leo_core::{Quality, Tick, B_IN_MB, BITS_IN_BYTE, MS_IN_S};

use crate::strategy::Fallback;
use crate::{SimResult, World};

/// Result of delivering one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub delay_ms:         f64,
    pub sleep_ms:         f64,
    pub rebuffer_ms:      f64,
    /// Buffer after the chunk, before any end-of-session reset (ms).
    pub buffer_ms:        f64,
    pub chunk_size:       u64,
    /// Forced handovers during this delivery.
    pub forced:           u32,
    pub end_of_network:   bool,
    pub end_of_video:     bool,
    pub chunks_remaining: usize,
}

impl World {
    /// Deliver the next chunk of user `u` at `quality`.
    ///
    /// `initial_delay_s` carries penalties incurred before the transfer
    /// starts (a planned handover).
    pub fn deliver(
        &mut self,
        u:               usize,
        quality:         Quality,
        fallback:        Fallback,
        initial_delay_s: f64,
    ) -> SimResult<Delivery> {
        let cfg = self.config.clone();
        let len = self.trace.len();
        let chunk_size = self.video.size(quality, self.users[u].chunk_index);
        let size = chunk_size as f64;

        let mut delay = initial_delay_s;
        let mut sent = 0.0;
        let mut forced = 0;
        let mut end_of_network = false;

        // ── Transfer ──────────────────────────────────────────────────────
        loop {
            let ptr = self.users[u].clock.ptr;
            if ptr.index() >= len {
                end_of_network = true;
                break;
            }
            if self.rate_mbps(u, ptr) == 0.0 && self.force_handover(u, ptr, fallback)? {
                delay += cfg.handover_delay_s;
                forced += 1;
            }
            let throughput = self.rate_mbps(u, ptr) * B_IN_MB / BITS_IN_BYTE;

            let now = self.trace.time()[ptr.index()];
            let duration = now - self.users[u].clock.last_time;
            let payload = throughput * duration * cfg.payload_portion;

            if throughput > 0.0 && sent + payload > size {
                let fractional = (size - sent) / throughput / cfg.payload_portion;
                delay += fractional;
                self.users[u].clock.advance_within(fractional);
                break;
            }

            sent += payload;
            delay += duration;
            self.users[u].clock.advance_to(now);
            if self.users[u].clock.ptr.index() >= len {
                end_of_network = true;
                break;
            }
        }

        let mut delay_ms = delay * MS_IN_S + cfg.link_rtt_ms;

        // ── Buffer ────────────────────────────────────────────────────────
        let user = &mut self.users[u];
        let rebuffer_ms = (delay_ms - user.buffer_ms).max(0.0);
        user.buffer_ms = (user.buffer_ms - delay_ms).max(0.0) + cfg.chunk_len_ms;

        let mut sleep_ms = 0.0;
        if user.buffer_ms > cfg.buffer_thresh_ms {
            let drain = user.buffer_ms - cfg.buffer_thresh_ms;
            sleep_ms = (drain / cfg.drain_sleep_ms).ceil() * cfg.drain_sleep_ms;
            user.buffer_ms -= sleep_ms;
            info!(user = %user.id, buffer_ms = user.buffer_ms, sleep_ms, tick = %user.clock.ptr, "buffer over cap");

            let (penalties, drained_end, drained_forced) = self.drain(u, sleep_ms, fallback)?;
            delay_ms += penalties * MS_IN_S;
            end_of_network |= drained_end;
            forced += drained_forced;
        }

        // ── Session bookkeeping ───────────────────────────────────────────
        let user = &mut self.users[u];
        let buffer_ms = user.buffer_ms;
        user.chunk_index += 1;
        let chunks_remaining = cfg.total_chunks.saturating_sub(user.chunk_index);
        let end_of_video = user.chunk_index >= cfg.total_chunks || end_of_network;
        if end_of_video {
            debug!(user = %user.id, end_of_network, tick = %user.clock.ptr, "session ended");
            user.end_of_video = true;
            user.buffer_ms = 0.0;
            user.chunk_index = 0;
        }
        user.download_bw.push(size / delay_ms / MS_IN_S * BITS_IN_BYTE);

        Ok(Delivery {
            delay_ms,
            sleep_ms,
            rebuffer_ms,
            buffer_ms,
            chunk_size,
            forced,
            end_of_network,
            end_of_video,
            chunks_remaining,
        })
    }

    /// Advance the clock by `sleep_ms` without counting it as delay.
    ///
    /// Returns the handover penalties (s) incurred, whether the trace ran
    /// out, and the number of forced handovers.
    fn drain(&mut self, u: usize, sleep_ms: f64, fallback: Fallback) -> SimResult<(f64, bool, u32)> {
        let len = self.trace.len();
        let penalty = self.config.handover_delay_s;
        let mut left = sleep_ms;
        let mut penalties = 0.0;
        let mut forced = 0;
        loop {
            let ptr = self.users[u].clock.ptr;
            if ptr.index() >= len {
                return Ok((penalties, true, forced));
            }
            let now = self.trace.time()[ptr.index()];
            let duration = now - self.users[u].clock.last_time;
            if duration > left / MS_IN_S {
                self.users[u].clock.advance_within(left / MS_IN_S);
                return Ok((penalties, false, forced));
            }
            left -= duration * MS_IN_S;
            self.users[u].clock.advance_to(now);

            let next = self.users[u].clock.ptr;
            if next.index() < len && self.rate_mbps(u, next) == 0.0 && self.force_handover(u, next, fallback)? {
                penalties += penalty;
                forced += 1;
            }
        }
    }

    /// Switch user `u` away from a satellite that stopped serving at `t`.
    ///
    /// Returns `false` when no other satellite serves at `t`; the transfer
    /// then stalls through the tick.
    fn force_handover(&mut self, u: usize, t: Tick, fallback: Fallback) -> SimResult<bool> {
        let (id, cur) = (self.users[u].id, self.users[u].cur_sat);
        match self.fallback_satellite(id, t, fallback) {
            Some(sat) if sat != cur => {
                debug!(user = %id, from = %cur, to = %sat, tick = %t, ?fallback, "forced handover");
                self.switch(u, sat, t)?;
                self.unexpected_change = true;
                Ok(true)
            }
            _ => {
                warn!(user = %id, sat = %cur, tick = %t, "no satellite serving; transfer stalls");
                Ok(false)
            }
        }
    }
}
