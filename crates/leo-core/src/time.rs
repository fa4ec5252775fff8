//! Trace-grid time model.
//!
//! # Design
//!
//! A bandwidth trace is sampled on a fixed time grid.  `Tick` is an index
//! into that grid; the float `time[tick]` it maps to lives in the trace.
//! Every user owns a `SessionClock`: the next grid index it will consume
//! (`ptr`) plus the precise simulated time it has reached (`last_time`),
//! which may fall between grid points after a chunk completes mid-tick.
//!
//! Clocks only move forward within a trace and are rewound to index 1 when
//! the orchestrator rolls over to the next trace.

use std::fmt;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An index into a trace's time grid.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// First grid index a fresh session consumes.  Index 0 is the trace origin.
    pub const START: Tick = Tick(1);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    /// The tick `n` steps before `self`, or `None` if that would precede 0.
    #[inline]
    pub fn back(self, n: u64) -> Option<Tick> {
        self.0.checked_sub(n).map(Tick)
    }

    /// Ticks elapsed from `earlier` to `self`.
    ///
    /// # Panics
    /// Panics in debug mode if `earlier > self`.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0 - earlier.0
    }

    /// Cast to `usize` for indexing a trace series.
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SessionClock ──────────────────────────────────────────────────────────────

/// Per-user position on the trace grid.
///
/// `ptr` is the next grid sample to be consumed; `last_time` is the simulated
/// time (seconds) already reached.  Invariant: `time[ptr - 1] <= last_time <=
/// time[ptr]` while `ptr` is inside the trace.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionClock {
    pub ptr:       Tick,
    pub last_time: f64,
}

impl SessionClock {
    /// A clock positioned at [`Tick::START`] with `last_time` at the trace origin.
    pub fn at_start(origin_secs: f64) -> Self {
        Self { ptr: Tick::START, last_time: origin_secs }
    }

    /// Move to the next grid sample, recording that `time` has been reached.
    #[inline]
    pub fn advance_to(&mut self, time: f64) {
        self.last_time = time;
        self.ptr = self.ptr.offset(1);
    }

    /// Move forward inside the current grid interval without consuming it.
    #[inline]
    pub fn advance_within(&mut self, secs: f64) {
        self.last_time += secs;
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::at_start(0.0)
    }
}

impl fmt::Display for SessionClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {:.3}s", self.ptr, self.last_time)
    }
}
