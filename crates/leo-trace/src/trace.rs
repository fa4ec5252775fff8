//! Bandwidth traces.

use std::collections::BTreeMap;
use std::sync::Arc;

use leo_core::{SatId, Tick};

use crate::{TraceError, TraceResult};

// ── Trace ─────────────────────────────────────────────────────────────────────

/// One bandwidth trace: a shared time grid plus one Mbps series per satellite.
///
/// Every series has exactly `time.len()` samples.  A sample of `0.0` means the
/// satellite is not visible at that tick.
#[derive(Clone, Debug)]
pub struct Trace {
    name:      String,
    time:      Arc<[f64]>,
    bandwidth: BTreeMap<SatId, Arc<[f64]>>,
}

impl Trace {
    /// Build a trace, checking that every series matches the time grid.
    pub fn new(
        name: impl Into<String>,
        time: Vec<f64>,
        bandwidth: BTreeMap<SatId, Vec<f64>>,
    ) -> TraceResult<Self> {
        let name = name.into();
        if time.len() < 2 {
            return Err(TraceError::Empty(format!("trace {name:?} needs at least two ticks")));
        }
        if bandwidth.is_empty() {
            return Err(TraceError::Empty(format!("trace {name:?} has no satellites")));
        }
        if time.windows(2).any(|w| w[1] < w[0]) {
            return Err(TraceError::Parse(format!("trace {name:?}: time grid is not monotonic")));
        }
        for (sat, series) in &bandwidth {
            if series.len() != time.len() {
                return Err(TraceError::Mismatch {
                    what:     format!("trace {name:?} satellite {sat}"),
                    expected: time.len(),
                    got:      series.len(),
                });
            }
        }
        Ok(Self {
            name,
            time: time.into(),
            bandwidth: bandwidth.into_iter().map(|(k, v)| (k, v.into())).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of grid ticks.
    #[inline]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Time (seconds) of grid tick `t`, or `None` past the end.
    #[inline]
    pub fn time_at(&self, t: Tick) -> Option<f64> {
        self.time.get(t.index()).copied()
    }

    pub fn time(&self) -> &Arc<[f64]> {
        &self.time
    }

    /// Bandwidth series of `sat`, if the trace has one.
    pub fn series(&self, sat: SatId) -> Option<&Arc<[f64]>> {
        self.bandwidth.get(&sat)
    }

    /// Raw Mbps of `sat` at `t`.  Unknown satellites and ticks past the end
    /// read as zero bandwidth.
    #[inline]
    pub fn bw(&self, sat: SatId, t: Tick) -> f64 {
        self.bandwidth
            .get(&sat)
            .and_then(|s| s.get(t.index()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Satellite ids in ascending order.
    pub fn sat_ids(&self) -> impl Iterator<Item = SatId> + '_ {
        self.bandwidth.keys().copied()
    }

    pub fn satellites(&self) -> impl Iterator<Item = (SatId, &Arc<[f64]>)> + '_ {
        self.bandwidth.iter().map(|(k, v)| (*k, v))
    }
}

// ── TraceSet ──────────────────────────────────────────────────────────────────

/// Ordered collection of traces replayed one episode each.
#[derive(Clone, Debug)]
pub struct TraceSet {
    traces: Vec<Arc<Trace>>,
}

impl TraceSet {
    pub fn new(traces: Vec<Trace>) -> TraceResult<Self> {
        if traces.is_empty() {
            return Err(TraceError::Empty("trace set has no traces".into()));
        }
        Ok(Self { traces: traces.into_iter().map(Arc::new).collect() })
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Arc<Trace>> {
        self.traces.get(idx)
    }

    /// Index of the trace after `idx`, wrapping to the first.
    #[inline]
    pub fn next_index(&self, idx: usize) -> usize {
        if idx + 1 >= self.traces.len() { 0 } else { idx + 1 }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Trace>> + '_ {
        self.traces.iter()
    }
}
