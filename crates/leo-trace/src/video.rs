//! Per-level video chunk sizes.

use leo_core::{BitrateLadder, Quality};

use crate::{TraceError, TraceResult};

/// Chunk sizes in bytes, indexed `[level][chunk]`.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoSizes {
    sizes: Vec<Vec<u64>>,
}

impl VideoSizes {
    pub fn new(sizes: Vec<Vec<u64>>) -> TraceResult<Self> {
        if sizes.is_empty() || sizes.iter().any(|s| s.is_empty()) {
            return Err(TraceError::Empty("video size table has an empty level".into()));
        }
        Ok(Self { sizes })
    }

    /// Synthesize a constant-bitrate video: every chunk of level `q` is
    /// `kbps(q) * chunk_len_s * 1000 / 8` bytes.
    pub fn from_ladder(ladder: &BitrateLadder, chunk_len_s: f64, chunks: usize) -> TraceResult<Self> {
        let sizes = ladder
            .kbps
            .iter()
            .map(|kbps| vec![(kbps * 1_000.0 * chunk_len_s / 8.0).round() as u64; chunks])
            .collect();
        Self::new(sizes)
    }

    pub fn levels(&self) -> usize {
        self.sizes.len()
    }

    /// Chunks available at every level.
    pub fn chunks(&self) -> usize {
        self.sizes.iter().map(Vec::len).min().unwrap_or(0)
    }

    /// Size in bytes of chunk `idx` at level `q`.
    ///
    /// # Panics
    /// Panics if `q` or `idx` is outside the table; [`VideoSizes::covers`]
    /// guards this at construction of the simulator.
    #[inline]
    pub fn size(&self, q: Quality, idx: usize) -> u64 {
        self.sizes[q.index()][idx]
    }

    /// Sizes of chunk `idx` at every level, or `None` past the end.
    pub fn options(&self, idx: usize) -> Option<Vec<u64>> {
        self.sizes.iter().map(|level| level.get(idx).copied()).collect()
    }

    /// Check the table has `levels` levels of at least `total_chunks` chunks.
    pub fn covers(&self, levels: usize, total_chunks: usize) -> TraceResult<()> {
        if self.levels() != levels {
            return Err(TraceError::Mismatch {
                what:     "video size levels".into(),
                expected: levels,
                got:      self.levels(),
            });
        }
        if self.chunks() < total_chunks {
            return Err(TraceError::Mismatch {
                what:     "video size chunks".into(),
                expected: total_chunks,
                got:      self.chunks(),
            });
        }
        Ok(())
    }
}
