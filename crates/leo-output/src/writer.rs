//! The `OutputWriter` trait implemented by backend writers.

use crate::{ChunkLogRow, EpisodeSummaryRow, OutputResult};

/// Sink for the per-chunk and per-episode logs.
///
/// Errors are stored by the observer and retrieved with
/// [`SimOutputObserver::take_error`][crate::SimOutputObserver::take_error].
pub trait OutputWriter {
    /// Write a batch of chunk rows.
    fn write_chunks(&mut self, rows: &[ChunkLogRow]) -> OutputResult<()>;

    /// Write one episode summary row.
    fn write_episode(&mut self, row: &EpisodeSummaryRow) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent: safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
