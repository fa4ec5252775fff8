//! `SimOutputObserver<W>`: bridges `SimObserver` to an `OutputWriter`.

use leo_sim::{ChunkRecord, EpisodeSummary, RunSummary, SimObserver};

use crate::row::{ChunkLogRow, EpisodeSummaryRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SimObserver`] that logs every chunk and episode to any
/// [`OutputWriter`] backend.
///
/// Chunk rows are buffered and written as one batch per episode.  Errors
/// from the writer are stored internally because `SimObserver` methods have
/// no return value.  After `runner.run()` returns, check for errors with
/// [`take_error`][Self::take_error].
pub struct SimOutputObserver<W: OutputWriter> {
    writer:     W,
    pending:    Vec<ChunkLogRow>,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> SimOutputObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, pending: Vec::new(), last_error: None }
    }

    /// Take the stored write error (if any) after the run.
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer (e.g. to inspect files after the run).
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn flush_chunks(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let rows = std::mem::take(&mut self.pending);
        let result = self.writer.write_chunks(&rows);
        self.store_err(result);
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> SimObserver for SimOutputObserver<W> {
    fn on_chunk(&mut self, record: &ChunkRecord) {
        self.pending.push(ChunkLogRow::from(record));
    }

    fn on_episode_end(&mut self, summary: &EpisodeSummary) {
        self.flush_chunks();
        let result = self.writer.write_episode(&EpisodeSummaryRow::from(summary));
        self.store_err(result);
    }

    fn on_run_end(&mut self, _summary: &RunSummary) {
        self.flush_chunks();
        let result = self.writer.finish();
        self.store_err(result);
    }
}
