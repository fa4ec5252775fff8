//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `chunk_log.csv`
//! - `episode_summary.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{ChunkLogRow, EpisodeSummaryRow, OutputResult};

pub const CHUNK_HEADER: [&str; 16] = [
    "episode", "trace", "user", "chunk", "quality", "delay_ms", "sleep_ms", "buffer_s", "rebuffer_s",
    "chunk_size", "handover", "cur_sat", "reward", "bitrate", "rebuffer", "smoothness",
];

pub const EPISODE_HEADER: [&str; 8] = [
    "episode", "trace", "chunks", "handovers", "mean_reward", "mean_bitrate", "mean_rebuffer",
    "mean_smoothness",
];

/// Writes the simulation logs to two CSV files.
pub struct CsvWriter {
    chunks:   Writer<File>,
    episodes: Writer<File>,
    finished: bool,
}

impl CsvWriter {
    /// Create the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut chunks = Writer::from_path(dir.join("chunk_log.csv"))?;
        chunks.write_record(CHUNK_HEADER)?;

        let mut episodes = Writer::from_path(dir.join("episode_summary.csv"))?;
        episodes.write_record(EPISODE_HEADER)?;

        Ok(Self { chunks, episodes, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_chunks(&mut self, rows: &[ChunkLogRow]) -> OutputResult<()> {
        for row in rows {
            self.chunks.write_record(&[
                row.episode.to_string(),
                row.trace.clone(),
                row.user.to_string(),
                row.chunk.to_string(),
                row.quality.to_string(),
                row.delay_ms.to_string(),
                row.sleep_ms.to_string(),
                row.buffer_s.to_string(),
                row.rebuffer_s.to_string(),
                row.chunk_size.to_string(),
                (row.handover as u8).to_string(),
                row.cur_sat.to_string(),
                row.reward.to_string(),
                row.bitrate.to_string(),
                row.rebuffer.to_string(),
                row.smoothness.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_episode(&mut self, row: &EpisodeSummaryRow) -> OutputResult<()> {
        self.episodes.write_record(&[
            row.episode.to_string(),
            row.trace.clone(),
            row.chunks.to_string(),
            row.handovers.to_string(),
            row.mean_reward.to_string(),
            row.mean_bitrate.to_string(),
            row.mean_rebuffer.to_string(),
            row.mean_smoothness.to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.chunks.flush()?;
        self.episodes.flush()?;
        Ok(())
    }
}
