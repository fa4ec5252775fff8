//! `leo-output` — flat log writers for the LEO streaming simulator.
//!
//! | Backend | Files created                              |
//! |---------|--------------------------------------------|
//! | CSV     | `chunk_log.csv`, `episode_summary.csv`     |
//!
//! Backends implement [`OutputWriter`] and are driven by
//! [`SimOutputObserver`], which implements `leo_sim::SimObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use leo_output::{CsvWriter, SimOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut obs = SimOutputObserver::new(writer);
//! runner.run(&mut obs)?;
//! obs.take_error().map(|e| eprintln!("output error: {e}"));
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;


pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::SimOutputObserver;
pub use row::{ChunkLogRow, EpisodeSummaryRow};
pub use writer::OutputWriter;
