//! CSV loaders for traces and chunk sizes.
//!
//! # Trace format
//!
//! Wide layout, one row per grid tick.  The first column is the time in
//! seconds; every further column is one satellite's bandwidth in Mbps.
//!
//! ```csv
//! time,1,2
//! 0,5,0
//! 1,5,0
//! 2,5,3
//! ```
//!
//! Header cells after `time` must parse as satellite ids (`u32`).
//!
//! # Video size format
//!
//! One file per quality level, one integer byte count per line, named
//! `video_size_<level>` inside a directory.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use leo_core::SatId;

use crate::{Trace, TraceError, TraceResult, VideoSizes};

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SizeRecord {
    bytes: u64,
}

// ── Traces ────────────────────────────────────────────────────────────────────

/// Load one trace from a CSV file.  The file stem becomes the trace name.
pub fn load_trace_csv(path: &Path) -> TraceResult<Trace> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file = File::open(path)?;
    load_trace_reader(name, file)
}

/// Like [`load_trace_csv`] but accepts any `Read` source.
pub fn load_trace_reader<R: Read>(name: impl Into<String>, reader: R) -> TraceResult<Trace> {
    let name = name.into();
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    // ── Header: time,<sat>,<sat>... ───────────────────────────────────────
    let headers = csv_reader
        .headers()
        .map_err(|e| TraceError::Parse(e.to_string()))?
        .clone();
    let mut columns = headers.iter();
    match columns.next() {
        Some(first) if first.eq_ignore_ascii_case("time") => {}
        other => {
            return Err(TraceError::Parse(format!(
                "trace {name:?}: first column must be \"time\", found {other:?}"
            )));
        }
    }
    let sats: Vec<SatId> = columns
        .map(|cell| {
            cell.parse::<u32>().map(SatId).map_err(|_| {
                TraceError::Parse(format!("trace {name:?}: invalid satellite id {cell:?}"))
            })
        })
        .collect::<TraceResult<_>>()?;

    // ── Rows ──────────────────────────────────────────────────────────────
    let mut time = Vec::new();
    let mut series: Vec<Vec<f64>> = vec![Vec::new(); sats.len()];

    for (line, result) in csv_reader.deserialize::<Vec<f64>>().enumerate() {
        let row = result.map_err(|e| TraceError::Parse(e.to_string()))?;
        if row.len() != sats.len() + 1 {
            return Err(TraceError::Parse(format!(
                "trace {name:?} row {}: expected {} columns, got {}",
                line + 1,
                sats.len() + 1,
                row.len()
            )));
        }
        time.push(row[0]);
        for (col, value) in row[1..].iter().enumerate() {
            if *value < 0.0 {
                return Err(TraceError::Parse(format!(
                    "trace {name:?} row {}: negative bandwidth {value}",
                    line + 1
                )));
            }
            series[col].push(*value);
        }
    }

    let bandwidth: BTreeMap<SatId, Vec<f64>> = sats.into_iter().zip(series).collect();
    Trace::new(name, time, bandwidth)
}

// ── Video sizes ───────────────────────────────────────────────────────────────

/// Read one level's chunk sizes: one integer per line, no header.
pub fn load_video_sizes_reader<R: Read>(reader: R) -> TraceResult<Vec<u64>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize::<SizeRecord>()
        .map(|r| r.map(|rec| rec.bytes).map_err(|e| TraceError::Parse(e.to_string())))
        .collect()
}

/// Load `video_size_0 .. video_size_{levels-1}` from `dir`.
pub fn load_video_sizes_dir(dir: &Path, levels: usize) -> TraceResult<VideoSizes> {
    let sizes = (0..levels)
        .map(|level| {
            let file = File::open(dir.join(format!("video_size_{level}")))?;
            load_video_sizes_reader(file)
        })
        .collect::<TraceResult<Vec<_>>>()?;
    VideoSizes::new(sizes)
}
