//! `leo-trace` — in-memory bandwidth traces and video chunk sizes.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                   |
//! |------------|------------------------------------------------------------|
//! | [`trace`]  | `Trace` (time grid + per-satellite Mbps series), `TraceSet` |
//! | [`video`]  | `VideoSizes` (bytes per quality level per chunk)           |
//! | [`loader`] | `load_trace_csv`, `load_trace_reader`, video-size loaders  |
//! | [`error`]  | `TraceError`, `TraceResult<T>`                             |
//!
//! Everything here is immutable once built.  Series are stored as `Arc<[f64]>`
//! so satellites, oracle snapshots and worker shards share one allocation.

pub mod error;
pub mod loader;
pub mod trace;
pub mod video;


pub use error::{TraceError, TraceResult};
pub use loader::{
    load_trace_csv, load_trace_reader, load_video_sizes_dir, load_video_sizes_reader,
};
pub use trace::{Trace, TraceSet};
pub use video::VideoSizes;
