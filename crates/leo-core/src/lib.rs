//! `leo-core` — foundational types for the LEO multi-user streaming simulator.
//!
//! Every other `leo-*` crate depends on this one.  It has no `leo-*`
//! dependencies and only `rand` and `thiserror` externally (plus optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module       | Contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | [`ids`]      | `SatId`, `UserId`, `Quality`                              |
//! | [`time`]     | `Tick`, `SessionClock`                                    |
//! | [`ladder`]   | `BitrateLadder` (kbps table, HD rewards, search stride)   |
//! | [`config`]   | `StreamConfig`, `MpcTuning`, `RewardConfig`, policy enums |
//! | [`rng`]      | `UserRng` (per-user deterministic RNG)                    |
//! | [`error`]    | `CoreError`, `CoreResult`                                 |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to ids, ticks and config.   |

pub mod config;
pub mod error;
pub mod ids;
pub mod ladder;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{
    CandidateScope, DeliveryShare, Divisor, DivisorTable, MpcTuning, Predictor, RewardConfig, RewardKind,
    SharingPolicy, StreamConfig,
};
pub use error::{CoreError, CoreResult};
pub use ids::{Quality, SatId, UserId};
pub use ladder::BitrateLadder;
pub use rng::UserRng;
pub use time::{SessionClock, Tick};

/// Bytes per megabyte as used by the bandwidth traces (decimal).
pub const B_IN_MB: f64 = 1_000_000.0;

/// Bits per byte.
pub const BITS_IN_BYTE: f64 = 8.0;

/// Milliseconds per second.
pub const MS_IN_S: f64 = 1_000.0;
