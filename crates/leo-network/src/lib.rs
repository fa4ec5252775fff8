//! `leo-network` — who is connected where, and how much bandwidth they get.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`satellite`] | `Satellite`: trace series + per-tick occupancy ledger      |
//! | [`registry`]  | `SatelliteRegistry`: id-keyed arena, shared-rate queries, paired handovers |
//! | [`oracle`]    | `BandwidthOracle`: robust harmonic-mean predictor with per-(user, satellite) error history |
//! | [`holt`]      | Holt-Winters additive-trend one-step forecast              |
//! | [`error`]     | `NetworkError`, `NetworkResult<T>`                          |
//!
//! # Default policy
//!
//! Queries about satellites the trace does not know, or ticks past the end of
//! the trace, answer with zero bandwidth and zero occupancy.  Mutations on an
//! unknown satellite are errors.

pub mod error;
pub mod holt;
pub mod oracle;
pub mod registry;
pub mod satellite;

#[cfg(test)]
mod tests;

pub use error::{NetworkError, NetworkResult};
pub use holt::{harmonic_mean, holt_winters_forecast};
pub use oracle::BandwidthOracle;
pub use registry::SatelliteRegistry;
pub use satellite::Satellite;
