//! `leo-sim` — multi-user video streaming over LEO satellite traces.
//!
//! # Chunk request
//!
//! ```text
//! get_video_chunk(quality, user, strategy):
//!   ① Decide   — centralized: joint plan (user 0, forced, or after an
//!                unexpected change), then the user's queued quality and
//!                handover countdown
//!              — distributed: dual search, handover now if ho_index == 0
//!              — separate:    per-user MPC + MVT / MRSS handover rule
//!   ② Deliver  — byte transfer over trace ticks, forced handovers, buffer
//!                update and drain
//!   ③ Observe  — next chunk sizes, satellite logs, other users' buffers
//! ```
//!
//! # Crate layout
//!
//! | Module       | Contents                                                 |
//! |--------------|----------------------------------------------------------|
//! | [`env`]      | `Environment`: trace rotation, strategy dispatch         |
//! | [`world`]    | `World`: registry, predictor and users of one trace      |
//! | [`delivery`] | chunk transfer loop, buffer model, forced handover       |
//! | [`handover`] | best / MVT / max-rate / runner-up satellite selection    |
//! | [`sat_info`] | post-chunk satellite observation                         |
//! | [`oracle`]   | replay-based joint search                                |
//! | [`strategy`] | `Strategy`, `StrategyGroup`, `Fallback`                  |
//! | [`runner`]   | `EvalRunner`, episode and run summaries                  |
//! | [`observer`] | `SimObserver`, `ChunkRecord`                             |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use leo_sim::{EnvironmentBuilder, EvalRunner, NoopObserver, Strategy};
//!
//! let env = EnvironmentBuilder::new(config, traces, video).users(2).build()?;
//! let mut runner = EvalRunner::new(env, Some(Strategy::DualMpc));
//! let summary = runner.run(&mut NoopObserver)?;
//! println!("mean reward {}", summary.mean_reward);
//! ```

pub mod builder;
pub mod delivery;
pub mod env;
pub mod error;
pub mod handover;
pub mod observer;
pub mod oracle;
pub mod outcome;
pub mod runner;
pub mod sat_info;
pub mod strategy;
pub mod user;
pub mod world;

#[cfg(test)]
mod tests;

pub use builder::EnvironmentBuilder;
pub use delivery::Delivery;
pub use env::Environment;
pub use error::{SimError, SimResult};
pub use observer::{ChunkRecord, NoopObserver, SimObserver};
pub use outcome::{CentralPlan, ChunkOutcome, SatelliteInfo};
pub use runner::{EpisodeSummary, EvalRunner, RunSummary};
pub use strategy::{Fallback, Strategy, StrategyGroup};
pub use user::{PendingHandover, UserState, DECISION_LOG_LEN};
pub use world::World;
