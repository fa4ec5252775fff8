//! `leo-mpc` — model-predictive bitrate and handover decisions.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`combos`]      | quality combos, handover vectors, mixed-radix joint space  |
//! | [`reward`]      | `RewardModel` (LIN / HD), `RewardParts`, `PlanScorer`      |
//! | [`plan`]        | search inputs and outputs, `QoeLog`                        |
//! | [`engine`]      | `MpcEngine`, per-user independent search                   |
//! | [`dual`]        | current-vs-alternative search, simulated peer reward       |
//! | [`exhaustive`]  | centralized joint search (resource-fair or fair-share)     |
//! | [`reduced`]     | centralized search over the best-ranked handover vectors   |
//! | [`solver`]      | projected-gradient fair-share ratio solver                 |
//! | [`error`]       | `MpcError`, `MpcResult<T>`                                 |
//!
//! # Purity
//!
//! Nothing in this crate reads or writes live simulation state.  The caller
//! computes predictions and occupancies, passes them in by value, and decides
//! whether to commit the returned plan.  Projected occupancy during a joint
//! search is always a local copy.
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                  |
//! |------------|---------------------------------------------------------|
//! | `parallel` | Score reduced-search shards on the Rayon pool (default) |

pub mod combos;
pub mod dual;
pub mod engine;
pub mod error;
pub mod exhaustive;
mod joint;
pub mod plan;
pub mod reduced;
pub mod reward;
pub mod solver;


pub use combos::{handover_vectors, quality_combos, JointSpace};
pub use engine::MpcEngine;
pub use error::{MpcError, MpcResult};
pub use plan::{
    Candidate, ChunkPlan, Decision, DualInput, JointDecision, JointInput, MpcChoice, QoeLog,
    ShareRatios, SoloInput, UserView, NO_REWARD,
};
pub use reward::{PlanScore, PlanScorer, RewardModel, RewardParts};
pub use solver::{minimize, ShareConstraints, Solution};
