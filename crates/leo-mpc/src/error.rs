use thiserror::Error;

use leo_core::{SatId, UserId};

#[derive(Debug, Error)]
pub enum MpcError {
    /// The current satellite of a user in a joint search predicts zero
    /// bandwidth.  Occupancy or visibility bookkeeping is out of sync.
    #[error("current predicted bandwidth of {user} on {sat} must be nonzero")]
    ZeroBandwidth { user: UserId, sat: SatId },

    #[error("joint search needs at least one user")]
    NoUsers,

    #[error("deciding user index {index} outside {users} users")]
    BadDecider { index: usize, users: usize },
}

pub type MpcResult<T> = Result<T, MpcError>;
