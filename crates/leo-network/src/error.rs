use thiserror::Error;

use leo_core::{SatId, Tick, UserId};

/// Bookkeeping failures of the satellite registry.
///
/// All of these are invariant violations: the orchestrator aborts the step
/// rather than continuing with a corrupt ledger.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("unknown satellite {0}")]
    UnknownSatellite(SatId),

    #[error("occupancy of {sat} would go negative at {tick} removing {user}")]
    OccupancyUnderflow { sat: SatId, tick: Tick, user: UserId },

    #[error("{user} is not connected to {sat}")]
    NotConnected { sat: SatId, user: UserId },

    #[error("{user} is already connected to {sat}")]
    AlreadyConnected { sat: SatId, user: UserId },

    #[error("{user} cannot hand over from {sat} to itself")]
    HandoverToSelf { sat: SatId, user: UserId },
}

pub type NetworkResult<T> = Result<T, NetworkError>;
