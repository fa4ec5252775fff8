use leo_core::{CoreError, Quality, SatId, UserId};
use leo_mpc::MpcError;
use leo_network::NetworkError;
use leo_trace::TraceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error("unknown strategy {0:?}")]
    UnknownStrategy(String),

    #[error("{user} is not part of this session ({users} users)")]
    UnknownUser { user: UserId, users: usize },

    #[error("quality {0} is not a searchable ladder level")]
    InvalidQuality(Quality),

    #[error("{user} asked to hand over to its current satellite {sat}")]
    HandoverToSelf { user: UserId, sat: SatId },

    #[error("{0} already finished its session")]
    SessionEnded(UserId),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("trace error: {0}")]
    Trace(#[from] TraceError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("decision error: {0}")]
    Mpc(#[from] MpcError),
}

pub type SimResult<T> = Result<T, SimError>;
