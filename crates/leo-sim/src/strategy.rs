//! Named decision strategies and their groups.

use std::fmt;
use std::str::FromStr;

use leo_core::CandidateScope;

use crate::SimError;

/// How a strategy shares decisions between users.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyGroup {
    /// One user decides qualities and handover timings for everyone.
    Centralized,
    /// Every user runs its own dual search.
    Distributed,
    /// Every user runs a no-handover MPC; handovers follow a fixed rule.
    Separate,
}

/// Fallback used when the current satellite stops serving mid-transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Fallback {
    /// Highest shared rate at the tick.
    #[default]
    BestRate,
    /// Longest continuous visibility up to the tick.
    MostVisibleTime,
}

/// Closed set of decision strategies, parsed from their canonical names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    ManifoldMpc,
    DualMpc,
    DualMpcCentralization,
    CentralizedExhaustive,
    CentralizedReduced,
    Oracle,
    Mvt,
    Mrss,
    MrssSmart,
}

impl Strategy {
    pub const ALL: [Strategy; 9] = [
        Strategy::ManifoldMpc,
        Strategy::DualMpc,
        Strategy::DualMpcCentralization,
        Strategy::CentralizedExhaustive,
        Strategy::CentralizedReduced,
        Strategy::Oracle,
        Strategy::Mvt,
        Strategy::Mrss,
        Strategy::MrssSmart,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::ManifoldMpc           => "ManifoldMPC",
            Strategy::DualMpc               => "DualMPC",
            Strategy::DualMpcCentralization => "DualMPC-Centralization",
            Strategy::CentralizedExhaustive => "DualMPC-Centralization-Exhaustive",
            Strategy::CentralizedReduced    => "DualMPC-Centralization-Reduced",
            Strategy::Oracle                => "Oracle",
            Strategy::Mvt                   => "MVT",
            Strategy::Mrss                  => "MRSS",
            Strategy::MrssSmart             => "MRSS-Smart",
        }
    }

    pub fn group(self) -> StrategyGroup {
        match self {
            Strategy::CentralizedExhaustive | Strategy::CentralizedReduced | Strategy::Oracle => {
                StrategyGroup::Centralized
            }
            Strategy::ManifoldMpc | Strategy::DualMpc | Strategy::DualMpcCentralization => {
                StrategyGroup::Distributed
            }
            Strategy::Mvt | Strategy::Mrss | Strategy::MrssSmart => StrategyGroup::Separate,
        }
    }

    /// Forced-handover target rule during delivery.
    pub fn fallback(self) -> Fallback {
        match self {
            Strategy::Mvt => Fallback::MostVisibleTime,
            _ => Fallback::BestRate,
        }
    }

    /// Alternatives a distributed strategy searches by default.
    pub fn candidate_scope(self) -> CandidateScope {
        match self {
            Strategy::ManifoldMpc => CandidateScope::AllVisible,
            _ => CandidateScope::RunnerUp,
        }
    }

    /// `true` if the strategy shares cached plans between users.
    pub fn couples_users(self) -> bool {
        matches!(self, Strategy::DualMpcCentralization)
    }
}

impl FromStr for Strategy {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, SimError> {
        Strategy::ALL
            .into_iter()
            .find(|st| st.name() == s)
            .ok_or_else(|| SimError::UnknownStrategy(s.to_string()))
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
