//! Assignment policy trait definitions.
//!
//! All policies implement the [`AssignmentPolicy`] trait, which receives a
//! per-block cost vector and a rank count and returns a block → rank mapping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Rank index of every block, indexed by block id.
pub type Assignment = Vec<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Rank count must be at least 1")]
    NoRanks,
    #[error(
        "At least one rank would receive no block ({remaining_blocks} blocks left with zero target cost). \
         Decrease the number of ranks or use smaller blocks."
    )]
    ZeroTargetCost { remaining_blocks: usize },
    #[error("rank0_alloc >= nblocks ({rank0_alloc}, {nblocks})")]
    DegenerateSkew { rank0_alloc: usize, nblocks: usize },
    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),
}

/// Tag selecting one of the built-in policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    RoundRobin,
    Contiguous,
    Skewed,
}

impl Policy {
    pub const ALL: [Policy; 3] = [Policy::RoundRobin, Policy::Contiguous, Policy::Skewed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::RoundRobin => "round-robin",
            Policy::Contiguous => "contiguous",
            Policy::Skewed => "skewed",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round-robin" => Ok(Policy::RoundRobin),
            "contiguous" => Ok(Policy::Contiguous),
            "skewed" => Ok(Policy::Skewed),
            other => Err(PolicyError::UnknownPolicy(other.to_string())),
        }
    }
}

/// The core assignment policy trait.
///
/// Implementations hold no state between calls: the result depends only on
/// `costs` and `nranks`. An empty cost vector yields an empty assignment.
pub trait AssignmentPolicy: Send + Sync {
    /// Map every block to a rank in `[0, nranks)`.
    fn assign(&self, costs: &[u64], nranks: usize) -> Result<Assignment, PolicyError>;

    /// Tag of this policy, also used as its name in reports.
    fn policy(&self) -> Policy;

    fn name(&self) -> &'static str {
        self.policy().as_str()
    }
}

/// Total cost carried by each rank under `assignment`.
pub fn rank_loads(costs: &[u64], assignment: &[usize], nranks: usize) -> Vec<u64> {
    let mut loads = vec![0u64; nranks];
    for (&cost, &rank) in costs.iter().zip(assignment) {
        if let Some(slot) = loads.get_mut(rank) {
            *slot += cost;
        }
    }
    loads
}

pub(crate) fn check_ranks(nranks: usize) -> Result<(), PolicyError> {
    if nranks == 0 {
        return Err(PolicyError::NoRanks);
    }
    Ok(())
}
