//! Round-robin assignment policy.
//!
//! The simplest strategy: block `i` goes to rank `i mod nranks`. Ignores cost
//! entirely, so it balances block counts but not load, and scatters
//! neighbouring blocks across ranks.

use crate::traits::*;
use tracing::debug;

/// Round-robin assigner.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobin;

impl RoundRobin {
    pub fn new() -> Self {
        Self
    }
}

impl AssignmentPolicy for RoundRobin {
    fn assign(&self, costs: &[u64], nranks: usize) -> Result<Assignment, PolicyError> {
        check_ranks(nranks)?;

        let assignment: Assignment = (0..costs.len()).map(|block_id| block_id % nranks).collect();
        debug!(nblocks = costs.len(), nranks, "round-robin assignment");
        Ok(assignment)
    }

    fn policy(&self) -> Policy {
        Policy::RoundRobin
    }
}
