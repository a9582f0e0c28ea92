//! Contiguous, cost-balanced greedy assignment.
//!
//! Walks blocks from the highest id down, filling ranks from `nranks - 1`
//! towards 0. A rank is closed once its accumulated cost reaches the current
//! per-rank target, and the target is recomputed over the remaining cost and
//! ranks. Each rank therefore owns one contiguous range of block ids, and
//! rank 0, filled last, ends up with the least load.

use crate::traits::*;
use tracing::{debug, error};

/// Contiguous cost-balanced assigner.
#[derive(Debug, Clone, Copy, Default)]
pub struct Contiguous;

impl Contiguous {
    pub fn new() -> Self {
        Self
    }
}

impl AssignmentPolicy for Contiguous {
    fn assign(&self, costs: &[u64], nranks: usize) -> Result<Assignment, PolicyError> {
        check_ranks(nranks)?;

        let total_cost: f64 = costs.iter().map(|&c| c as f64).sum();
        let mut assignment = vec![0usize; costs.len()];

        let mut rank = nranks - 1;
        let mut target_cost = total_cost / nranks as f64;
        let mut rank_cost = 0.0;
        let mut remaining_cost = total_cost;

        for block_id in (0..costs.len()).rev() {
            if target_cost == 0.0 {
                error!(
                    block_id,
                    rank, nranks, "contiguous policy reached a zero target cost"
                );
                return Err(PolicyError::ZeroTargetCost {
                    remaining_blocks: block_id + 1,
                });
            }

            rank_cost += costs[block_id] as f64;
            assignment[block_id] = rank;

            if rank_cost >= target_cost && rank > 0 {
                debug!(rank, rank_cost, target_cost, first_block = block_id, "rank closed");
                rank -= 1;
                remaining_cost -= rank_cost;
                rank_cost = 0.0;
                target_cost = remaining_cost / (rank + 1) as f64;
            }
        }

        Ok(assignment)
    }

    fn policy(&self) -> Policy {
        Policy::Contiguous
    }
}
