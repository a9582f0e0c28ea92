//! Skewed assignment: rank 0 takes an oversized leading range.
//!
//! Rank 0 receives blocks `0..=rank0_alloc`, where `rank0_alloc` starts at
//! `ceil(nblocks / nranks)` and grows until the blocks after it split evenly
//! across the other `nranks - 1` ranks. The remaining blocks are handed out in
//! equal contiguous chunks in block-id order. Costs are ignored.

use crate::traits::*;
use tracing::{debug, error};

/// Skewed assigner.
#[derive(Debug, Clone, Copy, Default)]
pub struct Skewed;

impl Skewed {
    pub fn new() -> Self {
        Self
    }
}

/// Size of rank 0's allocation before the inclusive boundary block.
fn rank0_allocation(nblocks: usize, nranks: usize) -> usize {
    let mut rank0_alloc = nblocks.div_ceil(nranks);
    while (nblocks - rank0_alloc) % (nranks - 1) != 0 {
        rank0_alloc += 1;
    }
    rank0_alloc
}

impl AssignmentPolicy for Skewed {
    fn assign(&self, costs: &[u64], nranks: usize) -> Result<Assignment, PolicyError> {
        check_ranks(nranks)?;

        let nblocks = costs.len();
        if nblocks == 0 {
            return Ok(Vec::new());
        }
        // With a single rank there is nothing to skew against.
        if nranks == 1 {
            return Ok(vec![0; nblocks]);
        }

        let rank0_alloc = rank0_allocation(nblocks, nranks);
        if rank0_alloc >= nblocks {
            error!(rank0_alloc, nblocks, "skewed policy: rank 0 absorbs every block");
            return Err(PolicyError::DegenerateSkew {
                rank0_alloc,
                nblocks,
            });
        }

        let rem_alloc = (nblocks - rank0_alloc) / (nranks - 1);
        debug!(rank0_alloc, rem_alloc, nblocks, nranks, "skewed allocation");

        let assignment = (0..nblocks)
            .map(|block_id| {
                if block_id <= rank0_alloc {
                    0
                } else {
                    1 + (block_id - rank0_alloc) / rem_alloc
                }
            })
            .collect();
        Ok(assignment)
    }

    fn policy(&self) -> Policy {
        Policy::Skewed
    }
}
