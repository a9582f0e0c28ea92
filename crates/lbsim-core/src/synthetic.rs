//! Synthetic cost traces for trying policies without a recorded run.
//!
//! Blocks are refined over time (the block count grows every timestep) and a
//! leading fraction of the mesh is a "hot" refinement region whose blocks cost
//! more. Output is deterministic for a given seed.

use crate::trace::TraceRecord;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone)]
pub struct SyntheticParams {
    pub timesteps: u64,
    pub initial_blocks: usize,
    /// Blocks added at every timestep.
    pub growth_per_timestep: usize,
    /// Number of ranks that "measured" the records.
    pub origin_ranks: u32,
    /// Records per block per timestep.
    pub events_per_block: u32,
    pub mean_cost_us: f64,
    /// Uniform jitter as a fraction of the mean, in `[0, 1]`.
    pub jitter: f64,
    /// Fraction of blocks, from block 0, inside the hot region.
    pub hot_fraction: f64,
    /// Cost multiplier for hot blocks.
    pub hot_factor: f64,
    pub seed: u64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            timesteps: 20,
            initial_blocks: 64,
            growth_per_timestep: 4,
            origin_ranks: 8,
            events_per_block: 1,
            mean_cost_us: 1000.0,
            jitter: 0.2,
            hot_fraction: 0.25,
            hot_factor: 3.0,
            seed: 42,
        }
    }
}

/// Generate a trace ordered by timestep, then block id.
pub fn generate_trace(params: &SyntheticParams) -> Vec<TraceRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let jitter = params.jitter.clamp(0.0, 1.0);
    let origin_ranks = params.origin_ranks.max(1) as usize;
    let mut records = Vec::new();

    for ts in 0..params.timesteps {
        let nblocks = params.initial_blocks + ts as usize * params.growth_per_timestep;
        let hot_blocks = (nblocks as f64 * params.hot_fraction.clamp(0.0, 1.0)) as usize;

        for block_id in 0..nblocks {
            let origin_rank = (block_id * origin_ranks / nblocks.max(1)) as u32;
            let base = if block_id < hot_blocks {
                params.mean_cost_us * params.hot_factor
            } else {
                params.mean_cost_us
            };
            for _ in 0..params.events_per_block {
                let noise = 1.0 + jitter * (rng.gen::<f64>() * 2.0 - 1.0);
                records.push(TraceRecord {
                    timestep: ts,
                    sub_timestep: ts,
                    origin_rank,
                    block_id,
                    duration_us: (base * noise).max(1.0) as u64,
                });
            }
        }
    }
    records
}
