/// Integration tests feeding replayed cost vectors into the policies.
use lbsim_core::synthetic::{generate_trace, SyntheticParams};
use lbsim_core::{trace, TraceReader};
use lbsim_policies::*;

#[test]
fn test_skewed_ten_blocks_three_ranks() {
    let assignment = assign(Policy::Skewed, &[1; 10], 3).unwrap();
    // rank0_alloc = 4; blocks 0..=4 on rank 0, then chunks of 3 from block 5.
    assert_eq!(assignment, vec![0, 0, 0, 0, 0, 1, 1, 2, 2, 2]);
}

#[test]
fn test_round_robin_independent_of_costs() {
    let flat = assign(Policy::RoundRobin, &[0; 9], 4).unwrap();
    let skewed = assign(Policy::RoundRobin, &[9, 0, 0, 0, 0, 0, 0, 0, 100_000], 4).unwrap();
    assert_eq!(flat, skewed);
    assert_eq!(flat, vec![0, 1, 2, 3, 0, 1, 2, 3, 0]);
}

#[test]
fn test_unknown_policy_tag_is_rejected() {
    assert!(matches!(
        policy_by_name("cost-greedy"),
        Err(PolicyError::UnknownPolicy(_))
    ));
}

#[test]
fn test_replayed_costs_assign_under_every_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prof.merged.evt0.csv");
    let params = SyntheticParams {
        timesteps: 8,
        initial_blocks: 32,
        growth_per_timestep: 8,
        events_per_block: 3,
        ..SyntheticParams::default()
    };
    trace::write_trace(&generate_trace(&params), &path).unwrap();

    let mut reader = TraceReader::open(&path).unwrap();
    let mut seen = 0;
    while let Some(step) = reader.next_timestep().unwrap() {
        assert!(step.total_cost() > 0);
        for nranks in [1, 2, 7, 16, 32] {
            assert!(step.nblocks() >= nranks);
            for policy in Policy::ALL {
                let assignment = assign(policy, &step.costs, nranks)
                    .unwrap_or_else(|e| panic!("{} failed at ts {}: {}", policy, step.timestep, e));
                assert_eq!(assignment.len(), step.nblocks());
                assert!(assignment.iter().all(|&r| r < nranks));
            }
        }
        seen += 1;
    }
    assert_eq!(seen, 8);
}

#[test]
fn test_contiguous_bias_opposes_skewed() {
    let costs = vec![100u64; 40];
    let nranks = 4;
    let contiguous = assign(Policy::Contiguous, &costs, nranks).unwrap();
    let skewed = assign(Policy::Skewed, &costs, nranks).unwrap();
    let contiguous = rank_loads(&costs, &contiguous, nranks);
    let skewed = rank_loads(&costs, &skewed, nranks);

    assert_eq!(contiguous.iter().min(), Some(&contiguous[0]));
    assert_eq!(skewed.iter().max(), Some(&skewed[0]));
}
