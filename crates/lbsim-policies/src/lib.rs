//! Built-in block-to-rank assignment policies for lbsim.
//!
//! This crate provides the [`AssignmentPolicy`] trait and the policies used to
//! replay mesh-refinement cost traces:
//!
//! | Policy | Strategy | Rank 0 load |
//! |--------|----------|-------------|
//! | [`RoundRobin`] | `block mod nranks` | Same block count as others |
//! | [`Contiguous`] | Greedy cost-balanced ranges, filled from the end | Lightest |
//! | [`Skewed`] | Oversized leading range, equal chunks after | Heaviest |
//!
//! Every policy is a pure function of its inputs.

pub mod contiguous;
pub mod round_robin;
pub mod skewed;
pub mod traits;

pub use contiguous::Contiguous;
pub use round_robin::RoundRobin;
pub use skewed::Skewed;
pub use traits::*;

/// Create the assigner for a policy tag.
pub fn policy_for(policy: Policy) -> Box<dyn AssignmentPolicy> {
    match policy {
        Policy::RoundRobin => Box::new(RoundRobin::new()),
        Policy::Contiguous => Box::new(Contiguous::new()),
        Policy::Skewed => Box::new(Skewed::new()),
    }
}

/// Create an assigner by name. Unknown names are an error.
pub fn policy_by_name(name: &str) -> Result<Box<dyn AssignmentPolicy>, PolicyError> {
    name.parse::<Policy>().map(policy_for)
}

/// List all available built-in policy names.
pub fn available_policies() -> Vec<&'static str> {
    Policy::ALL.iter().map(|p| p.as_str()).collect()
}

/// Assign `costs` across `nranks` under `policy`.
pub fn assign(policy: Policy, costs: &[u64], nranks: usize) -> Result<Assignment, PolicyError> {
    tracing::debug!(%policy, nblocks = costs.len(), nranks, "assigning blocks");
    policy_for(policy).assign(costs, nranks)
}
