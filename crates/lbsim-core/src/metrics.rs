//! Metrics collection and aggregation for policy replays.
//!
//! For every (timestep, policy) pair the collector records how the replayed
//! cost was spread over ranks: the heaviest rank, the imbalance against the
//! mean, Jain's fairness index and how often neighbouring blocks land on
//! different ranks. At the end of a run these are folded into one
//! [`PolicyMetrics`] per policy.

use lbsim_policies::{rank_loads, Policy};
use serde::{Deserialize, Serialize};

/// Percentile values for a distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Percentiles {
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl Percentiles {
    /// Compute percentiles from a slice of values.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                p50: 0.0,
                p75: 0.0,
                p90: 0.0,
                p95: 0.0,
                p99: 0.0,
                min: 0.0,
                max: 0.0,
                mean: 0.0,
            };
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;

        Self {
            p50: percentile_sorted(&sorted, 50.0),
            p75: percentile_sorted(&sorted, 75.0),
            p90: percentile_sorted(&sorted, 90.0),
            p95: percentile_sorted(&sorted, 95.0),
            p99: percentile_sorted(&sorted, 99.0),
            min: sorted[0],
            max: sorted[n - 1],
            mean,
        }
    }
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// How one policy spread one timestep's cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestepMetrics {
    pub timestep: u64,
    pub policy: Policy,
    pub nblocks: usize,
    pub total_cost_us: u64,
    /// Cost of the most loaded rank: the timestep's simulated makespan.
    pub max_rank_cost_us: u64,
    pub mean_rank_cost_us: f64,
    /// `max / mean`; 1.0 is perfect balance.
    pub imbalance: f64,
    pub jains_fairness_index: f64,
    /// Number of adjacent block pairs placed on different ranks.
    pub rank_changes: usize,
}

impl TimestepMetrics {
    pub fn compute(
        timestep: u64,
        policy: Policy,
        costs: &[u64],
        assignment: &[usize],
        nranks: usize,
    ) -> Self {
        let loads = rank_loads(costs, assignment, nranks);
        let total: u64 = loads.iter().sum();
        let max = loads.iter().copied().max().unwrap_or(0);
        let mean = if loads.is_empty() {
            0.0
        } else {
            total as f64 / loads.len() as f64
        };

        Self {
            timestep,
            policy,
            nblocks: costs.len(),
            total_cost_us: total,
            max_rank_cost_us: max,
            mean_rank_cost_us: mean,
            imbalance: if mean > 0.0 { max as f64 / mean } else { 1.0 },
            jains_fairness_index: jains_fairness_index(&loads),
            rank_changes: assignment.windows(2).filter(|w| w[0] != w[1]).count(),
        }
    }
}

/// Aggregated metrics for one policy over a whole replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyMetrics {
    pub policy: Policy,
    pub nranks: usize,
    pub timesteps: u64,
    pub total_cost_us: u64,
    /// Sum over timesteps of the most loaded rank's cost.
    pub makespan_us: u64,
    pub imbalance: Percentiles,
    pub mean_jains_fairness_index: f64,
    pub mean_rank_changes: f64,
    /// Cost carried by each rank, summed over all timesteps.
    pub per_rank_cost_us: Vec<u64>,
    /// Coefficient of variation of `per_rank_cost_us`.
    pub load_cv: f64,
}

/// Collector that accumulates per-timestep metrics during a replay.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    nranks: usize,
    policies: Vec<Policy>,
    records: Vec<TimestepMetrics>,
    per_rank: Vec<Vec<u64>>,
}

impl MetricsCollector {
    pub fn new(nranks: usize, policies: &[Policy]) -> Self {
        Self {
            nranks,
            policies: policies.to_vec(),
            records: Vec::new(),
            per_rank: vec![vec![0; nranks]; policies.len()],
        }
    }

    /// Record one policy's assignment of one timestep.
    pub fn record(&mut self, timestep: u64, policy: Policy, costs: &[u64], assignment: &[usize]) {
        if let Some(idx) = self.policies.iter().position(|&p| p == policy) {
            let loads = rank_loads(costs, assignment, self.nranks);
            for (acc, load) in self.per_rank[idx].iter_mut().zip(loads) {
                *acc += load;
            }
        }
        self.records.push(TimestepMetrics::compute(
            timestep,
            policy,
            costs,
            assignment,
            self.nranks,
        ));
    }

    pub fn records(&self) -> &[TimestepMetrics] {
        &self.records
    }

    /// Fold the per-timestep records into one summary per policy.
    pub fn aggregate(&self) -> Vec<PolicyMetrics> {
        self.policies
            .iter()
            .enumerate()
            .map(|(idx, &policy)| {
                let records: Vec<&TimestepMetrics> =
                    self.records.iter().filter(|r| r.policy == policy).collect();
                let n = records.len();
                let imbalance: Vec<f64> = records.iter().map(|r| r.imbalance).collect();
                let mean_of = |f: fn(&TimestepMetrics) -> f64| {
                    if n == 0 {
                        0.0
                    } else {
                        records.iter().map(|r| f(r)).sum::<f64>() / n as f64
                    }
                };

                PolicyMetrics {
                    policy,
                    nranks: self.nranks,
                    timesteps: n as u64,
                    total_cost_us: records.iter().map(|r| r.total_cost_us).sum(),
                    makespan_us: records.iter().map(|r| r.max_rank_cost_us).sum(),
                    imbalance: Percentiles::from_values(&imbalance),
                    mean_jains_fairness_index: mean_of(|r| r.jains_fairness_index),
                    mean_rank_changes: mean_of(|r| r.rank_changes as f64),
                    per_rank_cost_us: self.per_rank[idx].clone(),
                    load_cv: coefficient_of_variation(&self.per_rank[idx]),
                }
            })
            .collect()
    }
}

/// Coefficient of variation (std / mean).
pub fn coefficient_of_variation(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<u64>() as f64 / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    variance.sqrt() / mean
}

/// Jain's fairness index: (sum(x_i))^2 / (n * sum(x_i^2)).
pub fn jains_fairness_index(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    let n = values.len() as f64;
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    let sum_sq: f64 = values.iter().map(|&v| (v as f64).powi(2)).sum();
    if sum_sq == 0.0 {
        return 1.0;
    }
    (sum * sum) / (n * sum_sq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentiles_empty() {
        let p = Percentiles::from_values(&[]);
        assert_eq!(p.p50, 0.0);
        assert_eq!(p.mean, 0.0);
    }

    #[test]
    fn test_percentiles_distribution() {
        let values: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        let p = Percentiles::from_values(&values);
        assert!((p.p50 - 50.0).abs() < 2.0);
        assert!((p.p99 - 99.0).abs() < 2.0);
        assert_eq!(p.min, 1.0);
        assert_eq!(p.max, 100.0);
    }

    #[test]
    fn test_coefficient_of_variation() {
        assert_eq!(coefficient_of_variation(&[]), 0.0);
        assert_eq!(coefficient_of_variation(&[5, 5, 5, 5]), 0.0);
        assert!(coefficient_of_variation(&[1, 2, 3, 4, 5]) > 0.0);
    }

    #[test]
    fn test_jains_fairness() {
        assert!((jains_fairness_index(&[100, 100, 100, 100]) - 1.0).abs() < 0.001);
        assert!(jains_fairness_index(&[100, 0, 0, 0]) < 0.5);
    }

    #[test]
    fn test_timestep_metrics() {
        let costs = [10, 10, 30, 50];
        let m = TimestepMetrics::compute(7, Policy::Contiguous, &costs, &[0, 0, 1, 1], 2);
        assert_eq!(m.timestep, 7);
        assert_eq!(m.total_cost_us, 100);
        assert_eq!(m.max_rank_cost_us, 80);
        assert_eq!(m.mean_rank_cost_us, 50.0);
        assert!((m.imbalance - 1.6).abs() < 1e-9);
        assert_eq!(m.rank_changes, 1);
    }

    #[test]
    fn test_zero_cost_timestep_is_balanced() {
        let m = TimestepMetrics::compute(0, Policy::RoundRobin, &[0, 0], &[0, 1], 2);
        assert_eq!(m.imbalance, 1.0);
        assert_eq!(m.jains_fairness_index, 1.0);
    }

    #[test]
    fn test_aggregate_per_policy() {
        let policies = [Policy::RoundRobin, Policy::Contiguous];
        let mut collector = MetricsCollector::new(2, &policies);
        collector.record(0, Policy::RoundRobin, &[4, 4, 8, 0], &[0, 1, 0, 1]);
        collector.record(0, Policy::Contiguous, &[4, 4, 8, 0], &[0, 0, 1, 1]);
        collector.record(1, Policy::RoundRobin, &[2, 2], &[0, 1]);
        collector.record(1, Policy::Contiguous, &[2, 2], &[0, 1]);

        let summary = collector.aggregate();
        assert_eq!(summary.len(), 2);

        let rr = &summary[0];
        assert_eq!(rr.policy, Policy::RoundRobin);
        assert_eq!(rr.timesteps, 2);
        assert_eq!(rr.total_cost_us, 20);
        assert_eq!(rr.makespan_us, 12 + 2);
        assert_eq!(rr.per_rank_cost_us, vec![14, 6]);

        let contiguous = &summary[1];
        assert_eq!(contiguous.makespan_us, 8 + 2);
        assert_eq!(contiguous.per_rank_cost_us, vec![10, 10]);
        assert_eq!(contiguous.load_cv, 0.0);
    }
}
