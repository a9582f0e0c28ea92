//! Trace replay driver.
//!
//! Pulls timesteps from a [`TraceSetReader`], hands each cost vector to every
//! configured policy, and collects the resulting metrics. Any fatal trace or
//! policy error ends the run without a report.

use crate::config::{ConfigError, SimConfig};
use crate::metrics::{MetricsCollector, PolicyMetrics, TimestepMetrics};
use crate::report::Table;
use crate::trace::{TraceError, TraceSource};
use crate::trace_set::TraceSetReader;
use lbsim_policies::{Policy, PolicyError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Trace(#[from] TraceError),
    #[error("Policy {policy} failed at timestep {timestep}: {source}")]
    Policy {
        policy: Policy,
        timestep: u64,
        source: PolicyError,
    },
    #[error(transparent)]
    InvalidPolicy(#[from] PolicyError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Everything a replay produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub name: String,
    pub nranks: usize,
    pub trace_files: Vec<String>,
    pub timesteps: u64,
    pub policies: Vec<PolicyMetrics>,
    pub timestep_metrics: Vec<TimestepMetrics>,
}

impl SimulationReport {
    /// Per-policy summary as an aligned table.
    pub fn summary_table(&self) -> String {
        Table::from_rows(&self.policies).render()
    }

    /// Write the configured report files into `dir`, creating it if needed.
    pub fn write(&self, dir: &Path, json: bool, csv: bool) -> Result<Vec<PathBuf>, SimError> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        if csv {
            let summary = dir.join("summary.csv");
            std::fs::write(&summary, Table::from_rows(&self.policies).to_csv())?;
            written.push(summary);

            let timesteps = dir.join("timesteps.csv");
            std::fs::write(&timesteps, Table::from_rows(&self.timestep_metrics).to_csv())?;
            written.push(timesteps);
        }
        if json {
            let path = dir.join("summary.json");
            std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
            written.push(path);
        }
        for path in &written {
            info!(path = %path.display(), "report written");
        }
        Ok(written)
    }
}

/// Replays traces under every configured policy.
pub struct PolicySim<'a> {
    config: &'a SimConfig,
    policies: Vec<Policy>,
}

impl<'a> PolicySim<'a> {
    pub fn new(config: &'a SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let policies = config.policies()?;
        Ok(Self { config, policies })
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    /// Trace files named by the configuration, discovering them if needed.
    pub fn trace_files(&self) -> Result<Vec<PathBuf>, SimError> {
        if !self.config.trace.files.is_empty() {
            return Ok(self.config.trace.files.clone());
        }
        match &self.config.trace.dir {
            Some(dir) => Ok(crate::discovery::discover_trace_files(dir)?),
            None => Err(ConfigError::Validation(
                "either trace.dir or trace.files must be set".to_string(),
            )
            .into()),
        }
    }

    /// Open the configured traces and replay them.
    pub fn run(&self) -> Result<SimulationReport, SimError> {
        let files = self.trace_files()?;
        let mut reader = TraceSetReader::open(&files)?;
        let names = files.iter().map(|p| p.display().to_string()).collect();
        self.replay(&mut reader, names)
    }

    /// Replay an already opened trace set from its current position.
    pub fn replay<S: TraceSource>(
        &self,
        reader: &mut TraceSetReader<S>,
        trace_files: Vec<String>,
    ) -> Result<SimulationReport, SimError> {
        let nranks = self.config.simulation.nranks;
        let max_timesteps = self.config.trace.max_timesteps;
        let mut collector = MetricsCollector::new(nranks, &self.policies);
        let mut timesteps = 0u64;

        info!(
            name = %self.config.simulation.name,
            nranks,
            files = reader.len(),
            policies = ?self.policies,
            "starting policy replay"
        );

        while let Some(step) = reader.next_timestep()? {
            for &policy in &self.policies {
                let assignment =
                    lbsim_policies::assign(policy, &step.costs, nranks).map_err(|source| {
                        error!(%policy, timestep = step.timestep, %source, "assignment failed");
                        SimError::Policy {
                            policy,
                            timestep: step.timestep,
                            source,
                        }
                    })?;
                collector.record(step.timestep, policy, &step.costs, &assignment);
            }
            debug!(
                timestep = step.timestep,
                nblocks = step.nblocks(),
                total_cost_us = step.total_cost(),
                "timestep replayed"
            );

            timesteps += 1;
            if max_timesteps > 0 && timesteps >= max_timesteps {
                info!(max_timesteps, "timestep limit reached");
                break;
            }
        }

        info!(timesteps, "policy replay finished");
        Ok(SimulationReport {
            name: self.config.simulation.name.clone(),
            nranks,
            trace_files,
            timesteps,
            policies: collector.aggregate(),
            timestep_metrics: collector.records().to_vec(),
        })
    }
}
