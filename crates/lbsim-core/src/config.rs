//! TOML configuration parsing for lbsim.
//!
//! Defines the configuration schema for a policy simulation run: rank count,
//! policies to compare, where the traces live and where reports go. A
//! [`SimConfig`] is built once and passed by reference; there is no global
//! configuration state.

use lbsim_policies::Policy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub trace: TraceSection,
    #[serde(default)]
    pub output: OutputSection,
}

/// General simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSection {
    /// Human-readable name for this simulation.
    #[serde(default = "default_sim_name")]
    pub name: String,
    /// Number of ranks blocks are assigned to.
    #[serde(default = "default_nranks")]
    pub nranks: usize,
    /// Policies to replay, by tag.
    #[serde(default = "default_policies")]
    pub policies: Vec<String>,
}

fn default_sim_name() -> String {
    "lb-sim".to_string()
}

fn default_nranks() -> usize {
    512
}

fn default_policies() -> Vec<String> {
    Policy::ALL.iter().map(|p| p.as_str().to_string()).collect()
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            name: default_sim_name(),
            nranks: default_nranks(),
            policies: default_policies(),
        }
    }
}

/// Trace source configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceSection {
    /// Profile directory scanned for trace files.
    pub dir: Option<PathBuf>,
    /// Explicit trace files. When non-empty, no discovery takes place.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Stop after this many timesteps with data (0 = no limit).
    #[serde(default)]
    pub max_timesteps: u64,
}

/// Report output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Report directory. Defaults to `<trace.dir>/lb_sim`.
    pub dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub write_json: bool,
    #[serde(default = "default_true")]
    pub write_csv: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: None,
            write_json: true,
            write_csv: true,
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration for a single trace directory with defaults elsewhere.
    pub fn for_trace_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            simulation: SimulationSection::default(),
            trace: TraceSection {
                dir: Some(dir.into()),
                ..TraceSection::default()
            },
            output: OutputSection::default(),
        }
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.nranks == 0 {
            return Err(ConfigError::Validation("nranks must be > 0".to_string()));
        }
        if self.simulation.policies.is_empty() {
            return Err(ConfigError::Validation(
                "at least one policy must be listed".to_string(),
            ));
        }
        for name in &self.simulation.policies {
            name.parse::<Policy>()
                .map_err(|e| ConfigError::Validation(e.to_string()))?;
        }
        if self.trace.dir.is_none() && self.trace.files.is_empty() {
            return Err(ConfigError::Validation(
                "either trace.dir or trace.files must be set".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed policy tags, in configured order.
    pub fn policies(&self) -> Result<Vec<Policy>, ConfigError> {
        self.simulation
            .policies
            .iter()
            .map(|name| {
                name.parse::<Policy>()
                    .map_err(|e| ConfigError::Validation(e.to_string()))
            })
            .collect()
    }

    /// Directory reports are written to, if one can be determined.
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output
            .dir
            .clone()
            .or_else(|| self.trace.dir.as_ref().map(|d| d.join("lb_sim")))
    }
}
