//! lbsim: trace-driven simulator for AMR block load-balancing policies.
//!
//! Recorded per-block execution costs are replayed timestep by timestep, and
//! each timestep's cost vector is partitioned across ranks by the policies
//! from `lbsim-policies`. Nothing is executed for real: the simulator only
//! reports the rank assignment and load spread each policy would produce.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐     ┌─────────────┐     ┌──────────────┐
//! │  Trace    │────▶│  PolicySim  │────▶│   Metrics    │
//! │  Readers  │     │  (driver)   │     │  + Reports   │
//! └───────────┘     └──────┬──────┘     └──────────────┘
//!                          │
//!            ┌─────────────┼─────────────┐
//!            ▼             ▼             ▼
//!     ┌────────────┐ ┌────────────┐ ┌────────────┐
//!     │ RoundRobin │ │ Contiguous │ │   Skewed   │
//!     └────────────┘ └────────────┘ └────────────┘
//! ```

pub mod config;
pub mod discovery;
pub mod metrics;
pub mod report;
pub mod simulation;
pub mod synthetic;
pub mod trace;
pub mod trace_set;

// Re-export key types for convenience.
pub use config::SimConfig;
pub use discovery::discover_trace_files;
pub use metrics::{MetricsCollector, PolicyMetrics, TimestepMetrics};
pub use report::{Table, TableRow};
pub use simulation::{PolicySim, SimError, SimulationReport};
pub use synthetic::{generate_trace, SyntheticParams};
pub use trace::{
    write_trace, FileSource, MemorySource, ReadOutcome, TimestepCosts, TraceError, TraceReader,
    TraceRecord, TraceSource,
};
pub use trace_set::TraceSetReader;

/// Run a complete replay with the given configuration.
pub fn run_simulation(config: &SimConfig) -> Result<SimulationReport, SimError> {
    PolicySim::new(config)?.run()
}
