//! lbsim CLI: replay AMR cost traces under different load-balancing policies.

use clap::{Parser, Subcommand};
use lbsim_core::config::SimConfig;
use lbsim_core::synthetic::{self, SyntheticParams};
use lbsim_core::{trace, PolicySim, SimError, TraceReader};
use lbsim_policies::{rank_loads, Policy};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "lbsim",
    about = "Replay AMR block cost traces under different load-balancing policies",
    version
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay every trace of a run under the configured policies.
    Run {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Profile directory containing prof.*.csv traces.
        #[arg(short = 'i', long)]
        trace_dir: Option<PathBuf>,
        /// Number of ranks.
        #[arg(short, long)]
        nranks: Option<usize>,
        /// Comma-separated list of policies.
        #[arg(short, long, value_delimiter = ',')]
        policies: Vec<String>,
        /// Stop after this many timesteps with data.
        #[arg(long)]
        max_timesteps: Option<u64>,
        /// Report output directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print one timestep's assignment from a single trace file.
    Assign {
        /// Trace file.
        #[arg(short, long)]
        trace: PathBuf,
        /// Policy tag.
        #[arg(short, long, default_value = "contiguous")]
        policy: String,
        /// Number of ranks.
        #[arg(short, long, default_value = "512")]
        nranks: usize,
        /// Timestep to assign (default: first timestep with data).
        #[arg(long)]
        timestep: Option<u64>,
    },
    /// Generate a synthetic trace.
    GenTrace {
        #[arg(long, default_value = "20")]
        timesteps: u64,
        #[arg(long, default_value = "64")]
        initial_blocks: usize,
        /// Blocks added per timestep.
        #[arg(long, default_value = "4")]
        growth: usize,
        #[arg(long, default_value = "8")]
        origin_ranks: u32,
        #[arg(long, default_value = "1")]
        events_per_block: u32,
        /// Mean block cost in microseconds.
        #[arg(long, default_value = "1000")]
        mean_cost: f64,
        #[arg(long, default_value = "0.2")]
        jitter: f64,
        #[arg(long, default_value = "0.25")]
        hot_fraction: f64,
        #[arg(long, default_value = "3.0")]
        hot_factor: f64,
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Output file path.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List available policies.
    ListPolicies,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "lbsim=info",
        1 => "lbsim=debug",
        _ => "lbsim=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            trace_dir,
            nranks,
            policies,
            max_timesteps,
            output,
        } => run(config, trace_dir, nranks, policies, max_timesteps, output),
        Commands::Assign {
            trace,
            policy,
            nranks,
            timestep,
        } => assign(trace, &policy, nranks, timestep),
        Commands::GenTrace {
            timesteps,
            initial_blocks,
            growth,
            origin_ranks,
            events_per_block,
            mean_cost,
            jitter,
            hot_fraction,
            hot_factor,
            seed,
            output,
        } => {
            let params = SyntheticParams {
                timesteps,
                initial_blocks,
                growth_per_timestep: growth,
                origin_ranks,
                events_per_block,
                mean_cost_us: mean_cost,
                jitter,
                hot_fraction,
                hot_factor,
                seed,
            };
            let records = synthetic::generate_trace(&params);
            trace::write_trace(&records, &output)
                .map(|()| {
                    println!(
                        "Generated {} records to {}",
                        records.len(),
                        output.display()
                    )
                })
                .map_err(SimError::from)
        }
        Commands::ListPolicies => {
            println!("Available policies:");
            for name in lbsim_policies::available_policies() {
                println!("  - {}", name);
            }
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(
    config_path: Option<PathBuf>,
    trace_dir: Option<PathBuf>,
    nranks: Option<usize>,
    policies: Vec<String>,
    max_timesteps: Option<u64>,
    output: Option<PathBuf>,
) -> Result<(), SimError> {
    let mut config = match (&config_path, &trace_dir) {
        (Some(path), _) => SimConfig::from_file(path)?,
        (None, Some(dir)) => SimConfig::for_trace_dir(dir.clone()),
        (None, None) => {
            return Err(lbsim_core::config::ConfigError::Validation(
                "No trace source given. Use --config or --trace-dir.".to_string(),
            )
            .into())
        }
    };

    if let Some(dir) = trace_dir {
        config.trace.dir = Some(dir);
        config.trace.files.clear();
    }
    if let Some(n) = nranks {
        config.simulation.nranks = n;
    }
    if !policies.is_empty() {
        config.simulation.policies = policies;
    }
    if let Some(limit) = max_timesteps {
        config.trace.max_timesteps = limit;
    }
    if output.is_some() {
        config.output.dir = output;
    }

    let report = PolicySim::new(&config)?.run()?;
    println!("{}", report.summary_table());

    if let Some(dir) = config.output_dir() {
        let written = report.write(&dir, config.output.write_json, config.output.write_csv)?;
        println!("Reports written to {} ({} files)", dir.display(), written.len());
    }
    Ok(())
}

fn assign(
    trace_path: PathBuf,
    policy: &str,
    nranks: usize,
    timestep: Option<u64>,
) -> Result<(), SimError> {
    let policy: Policy = policy.parse()?;
    let mut reader = TraceReader::open(trace_path)?;

    let step = loop {
        match reader.next_timestep()? {
            None => {
                println!("No data for the requested timestep.");
                return Ok(());
            }
            Some(step) if timestep.map_or(true, |ts| step.timestep >= ts) => break step,
            Some(_) => continue,
        }
    };
    if let Some(ts) = timestep {
        if step.timestep != ts {
            println!("No data for timestep {}.", ts);
            return Ok(());
        }
    }

    let assignment =
        lbsim_policies::assign(policy, &step.costs, nranks).map_err(|source| SimError::Policy {
            policy,
            timestep: step.timestep,
            source,
        })?;
    let loads = rank_loads(&step.costs, &assignment, nranks);

    println!(
        "Timestep {} | {} blocks | {} records | policy {}",
        step.timestep,
        step.nblocks(),
        step.records,
        policy
    );
    println!("Assignment: {:?}", assignment);
    println!(
        "Max rank cost: {} us  Total: {} us",
        loads.iter().max().copied().unwrap_or(0),
        step.total_cost()
    );
    Ok(())
}
