/// End-to-end replay tests over trace directories.
use lbsim_core::config::SimConfig;
use lbsim_core::synthetic::{generate_trace, SyntheticParams};
use lbsim_core::{run_simulation, trace, SimError};
use lbsim_policies::Policy;

fn trace_dir(files: usize) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for evt in 0..files {
        let params = SyntheticParams {
            timesteps: 5,
            initial_blocks: 24,
            seed: 42 + evt as u64,
            ..SyntheticParams::default()
        };
        let path = dir.path().join(format!("prof.merged.evt{}.csv", evt));
        trace::write_trace(&generate_trace(&params), &path).unwrap();
    }
    dir
}

fn config_for(dir: &std::path::Path, nranks: usize) -> SimConfig {
    SimConfig::from_str(&format!(
        r#"
[simulation]
name = "integration"
nranks = {}

[trace]
dir = "{}"
"#,
        nranks,
        dir.display()
    ))
    .unwrap()
}

#[test]
fn test_run_simulation_over_directory() {
    let dir = trace_dir(2);
    let config = config_for(dir.path(), 4);
    let report = run_simulation(&config).unwrap();

    assert_eq!(report.trace_files.len(), 2);
    assert_eq!(report.timesteps, 5);
    assert_eq!(report.policies.len(), 3);

    let total = report.policies[0].total_cost_us;
    for summary in &report.policies {
        assert_eq!(summary.total_cost_us, total, "{}", summary.policy);
        assert!(summary.makespan_us * 4 >= total);
        assert_eq!(summary.per_rank_cost_us.iter().sum::<u64>(), total);
    }

    let contiguous = report
        .policies
        .iter()
        .find(|p| p.policy == Policy::Contiguous)
        .unwrap();
    let round_robin = report
        .policies
        .iter()
        .find(|p| p.policy == Policy::RoundRobin)
        .unwrap();
    assert!(contiguous.mean_rank_changes < round_robin.mean_rank_changes);
}

#[test]
fn test_reports_written_to_output_dir() {
    let dir = trace_dir(1);
    let config = config_for(dir.path(), 2);
    let report = run_simulation(&config).unwrap();

    let out = config.output_dir().unwrap();
    report.write(&out, true, true).unwrap();
    assert!(out.join("summary.csv").exists());
    assert!(out.join("timesteps.csv").exists());

    let json = std::fs::read_to_string(out.join("summary.json")).unwrap();
    let parsed: lbsim_core::SimulationReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.timesteps, report.timesteps);
}

#[test]
fn test_empty_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), 2);
    assert!(matches!(run_simulation(&config), Err(SimError::Trace(_))));
}
