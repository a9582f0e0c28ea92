/// Integration tests for file-backed trace reading.
use lbsim_core::trace::{self, ReadOutcome, TraceReader, TraceRecord};
use lbsim_core::TraceSetReader;
use std::io::Write;

fn write_file(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "ts,sub_ts,rank,block_id,time_us\n{}", body).unwrap();
    path
}

#[test]
fn test_pending_record_carries_over() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "prof.merged.evt0.csv",
        "0,0,0,0,100\n0,0,0,1,50\n0,1,0,0,30\n",
    );
    let mut reader = TraceReader::open(&path).unwrap();

    match reader.read_timestep(0).unwrap() {
        ReadOutcome::Timestep(costs) => {
            assert_eq!(costs.costs, vec![100, 50]);
            assert_eq!(costs.records, 2);
        }
        ReadOutcome::EndOfStream => panic!("Expected timestep 0"),
    }
    assert_eq!(reader.pending().map(|p| p.sub_timestep), Some(1));

    match reader.read_timestep(1).unwrap() {
        ReadOutcome::Timestep(costs) => assert_eq!(costs.costs, vec![30]),
        ReadOutcome::EndOfStream => panic!("Expected timestep 1"),
    }
}

#[test]
fn test_write_and_replay_trace() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prof.merged.evt1.csv");
    let records = vec![
        TraceRecord {
            timestep: 0,
            sub_timestep: 0,
            origin_rank: 0,
            block_id: 1,
            duration_us: 7,
        },
        TraceRecord {
            timestep: 0,
            sub_timestep: 0,
            origin_rank: 1,
            block_id: 1,
            duration_us: 3,
        },
        TraceRecord {
            timestep: 0,
            sub_timestep: 4,
            origin_rank: 0,
            block_id: 0,
            duration_us: 9,
        },
    ];
    trace::write_trace(&records, &path).unwrap();

    let mut reader = TraceReader::open(&path).unwrap();
    let first = reader.next_timestep().unwrap().unwrap();
    assert_eq!(first.timestep, 0);
    assert_eq!(first.costs, vec![0, 10]);
    let second = reader.next_timestep().unwrap().unwrap();
    assert_eq!(second.timestep, 4);
    assert_eq!(second.costs, vec![9]);
    assert!(reader.next_timestep().unwrap().is_none());
}

#[test]
fn test_reset_is_idempotent_on_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "prof.merged.evt0.csv",
        "0,0,0,0,1\n0,0,0,1,2\n1,1,0,2,3\n1,0,0,0,99\n1,1,0,0,4\n3,3,0,1,5\n",
    );
    let mut reader = TraceReader::open(&path).unwrap();
    let replay = |reader: &mut TraceReader| {
        (0..5)
            .map(|ts| reader.read_timestep(ts).unwrap())
            .collect::<Vec<_>>()
    };

    let first = replay(&mut reader);
    reader.reset().unwrap();
    let second = replay(&mut reader);
    assert_eq!(first, second);
}

#[test]
fn test_set_reader_over_discovered_files() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "prof.merged.evt0.csv", "0,0,0,0,10\n0,1,0,0,10\n");
    write_file(dir.path(), "prof.merged.evt1.csv", "0,0,0,1,5\n0,1,0,1,5\n");
    write_file(dir.path(), "unrelated.csv", "0,0,0,0,1000\n");

    let mut set = TraceSetReader::discover(dir.path()).unwrap();
    assert_eq!(set.len(), 2);
    let ts0 = set.next_timestep().unwrap().unwrap();
    assert_eq!(ts0.costs, vec![10, 5]);
    let ts1 = set.next_timestep().unwrap().unwrap();
    assert_eq!(ts1.costs, vec![10, 5]);
    assert!(set.next_timestep().unwrap().is_none());
}

#[test]
fn test_missing_trace_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    assert!(TraceReader::open(dir.path().join("prof.merged.evt9.csv")).is_err());
}
