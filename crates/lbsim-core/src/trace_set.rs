//! Lock-step replay of several trace files from the same run.
//!
//! A run records one trace per captured event type. Each file is read with
//! its own [`TraceReader`]; for a given timestep their cost vectors are added
//! block by block.

use crate::discovery::discover_trace_files;
use crate::trace::{FileSource, ReadOutcome, TimestepCosts, TraceError, TraceReader, TraceSource};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct TraceSetReader<S: TraceSource = FileSource> {
    readers: Vec<TraceReader<S>>,
    cursor: Option<u64>,
}

impl TraceSetReader<FileSource> {
    /// Open every file in `paths`. Any file failing to open is fatal.
    pub fn open(paths: &[PathBuf]) -> Result<Self, TraceError> {
        let readers = paths
            .iter()
            .map(|p| TraceReader::open(p.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(readers))
    }

    /// Discover and open the trace files under `dir`.
    pub fn discover(dir: &Path) -> Result<Self, TraceError> {
        Self::open(&discover_trace_files(dir)?)
    }
}

impl<S: TraceSource> TraceSetReader<S> {
    pub fn new(readers: Vec<TraceReader<S>>) -> Self {
        Self {
            readers,
            cursor: None,
        }
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    pub fn current_timestep(&self) -> Option<u64> {
        self.cursor
    }

    /// Merged costs of the next timestep with data in any file, or `None`
    /// once every file is exhausted.
    pub fn next_timestep(&mut self) -> Result<Option<TimestepCosts>, TraceError> {
        loop {
            let mut ts = self.cursor.map_or(0, |c| c + 1);

            let live: Vec<&TraceReader<S>> = self.readers.iter().filter(|r| !r.is_eof()).collect();
            if live.is_empty() {
                return Ok(None);
            }
            // Only jump ahead when every live reader is parked on a future record.
            let earliest_pending = live
                .iter()
                .map(|r| r.pending().map(|p| p.sub_timestep))
                .collect::<Option<Vec<_>>>()
                .and_then(|pending| pending.into_iter().min());
            if let Some(earliest) = earliest_pending {
                ts = ts.max(earliest);
            }

            let mut merged = TimestepCosts::new(ts);
            let mut all_ended = true;
            for reader in &mut self.readers {
                if let ReadOutcome::Timestep(costs) = reader.read_timestep(ts)? {
                    all_ended = false;
                    merged.merge(&costs);
                }
            }
            self.cursor = Some(ts);

            if !merged.is_empty() {
                debug!(
                    timestep = ts,
                    records = merged.records,
                    nblocks = merged.nblocks(),
                    files = self.readers.len(),
                    "merged timestep"
                );
                return Ok(Some(merged));
            }
            if all_ended {
                return Ok(None);
            }
        }
    }

    /// Reset every reader back to the start of its trace.
    pub fn reset(&mut self) -> Result<(), TraceError> {
        for reader in &mut self.readers {
            reader.reset()?;
        }
        self.cursor = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::MemorySource;

    fn reader(body: &str) -> TraceReader<MemorySource> {
        TraceReader::from_text(&format!("ts,sub_ts,rank,block_id,time_us\n{}", body))
    }

    #[test]
    fn test_merges_same_timestep_across_files() {
        let mut set = TraceSetReader::new(vec![
            reader("0,0,0,0,10\n0,0,0,1,20\n1,1,0,0,5\n"),
            reader("0,0,1,1,1\n0,0,1,2,2\n"),
        ]);

        let ts0 = set.next_timestep().unwrap().unwrap();
        assert_eq!(ts0.timestep, 0);
        assert_eq!(ts0.costs, vec![10, 21, 2]);
        assert_eq!(ts0.records, 4);

        let ts1 = set.next_timestep().unwrap().unwrap();
        assert_eq!(ts1.timestep, 1);
        assert_eq!(ts1.costs, vec![5]);

        assert!(set.next_timestep().unwrap().is_none());
    }

    #[test]
    fn test_files_with_disjoint_timesteps() {
        let mut set = TraceSetReader::new(vec![reader("0,0,0,0,1\n"), reader("0,3,0,0,7\n")]);
        let timesteps: Vec<u64> = std::iter::from_fn(|| set.next_timestep().unwrap())
            .map(|c| c.timestep)
            .collect();
        assert_eq!(timesteps, vec![0, 3]);
    }

    #[test]
    fn test_reset_rewinds_all_files() {
        let mut set = TraceSetReader::new(vec![reader("0,0,0,0,1\n"), reader("0,1,0,0,2\n")]);
        while set.next_timestep().unwrap().is_some() {}
        set.reset().unwrap();
        assert_eq!(set.current_timestep(), None);
        assert_eq!(set.next_timestep().unwrap().unwrap().costs, vec![1]);
    }

    #[test]
    fn test_empty_set() {
        let mut set: TraceSetReader<MemorySource> = TraceSetReader::new(Vec::new());
        assert!(set.is_empty());
        assert!(set.next_timestep().unwrap().is_none());
    }
}
