//! Streaming trace ingestion.
//!
//! A trace is a CSV event log with a one-line header followed by records of
//! the form `timestep,sub_timestep,origin_rank,block_id,duration_us`, ordered
//! by non-decreasing sub-timestep. [`TraceReader`] replays it one timestep at
//! a time, summing durations per block into a dense cost vector.
//!
//! The reader never holds more than one record of lookahead: a record that
//! belongs to a later timestep than the one being assembled is parked as the
//! *pending* record and resolved at the start of the next read.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Header written by [`write_trace`].
pub const TRACE_HEADER: &str = "ts,sub_ts,rank,block_id,time_us";

/// Largest block id a trace may carry. Cost vectors are dense, so this
/// bounds the memory one timestep can take.
pub const MAX_BLOCK_ID: usize = (1 << 22) - 1;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Unable to open trace {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to read trace: {0}")]
    Io(#[from] std::io::Error),
    #[error("Trace header in {0} is not newline-terminated")]
    Header(String),
    #[error("Trace {0} is not open (previous reset failed)")]
    NotOpen(String),
    #[error("No trace files found in {0}")]
    NoTraceFiles(String),
    #[error("Block id {block_id} in {trace} exceeds the limit of {max}")]
    BlockIdOutOfRange {
        trace: String,
        block_id: usize,
        max: usize,
    },
    #[error("Invalid trace file pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// One measured cost contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub timestep: u64,
    pub sub_timestep: u64,
    /// Rank that measured the cost. Informational only.
    pub origin_rank: u32,
    pub block_id: usize,
    pub duration_us: u64,
}

impl TraceRecord {
    /// Parse one CSV data line. Returns `None` for anything that is not
    /// exactly five non-negative integers. Block ids must fit in 32 bits.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split(',').map(str::trim);
        let record = TraceRecord {
            timestep: fields.next()?.parse().ok()?,
            sub_timestep: fields.next()?.parse().ok()?,
            origin_rank: fields.next()?.parse().ok()?,
            block_id: fields.next()?.parse::<u32>().ok()? as usize,
            duration_us: fields.next()?.parse().ok()?,
        };
        if fields.next().is_some() {
            return None;
        }
        Some(record)
    }
}

/// Per-block cost vector assembled for one timestep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimestepCosts {
    pub timestep: u64,
    /// Summed `duration_us`, indexed by block id. Unseen blocks are 0.
    pub costs: Vec<u64>,
    /// Number of records applied to `costs`.
    pub records: usize,
}

impl TimestepCosts {
    pub fn new(timestep: u64) -> Self {
        Self {
            timestep,
            costs: Vec::new(),
            records: 0,
        }
    }

    /// Number of blocks observed: highest block id seen plus one.
    pub fn nblocks(&self) -> usize {
        self.costs.len()
    }

    /// True when no record has been applied ("no data yet").
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    pub fn total_cost(&self) -> u64 {
        self.costs.iter().fold(0u64, |acc, c| acc.saturating_add(*c))
    }

    /// Callers keep `block_id` within [`MAX_BLOCK_ID`].
    fn apply(&mut self, record: &TraceRecord) {
        if self.costs.len() <= record.block_id {
            self.costs.resize(record.block_id + 1, 0);
        }
        let slot = &mut self.costs[record.block_id];
        *slot = slot.saturating_add(record.duration_us);
        self.records += 1;
    }

    /// Add another file's costs for the same timestep, element-wise.
    pub fn merge(&mut self, other: &TimestepCosts) {
        if self.costs.len() < other.costs.len() {
            self.costs.resize(other.costs.len(), 0);
        }
        for (slot, cost) in self.costs.iter_mut().zip(&other.costs) {
            *slot = slot.saturating_add(*cost);
        }
        self.records += other.records;
    }
}

/// Result of a single [`TraceReader::read_timestep`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Costs for the requested timestep. May hold zero records when the next
    /// available record belongs to a later timestep.
    Timestep(TimestepCosts),
    /// The trace is exhausted.
    EndOfStream,
}

/// Something a [`TraceReader`] can (re)open.
pub trait TraceSource {
    type Reader: BufRead;

    /// Open a fresh stream positioned at the start of the trace.
    fn open(&self) -> Result<Self::Reader, TraceError>;

    /// Human-readable name for logs and errors.
    fn describe(&self) -> String;
}

/// A trace file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TraceSource for FileSource {
    type Reader = BufReader<File>;

    fn open(&self) -> Result<Self::Reader, TraceError> {
        let file = File::open(&self.path).map_err(|source| TraceError::Open {
            path: self.describe(),
            source,
        })?;
        Ok(BufReader::new(file))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// An in-memory trace, mostly useful for tests and synthetic runs.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

impl TraceSource for MemorySource {
    type Reader = Cursor<Vec<u8>>;

    fn open(&self) -> Result<Self::Reader, TraceError> {
        Ok(Cursor::new(self.data.clone()))
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Incremental, timestep-at-a-time reader over one trace source.
///
/// Not meant to be shared: each trace gets its own reader.
pub struct TraceReader<S: TraceSource = FileSource> {
    source: S,
    stream: Option<S::Reader>,
    /// Last timestep handed out by [`next_timestep`](Self::next_timestep).
    cursor: Option<u64>,
    eof: bool,
    header_read: bool,
    pending: Option<TraceRecord>,
    line: String,
}

impl TraceReader<FileSource> {
    /// Open a trace file. Failing to open it is fatal for the run.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TraceError> {
        Self::new(FileSource::new(path))
    }
}

impl TraceReader<MemorySource> {
    /// Build a reader over trace text held in memory.
    pub fn from_text(text: &str) -> Self {
        let data = text.as_bytes().to_vec();
        Self {
            stream: Some(Cursor::new(data.clone())),
            source: MemorySource::new("<memory>", data),
            cursor: None,
            eof: false,
            header_read: false,
            pending: None,
            line: String::new(),
        }
    }
}

impl<S: TraceSource> TraceReader<S> {
    pub fn new(source: S) -> Result<Self, TraceError> {
        let mut reader = Self {
            source,
            stream: None,
            cursor: None,
            eof: false,
            header_read: false,
            pending: None,
            line: String::new(),
        };
        reader.reset()?;
        Ok(reader)
    }

    /// Close and reopen the source, rewinding all cursor state.
    pub fn reset(&mut self) -> Result<(), TraceError> {
        debug!(trace = %self.source.describe(), "resetting trace reader");
        self.stream = None;
        self.cursor = None;
        self.eof = false;
        self.header_read = false;
        self.pending = None;
        self.stream = Some(self.source.open()?);
        Ok(())
    }

    /// Last timestep returned by [`next_timestep`](Self::next_timestep).
    pub fn current_timestep(&self) -> Option<u64> {
        self.cursor
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// The buffered record belonging to a future timestep, if any.
    pub fn pending(&self) -> Option<&TraceRecord> {
        self.pending.as_ref()
    }

    /// Assemble the cost vector for `target_ts`.
    ///
    /// Records for `target_ts` are applied, records for earlier timesteps are
    /// dropped with a warning, and the first record for a later timestep is
    /// kept as the pending record and ends the read. If the pending record
    /// from a previous call is still ahead of `target_ts`, nothing is read.
    pub fn read_timestep(&mut self, target_ts: u64) -> Result<ReadOutcome, TraceError> {
        if self.eof {
            return Ok(ReadOutcome::EndOfStream);
        }
        if !self.header_read {
            if !self.read_header()? {
                self.eof = true;
                return Ok(ReadOutcome::EndOfStream);
            }
            self.header_read = true;
        }

        let mut costs = TimestepCosts::new(target_ts);

        if let Some(record) = self.pending.take() {
            match record.sub_timestep.cmp(&target_ts) {
                Ordering::Equal => costs.apply(&record),
                Ordering::Less => warn!(
                    trace = %self.source.describe(),
                    sub_timestep = record.sub_timestep,
                    target_ts,
                    "skipped timestep data, dropping pending record"
                ),
                Ordering::Greater => {
                    self.pending = Some(record);
                    return Ok(ReadOutcome::Timestep(costs));
                }
            }
        }

        while let Some(record) = self.next_record()? {
            match record.sub_timestep.cmp(&target_ts) {
                Ordering::Equal => costs.apply(&record),
                Ordering::Less => warn!(
                    trace = %self.source.describe(),
                    sub_timestep = record.sub_timestep,
                    block_id = record.block_id,
                    target_ts,
                    "late record for a finished timestep, dropping"
                ),
                Ordering::Greater => {
                    self.pending = Some(record);
                    break;
                }
            }
        }

        debug!(
            trace = %self.source.describe(),
            timestep = target_ts,
            records = costs.records,
            nblocks = costs.nblocks(),
            "timestep read"
        );
        Ok(ReadOutcome::Timestep(costs))
    }

    /// Advance to the next timestep that has at least one record.
    ///
    /// Returns `None` at end of stream.
    pub fn next_timestep(&mut self) -> Result<Option<TimestepCosts>, TraceError> {
        loop {
            let mut ts = self.cursor.map_or(0, |c| c + 1);
            // Timesteps before the pending record cannot yield data.
            if let Some(pending) = &self.pending {
                ts = ts.max(pending.sub_timestep);
            }

            let outcome = self.read_timestep(ts)?;
            self.cursor = Some(ts);

            match outcome {
                ReadOutcome::EndOfStream => return Ok(None),
                ReadOutcome::Timestep(costs) if !costs.is_empty() => {
                    debug!(timestep = ts, records = costs.records, "next timestep");
                    return Ok(Some(costs));
                }
                ReadOutcome::Timestep(_) => continue,
            }
        }
    }

    /// Consume the header line. Returns `false` if the source is empty.
    fn read_header(&mut self) -> Result<bool, TraceError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TraceError::NotOpen(self.source.describe()))?;
        self.line.clear();
        if stream.read_line(&mut self.line)? == 0 {
            info!(trace = %self.source.describe(), "trace is empty");
            return Ok(false);
        }
        if !self.line.ends_with('\n') {
            return Err(TraceError::Header(self.source.describe()));
        }
        debug!(header = self.line.trim_end(), "trace header");
        Ok(true)
    }

    /// Next parsed record, or `None` at end of stream. A malformed line also
    /// ends the stream.
    fn next_record(&mut self) -> Result<Option<TraceRecord>, TraceError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TraceError::NotOpen(self.source.describe()))?;
        loop {
            self.line.clear();
            if stream.read_line(&mut self.line)? == 0 {
                self.eof = true;
                return Ok(None);
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match TraceRecord::parse(trimmed) {
                Some(record) if record.block_id > MAX_BLOCK_ID => {
                    return Err(TraceError::BlockIdOutOfRange {
                        trace: self.source.describe(),
                        block_id: record.block_id,
                        max: MAX_BLOCK_ID,
                    });
                }
                Some(record) => return Ok(Some(record)),
                None => {
                    warn!(
                        trace = %self.source.describe(),
                        line = trimmed,
                        "malformed trace record, treating as end of stream"
                    );
                    self.eof = true;
                    return Ok(None);
                }
            }
        }
    }
}

/// Write records in trace format, header first.
pub fn write_trace(records: &[TraceRecord], path: &Path) -> Result<(), TraceError> {
    let file = File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    writeln!(writer, "{}", TRACE_HEADER)?;
    for r in records {
        writeln!(
            writer,
            "{},{},{},{},{}",
            r.timestep, r.sub_timestep, r.origin_rank, r.block_id, r.duration_us
        )?;
    }
    writer.flush()?;
    Ok(())
}
