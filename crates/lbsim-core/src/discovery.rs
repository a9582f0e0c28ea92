//! Locating trace files in a profile directory.

use crate::trace::TraceError;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name patterns, in order of preference. The first pattern that
/// matches anything wins; later patterns are not consulted.
pub const TRACE_FILE_PATTERNS: [&str; 3] = [
    r"prof\.merged\.evt\d+\.csv",
    r"prof\.merged\.evt\d+\.mini\.csv",
    r"prof\.aggr\.evt\d+\.csv",
];

/// Names in `names` matching `pattern` in full.
pub fn filter_by_pattern(names: &[String], pattern: &str) -> Result<Vec<String>, TraceError> {
    let regex = Regex::new(&format!("^(?:{})$", pattern))?;
    Ok(names.iter().filter(|n| regex.is_match(n)).cloned().collect())
}

/// Find the trace files of one run under `dir`, sorted by name.
pub fn discover_trace_files(dir: &Path) -> Result<Vec<PathBuf>, TraceError> {
    info!(dir = %dir.display(), "looking for trace files");

    let entries = std::fs::read_dir(dir).map_err(|source| TraceError::Open {
        path: dir.display().to_string(),
        source,
    })?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    for pattern in TRACE_FILE_PATTERNS {
        debug!(pattern, "searching by pattern");
        let matches = filter_by_pattern(&names, pattern)?;
        if matches.is_empty() {
            continue;
        }
        let paths: Vec<PathBuf> = matches.iter().map(|name| dir.join(name)).collect();
        for path in &paths {
            info!(path = %path.display(), "adding trace file");
        }
        return Ok(paths);
    }

    Err(TraceError::NoTraceFiles(dir.display().to_string()))
}
