//! Incremental scanner for a single known_hosts file.
//!
//! Each [`FileScanner`] keeps one file handle open for the lifetime of the
//! registry and only ever reads forward:
//! - lookups first consult the keys already indexed
//! - on a miss, scanning resumes where the previous scan stopped
//! - every key seen on the way is indexed, and scanning stops at the first
//!   line that answers the query
//!
//! The handle is never rewound, so the total number of lines read over a
//! session is bounded by the file length. All lookups on one file are
//! serialized by a single lock.

mod index;

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use strict_hosts_format::{match_hashed, parse_line};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::expand_path;
use crate::key::HostKeyEntry;
use index::HostIndex;

/// Result type for scanner operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors from scanning a known_hosts file
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("known hosts file {} was already closed", path.display())]
    Closed { path: PathBuf },
}

/// Counters describing the work a scanner has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Times the file was opened (0 or 1 in a session).
    pub open_attempts: usize,
    /// Lines consumed from the file so far.
    pub lines_read: usize,
    /// Lookups that resumed reading the file.
    pub scans: usize,
    /// Lookups answered from the index without reading.
    pub cache_hits: usize,
}

type LineSource = Box<dyn BufRead + Send>;

enum Phase {
    Unopened,
    Open(LineSource),
    Closed,
}

struct ScanState {
    phase: Phase,
    index: HostIndex,
    stats: ScanStats,
    // Bytes of a line not yet terminated by '\n'. Survives a failed read and
    // EOF so the line is completed by the next scan, never restarted mid-way.
    pending: Vec<u8>,
}

/// Downward-only, caching reader for one known_hosts file.
pub struct FileScanner {
    path: PathBuf,
    state: Mutex<ScanState>,
}

impl FileScanner {
    /// Create a scanner for `path`. The file is not touched until the first lookup.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_phase(expand_path(path.as_ref()), Phase::Unopened)
    }

    fn with_phase(path: PathBuf, phase: Phase) -> Self {
        Self {
            path,
            state: Mutex::new(ScanState {
                phase,
                index: HostIndex::default(),
                stats: ScanStats::default(),
                pending: Vec::new(),
            }),
        }
    }

    /// Absolute path of the scanned file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the scan counters.
    pub fn stats(&self) -> ScanStats {
        self.state.lock().stats
    }

    /// Whether the file handle is currently open.
    pub fn is_open(&self) -> bool {
        matches!(self.state.lock().phase, Phase::Open(_))
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        matches!(self.state.lock().phase, Phase::Closed)
    }

    /// Number of distinct host patterns indexed so far.
    pub fn indexed_hosts(&self) -> usize {
        self.state.lock().index.len()
    }

    /// Keys recorded for any of `candidates` (aliases of one host).
    ///
    /// A missing or unreadable file yields no keys. Once a candidate is in
    /// the index its keys are returned without reading further, even if a
    /// later line would also match another candidate.
    pub fn keys_for(&self, candidates: &[&str]) -> ScanResult<Vec<Arc<HostKeyEntry>>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        match state.phase {
            Phase::Closed => {
                return Err(ScanError::Closed {
                    path: self.path.clone(),
                })
            }
            Phase::Unopened => match self.open(&mut state.stats) {
                Some(reader) => state.phase = Phase::Open(reader),
                None => return Ok(Vec::new()),
            },
            Phase::Open(_) => {}
        }

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(keys) = state.index.lookup(candidates) {
            state.stats.cache_hits += 1;
            debug!(
                path = %self.path.display(),
                host = candidates[0],
                keys = keys.len(),
                "known hosts cache hit"
            );
            return Ok(keys);
        }

        let Phase::Open(reader) = &mut state.phase else {
            return Ok(Vec::new());
        };

        // Resumes at the cursor left by the previous scan; reaching EOF earlier
        // does not stop lines appended since then from being read.
        state.stats.scans += 1;
        let stop = scan_forward(
            reader,
            &mut state.pending,
            &mut state.index,
            &mut state.stats,
            candidates,
        )
        .map_err(|source| ScanError::Io {
            path: self.path.clone(),
            source,
        })?;

        let literal = state.index.literal(candidates);
        let keys = match stop {
            ScanStop::Listed => literal,
            ScanStop::Hashed(token) => literal.or_else(|| state.index.get(&token)),
            ScanStop::Eof(tail) => literal.or(tail),
        }
        .unwrap_or_default();

        debug!(
            path = %self.path.display(),
            host = candidates[0],
            keys = keys.len(),
            lines_read = state.stats.lines_read,
            "known hosts scan finished"
        );
        Ok(keys)
    }

    /// Release the file handle and drop the index. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !matches!(state.phase, Phase::Closed) {
            debug!(path = %self.path.display(), "closing known hosts file");
        }
        state.phase = Phase::Closed;
        state.index.clear();
        state.pending = Vec::new();
    }

    fn open(&self, stats: &mut ScanStats) -> Option<LineSource> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => {}
            _ => {
                trace!(path = %self.path.display(), "known hosts file absent");
                return None;
            }
        }

        stats.open_attempts += 1;
        match File::open(&self.path) {
            Ok(file) => {
                debug!(path = %self.path.display(), "opened known hosts file");
                Some(Box::new(BufReader::new(file)))
            }
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "known hosts file unreadable");
                None
            }
        }
    }

    #[cfg(test)]
    fn from_reader(path: impl Into<PathBuf>, reader: impl BufRead + Send + 'static) -> Self {
        Self::with_phase(path.into(), Phase::Open(Box::new(reader)))
    }
}

impl std::fmt::Debug for FileScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileScanner")
            .field("path", &self.path)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Why [`scan_forward`] stopped reading.
enum ScanStop {
    /// A line listing every candidate was indexed.
    Listed,
    /// A sole hashed pattern matched a candidate.
    Hashed(String),
    /// End of file. Carries the keys of an unterminated last line that
    /// names a candidate.
    Eof(Option<Vec<Arc<HostKeyEntry>>>),
}

/// Read lines until one answers `candidates` or the file ends.
///
/// Only lines terminated by `\n` are indexed and counted. Bytes of an
/// incomplete line stay in `pending`, whether reading stopped at EOF or on
/// an error.
fn scan_forward(
    reader: &mut LineSource,
    pending: &mut Vec<u8>,
    index: &mut HostIndex,
    stats: &mut ScanStats,
    candidates: &[&str],
) -> io::Result<ScanStop> {
    loop {
        reader.read_until(b'\n', pending)?;
        if !pending.ends_with(b"\n") {
            return Ok(ScanStop::Eof(tail_keys(pending, candidates)));
        }
        stats.lines_read += 1;

        let stop = index_line(pending, index, stats.lines_read, candidates);
        pending.clear();
        if let Some(stop) = stop {
            return Ok(stop);
        }
    }
}

fn index_line(
    raw: &[u8],
    index: &mut HostIndex,
    line_no: usize,
    candidates: &[&str],
) -> Option<ScanStop> {
    let text = String::from_utf8_lossy(raw);
    let line = match parse_line(&text) {
        Ok(line) => line,
        Err(skip) => {
            trace!(line = line_no, %skip, "skipping known hosts line");
            return None;
        }
    };

    let entry = Arc::new(HostKeyEntry::new(line.key_type, line.key_data));
    if let Some(token) = line.hashed_token() {
        index.insert_hashed(token, entry);
        return match_hashed(&line.hosts, candidates).map(|t| ScanStop::Hashed(t.to_string()));
    }

    for host in &line.hosts {
        index.insert(host, Arc::clone(&entry));
    }
    line.lists_all(candidates).then_some(ScanStop::Listed)
}

/// Keys of an unterminated last line, if it names one of `candidates`.
///
/// The line is not indexed: its writer may still be appending to it.
fn tail_keys(raw: &[u8], candidates: &[&str]) -> Option<Vec<Arc<HostKeyEntry>>> {
    if raw.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(raw);
    let line = parse_line(&text).ok()?;
    let named = line
        .hosts
        .iter()
        .any(|host| candidates.iter().any(|c| c == host))
        || match_hashed(&line.hosts, candidates).is_some();
    named.then(|| vec![Arc::new(HostKeyEntry::new(line.key_type, line.key_data))])
}
