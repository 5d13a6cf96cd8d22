//! The scan ledger: ordered in-memory map bound to a line-oriented backing store

use crate::line::{format_line, parse_line};
use crate::store::atomic_write;
use crate::{Attempts, LedgerError, Result, ScanKey};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Persistent record of scan outcomes and retry counts
///
/// Mutations only touch memory; `persist` rewrites the whole backing store.
/// A single process is assumed to own the backing store.
#[derive(Debug)]
pub struct Ledger {
    /// Backing store path
    path: PathBuf,
    /// Failures allowed before a key is abandoned
    max_retries: u32,
    /// Ordered so the persisted file is deterministic
    entries: BTreeMap<ScanKey, Attempts>,
    /// Set by any mutation since the last load or persist
    dirty: bool,
}

/// Outcome of a reload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadStats {
    /// Entries now held in memory
    pub entries: usize,
    /// Non-blank lines that could not be parsed
    pub skipped: usize,
}

/// Entry counts per state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub succeeded: usize,
    pub abandoned: usize,
    pub retrying: usize,
}

impl Ledger {
    /// Create an empty ledger bound to `path` without reading it.
    ///
    /// `max_retries` below 1 is treated as 1.
    pub fn new(path: impl Into<PathBuf>, max_retries: u32) -> Self {
        Self {
            path: path.into(),
            max_retries: max_retries.max(1),
            entries: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Create a ledger and load its backing store
    pub fn open(path: impl Into<PathBuf>, max_retries: u32) -> Result<Self> {
        let mut ledger = Self::new(path, max_retries);
        ledger.reload()?;
        Ok(ledger)
    }

    /// Discard in-memory state and re-parse the backing store.
    ///
    /// A missing store is an empty ledger. Malformed lines are skipped; a store
    /// whose non-blank lines are all malformed is an error. On error the
    /// in-memory state is left as it was.
    pub fn reload(&mut self) -> Result<ReloadStats> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "ledger file absent; starting empty");
                self.entries.clear();
                self.dirty = false;
                return Ok(ReloadStats::default());
            }
            Err(e) => return Err(LedgerError::io(&self.path, e)),
        };

        // Tolerate bytes mangled by a crash mid-write
        let contents = String::from_utf8_lossy(&bytes);

        let mut entries = BTreeMap::new();
        let mut lines = 0;
        let mut skipped = 0;

        for (index, raw) in contents.lines().enumerate() {
            // Names may carry leading or trailing spaces; only strip the terminator
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.trim().is_empty() {
                continue;
            }
            lines += 1;

            match parse_line(line) {
                Ok((key, attempts)) => {
                    entries.insert(key, attempts);
                }
                Err(e) => {
                    skipped += 1;
                    debug!(line = index + 1, error = %e, "skipping malformed ledger line");
                }
            }
        }

        if lines > 0 && entries.is_empty() {
            return Err(LedgerError::Unparseable {
                path: self.path.clone(),
                lines,
            });
        }

        self.entries = entries;
        self.dirty = false;

        Ok(ReloadStats {
            entries: self.entries.len(),
            skipped,
        })
    }

    /// True if the key was demuxed successfully
    pub fn contains_success(&self, key: &ScanKey) -> bool {
        matches!(self.entries.get(key), Some(Attempts::Success))
    }

    /// True if the key failed the max number of times
    pub fn contains_abandoned(&self, key: &ScanKey) -> bool {
        matches!(self.entries.get(key), Some(Attempts::Abandoned))
    }

    /// Raw lookup; `None` means never attempted
    pub fn attempts(&self, key: &ScanKey) -> Option<Attempts> {
        self.entries.get(key).copied()
    }

    /// Mark a key as successfully demuxed, overwriting any previous value
    pub fn record_success(&mut self, key: ScanKey) {
        self.entries.insert(key, Attempts::Success);
        self.dirty = true;
    }

    /// Count one failed attempt and return the new state.
    ///
    /// Reaching `max_retries` failures stores `Abandoned`. Every call counts,
    /// so callers must call this exactly once per failed attempt. Terminal
    /// entries are left untouched.
    pub fn record_failure(&mut self, key: ScanKey) -> Attempts {
        let prev = match self.entries.get(&key).copied() {
            Some(state) if state.is_terminal() => {
                debug!(unit = %key, state = ?state, "ignoring failure for terminal entry");
                return state;
            }
            Some(Attempts::Retrying(n)) => n,
            _ => 0,
        };

        let count = prev.saturating_add(1);
        let next = if count >= self.max_retries {
            Attempts::Abandoned
        } else {
            Attempts::Retrying(count)
        };

        self.entries.insert(key, next);
        self.dirty = true;
        next
    }

    /// Drop an entry so the unit becomes eligible again
    pub fn remove(&mut self, key: &ScanKey) -> Option<Attempts> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Rewrite the whole backing store from memory
    pub fn persist(&mut self) -> Result<()> {
        let mut contents = String::new();
        for (key, attempts) in &self.entries {
            if !key.is_representable() {
                warn!(
                    unit = ?key.name(),
                    "cannot store ledger entry with separator or line break in name"
                );
                continue;
            }
            contents.push_str(&format_line(key, *attempts));
        }

        atomic_write(&self.path, contents.as_bytes())
            .map_err(|e| LedgerError::io(&self.path, e))?;

        self.dirty = false;
        debug!(path = %self.path.display(), entries = self.entries.len(), "ledger persisted");
        Ok(())
    }

    /// Iterate entries in key order
    pub fn entries(&self) -> impl Iterator<Item = (&ScanKey, Attempts)> {
        self.entries.iter().map(|(key, attempts)| (key, *attempts))
    }

    /// Count entries per state
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for attempts in self.entries.values() {
            match attempts {
                Attempts::Success => summary.succeeded += 1,
                Attempts::Abandoned => summary.abandoned += 1,
                Attempts::Retrying(_) => summary.retrying += 1,
            }
        }
        summary
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the ledger holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if there are mutations not yet persisted
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Backing store path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Failures allowed before abandonment
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
