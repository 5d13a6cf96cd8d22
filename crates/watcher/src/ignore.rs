//! Ignore rules for the watched directory
//!
//! Sources, in order of precedence:
//! 1. Built-in reserved names (ledger file, ledger temp files, demuxer logs) - always active
//! 2. Names that cannot be stored in the ledger (separator or line break)
//! 3. `.demuxignore` in the watched directory (optional)
//! 4. Config-based patterns

use crate::{Result, WatchError};
use ::ignore::gitignore::{Gitignore, GitignoreBuilder};
use ledger::key::is_representable_name;
use std::path::{Path, PathBuf};

/// Suffix the demuxer uses for its own log files
pub const TOOL_LOG_SUFFIX: &str = " - Log.txt";

/// Operator ignore file inside the watched directory
pub const IGNORE_FILE: &str = ".demuxignore";

/// Why an entry is never scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The ledger backing store itself
    LedgerFile,
    /// A temporary file left by an interrupted ledger write
    LedgerTemp,
    /// A log written by the demuxer
    ToolLog,
    /// Operating system metadata or the ignore file
    SystemFile,
    /// Name cannot be written to the ledger
    Unrepresentable,
    /// Matched an operator pattern
    Pattern,
}

/// Ignore rule manager
pub struct IgnoreRules {
    /// Watched directory
    watch_dir: PathBuf,

    /// Ledger backing store filename
    ledger_file: String,

    /// Patterns from `.demuxignore`
    ignore_file: Option<Gitignore>,

    /// Patterns from configuration
    patterns: Option<Gitignore>,
}

impl IgnoreRules {
    /// Build rules for a watched directory
    pub fn load(watch_dir: &Path, ledger_file: &str, patterns: &[String]) -> Result<Self> {
        let patterns = if patterns.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new(watch_dir);
            for pattern in patterns {
                builder
                    .add_line(None, pattern)
                    .map_err(|source| WatchError::Pattern {
                        pattern: pattern.clone(),
                        source,
                    })?;
            }
            Some(builder.build().map_err(|source| WatchError::Pattern {
                pattern: patterns.join(", "),
                source,
            })?)
        };

        let mut rules = Self {
            watch_dir: watch_dir.to_path_buf(),
            ledger_file: ledger_file.to_string(),
            ignore_file: None,
            patterns,
        };

        rules.reload_ignore_file()?;
        Ok(rules)
    }

    /// Re-read `.demuxignore` so operator edits take effect on the next pass
    pub fn reload_ignore_file(&mut self) -> Result<()> {
        let path = self.watch_dir.join(IGNORE_FILE);
        if !path.is_file() {
            self.ignore_file = None;
            return Ok(());
        }

        let mut builder = GitignoreBuilder::new(&self.watch_dir);
        if let Some(source) = builder.add(&path) {
            return Err(WatchError::IgnoreFile { path, source });
        }
        self.ignore_file = Some(
            builder
                .build()
                .map_err(|source| WatchError::IgnoreFile { path, source })?,
        );
        Ok(())
    }

    /// Why a top-level entry of the watched directory must be skipped, if it must
    pub fn ignore_reason(&self, name: &str, is_dir: bool) -> Option<IgnoreReason> {
        if let Some(reason) = self.builtin_reason(name, is_dir) {
            return Some(reason);
        }

        if !is_representable_name(name) {
            return Some(IgnoreReason::Unrepresentable);
        }

        let path = Path::new(name);
        for rules in [&self.ignore_file, &self.patterns].into_iter().flatten() {
            if rules.matched(path, is_dir).is_ignore() {
                return Some(IgnoreReason::Pattern);
            }
        }

        None
    }

    /// Check if an entry should be skipped
    pub fn should_ignore(&self, name: &str, is_dir: bool) -> bool {
        self.ignore_reason(name, is_dir).is_some()
    }

    fn builtin_reason(&self, name: &str, is_dir: bool) -> Option<IgnoreReason> {
        if !is_dir && name == self.ledger_file {
            return Some(IgnoreReason::LedgerFile);
        }

        if name.starts_with(ledger::TEMP_PREFIX) {
            return Some(IgnoreReason::LedgerTemp);
        }

        if name.ends_with(TOOL_LOG_SUFFIX) {
            return Some(IgnoreReason::ToolLog);
        }

        // MacOS/Windows metadata
        if name == IGNORE_FILE
            || name == ".DS_Store"
            || name.starts_with("._")
            || name == "Thumbs.db"
            || name == "desktop.ini"
        {
            return Some(IgnoreReason::SystemFile);
        }

        None
    }
}
