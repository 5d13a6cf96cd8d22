//! Watched-directory enumeration for demuxd
//!
//! This crate provides:
//! - Reserved-name filtering (ledger file, ledger temp files, demuxer logs)
//! - Operator ignore patterns (`.demuxignore` and config-based patterns)
//! - One-level listing of the watched directory into scan candidates

pub mod ignore;
pub mod listing;

pub use crate::ignore::{IgnoreReason, IgnoreRules};
pub use listing::{list_entries, Entry, EntryKind, Listing};

use std::path::PathBuf;

/// Errors building ignore rules or listing the watched directory
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to list {}: {source}", path.display())]
    List {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid ignore pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: ::ignore::Error,
    },

    #[error("failed to read ignore file {}: {source}", path.display())]
    IgnoreFile {
        path: PathBuf,
        #[source]
        source: ::ignore::Error,
    },
}

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;
