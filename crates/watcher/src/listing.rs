//! One-level listing of the watched directory
//!
//! Only direct children are candidates: a flat container file or a disc
//! directory. Nothing below the top level is visited.

use crate::ignore::{IgnoreReason, IgnoreRules};
use crate::{Result, WatchError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Kind of scan candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Flat container file
    File,
    /// Possible disc structure
    Directory,
}

/// A direct child of the watched directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Absolute path
    pub path: PathBuf,
    /// Filename, used as the ledger key
    pub name: String,
    /// File or directory
    pub kind: EntryKind,
}

/// Result of listing the watched directory
#[derive(Debug, Default)]
pub struct Listing {
    /// Candidates in filename order
    pub entries: Vec<Entry>,
    /// Entries skipped by the ignore rules
    pub ignored: Vec<(String, IgnoreReason)>,
}

/// List scan candidates in `watch_dir`.
///
/// Fails only if the directory itself cannot be read; unreadable children
/// and non-UTF-8 names are logged and skipped.
pub fn list_entries(watch_dir: &Path, rules: &IgnoreRules) -> Result<Listing> {
    let mut listing = Listing::default();

    let walker = WalkDir::new(watch_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(WatchError::List {
                    path: watch_dir.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                warn!("skipping unreadable entry in watched directory: {}", e);
                continue;
            }
        };

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!(path = %entry.path().display(), "skipping entry with non-UTF-8 name");
            continue;
        };

        let is_dir = entry.file_type().is_dir();
        if let Some(reason) = rules.ignore_reason(&name, is_dir) {
            debug!(entry = %name, ?reason, "ignoring entry");
            listing.ignored.push((name, reason));
            continue;
        }

        listing.entries.push(Entry {
            path: entry.into_path(),
            name,
            kind: if is_dir {
                EntryKind::Directory
            } else {
                EntryKind::File
            },
        });
    }

    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_lists_top_level_only() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("b.mkv"), b"").unwrap();
        fs::write(root.join("a.mkv"), b"").unwrap();
        fs::create_dir_all(root.join("DISC1/BDMV/STREAM")).unwrap();
        fs::write(root.join("DISC1/BDMV/STREAM/00001.m2ts"), b"").unwrap();

        let rules = IgnoreRules::load(root, "scanRecord.txt", &[]).unwrap();
        let listing = list_entries(root, &rules).unwrap();

        let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["DISC1", "a.mkv", "b.mkv"]);
        assert_eq!(listing.entries[0].kind, EntryKind::Directory);
        assert_eq!(listing.entries[1].kind, EntryKind::File);
        assert_eq!(listing.entries[1].path, root.join("a.mkv"));
    }

    #[test]
    fn test_reserved_entries_are_reported_not_listed() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("scanRecord.txt"), b"").unwrap();
        fs::write(root.join("movie_tr1 - Log.txt"), b"").unwrap();
        fs::write(root.join("movie.mkv"), b"").unwrap();

        let rules = IgnoreRules::load(root, "scanRecord.txt", &[]).unwrap();
        let listing = list_entries(root, &rules).unwrap();

        assert_eq!(listing.entries.len(), 1);
        assert_eq!(listing.entries[0].name, "movie.mkv");
        assert_eq!(listing.ignored.len(), 2);
        assert!(listing
            .ignored
            .iter()
            .any(|(name, reason)| name == "scanRecord.txt" && *reason == IgnoreReason::LedgerFile));
    }

    #[test]
    fn test_missing_directory_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone");

        let rules = IgnoreRules::load(temp_dir.path(), "scanRecord.txt", &[]).unwrap();
        let err = list_entries(&missing, &rules).unwrap_err();
        assert!(matches!(err, WatchError::List { .. }));
    }
}
