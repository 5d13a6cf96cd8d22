//! Media scanner capability for demuxd
//!
//! This crate provides:
//! - The `MediaScanner` trait: enumerate disc titles, demux a title, demux a flat file
//! - `ScanFailure`, the tagged outcome returned instead of a success value
//! - `ToolScanner`, which drives an external demuxer adapter process
//! - `FixtureScanner`, a deterministic stand-in used for testing (`scanner = "mock"`)

pub mod failure;
pub mod fixture;
pub mod tool;

pub use failure::{ScanFailure, Severity};
pub use fixture::FixtureScanner;
pub use tool::ToolScanner;

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;

/// Result type for scanner operations
pub type ScanResult<T> = std::result::Result<T, ScanFailure>;

/// Configuration value that selects the fixture scanner
pub const FIXTURE_SENTINEL: &str = "mock";

/// Splits containers into elementary streams.
///
/// Every operation runs to completion before returning; callers invoke them
/// one at a time. Generated filenames are relative to the watched directory.
#[async_trait]
pub trait MediaScanner: Send + Sync {
    /// Human-readable name identifying this scanner implementation
    fn name(&self) -> &'static str;

    /// List the title numbers of a disc directory
    async fn list_titles(&self, dir: &Path) -> ScanResult<BTreeSet<u32>>;

    /// Demux one disc title, keeping tracks in the requested languages
    async fn demux_title(
        &self,
        dir: &Path,
        title: u32,
        languages: &[String],
    ) -> ScanResult<BTreeSet<String>>;

    /// Demux a flat container file, keeping tracks in the requested languages
    async fn demux_file(&self, file: &Path, languages: &[String]) -> ScanResult<BTreeSet<String>>;
}

/// Build the scanner selected by a configuration value.
///
/// `base_args` go before the operation name on every adapter invocation and
/// are ignored by the fixture scanner.
pub fn from_target(
    target: &str,
    base_args: &[String],
    working_dir: &Path,
) -> Box<dyn MediaScanner> {
    if target == FIXTURE_SENTINEL {
        Box::new(FixtureScanner::new())
    } else {
        let scanner = ToolScanner::new(target, working_dir);
        Box::new(scanner.with_base_args(base_args.iter().cloned()))
    }
}
