//! Deterministic scanner that never runs an external process
//!
//! Selected with `scanner = "mock"`. Every directory reports titles 1-3 and
//! every `.mkv` file demuxes into a fixed set of track names. Nothing is
//! written to disk.

use crate::{MediaScanner, ScanFailure, ScanResult};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;

/// Fixture scanner returning static results
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureScanner;

impl FixtureScanner {
    pub fn new() -> Self {
        Self
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl MediaScanner for FixtureScanner {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn list_titles(&self, _dir: &Path) -> ScanResult<BTreeSet<u32>> {
        Ok([1, 2, 3].into_iter().collect())
    }

    async fn demux_title(
        &self,
        dir: &Path,
        title: u32,
        _languages: &[String],
    ) -> ScanResult<BTreeSet<String>> {
        let base = format!("{}_ti{}", file_name(dir), title);
        Ok([
            "_tr1_Undetermined.txt",
            "_tr2_Undetermined.mkv",
            "_tr3_English.dts",
            "_tr4_English.sup",
        ]
        .iter()
        .map(|suffix| format!("{base}{suffix}"))
        .collect())
    }

    async fn demux_file(&self, file: &Path, _languages: &[String]) -> ScanResult<BTreeSet<String>> {
        let name = file_name(file);
        let Some(stem) = name.strip_suffix(".mkv") else {
            return Err(ScanFailure::UnreadableContainer {
                output: format!("{name} is not a matroska container"),
            });
        };

        Ok(["_tr1_Undetermined.mkv", "_tr2_English.dts", "_tr3_English.sup"]
            .iter()
            .map(|suffix| format!("{stem}{suffix}"))
            .collect())
    }
}
