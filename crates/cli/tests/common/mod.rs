//! Common utilities for integration tests

use async_trait::async_trait;
use cli_lib::{DaemonConfig, ExtensionRegistry, ScanLoop};
use ledger::Ledger;
use parking_lot::Mutex;
use scanner::{MediaScanner, ScanFailure, ScanResult};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Watched directory in a temp dir, removed on drop
pub struct TestWatchDir {
    pub dir: TempDir,
}

impl TestWatchDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn add_file(&self, name: &str) {
        std::fs::write(self.path().join(name), b"").unwrap();
    }

    pub fn add_disc(&self, name: &str) {
        std::fs::create_dir_all(self.path().join(name).join("BDMV")).unwrap();
    }

    pub fn config(&self, max_retries: u32) -> DaemonConfig {
        DaemonConfig {
            watch_dir: self.path().to_path_buf(),
            scanner: "mock".to_string(),
            scanner_args: Vec::new(),
            max_retries,
            languages: vec!["eng".to_string(), "jpn".to_string()],
            sleep_interval: Duration::from_secs(60),
            record_file: "scanRecord.txt".to_string(),
            ignore: Vec::new(),
        }
    }

    pub fn ledger_path(&self) -> std::path::PathBuf {
        self.path().join("scanRecord.txt")
    }

    pub fn ledger_text(&self) -> String {
        std::fs::read_to_string(self.ledger_path()).unwrap()
    }

    /// Fresh ledger instance read from disk
    pub fn reopen_ledger(&self, max_retries: u32) -> Ledger {
        Ledger::open(self.ledger_path(), max_retries).unwrap()
    }

    pub fn scan_loop(
        &self,
        max_retries: u32,
        scanner: Box<dyn MediaScanner>,
        extensions: ExtensionRegistry,
    ) -> ScanLoop {
        let config = self.config(max_retries);
        let ledger = Ledger::open(config.ledger_path(), config.max_retries).unwrap();
        ScanLoop::new(&config, ledger, scanner, extensions).unwrap()
    }
}

/// Canned outcome for one scanner call
#[derive(Clone)]
pub enum Scripted {
    Titles(Vec<u32>),
    Generated(Vec<&'static str>),
    Corrupt,
    NotADisc,
    ToolError,
}

/// Scanner returning scripted outcomes and recording every call.
///
/// Keys are the entry filename for `list_titles`/`demux_file`, and
/// `"<dir>#<title>"` for `demux_title`. Unscripted calls fail with a tool
/// error.
#[derive(Clone, Default)]
pub struct ScriptedScanner {
    script: Arc<Mutex<BTreeMap<String, Scripted>>>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, key: &str, outcome: Scripted) -> &Self {
        self.script.lock().insert(key.to_string(), outcome);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn boxed(&self) -> Box<dyn MediaScanner> {
        Box::new(self.clone())
    }

    fn outcome(&self, call: String) -> Scripted {
        self.calls.lock().push(call.clone());
        self.script
            .lock()
            .get(&call)
            .cloned()
            .unwrap_or(Scripted::ToolError)
    }
}

fn name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

fn failure(outcome: Scripted) -> ScanFailure {
    match outcome {
        Scripted::Corrupt => ScanFailure::CorruptStructure {
            output: "bad structure".to_string(),
        },
        Scripted::NotADisc => ScanFailure::NotADisc {
            output: "no BDMV".to_string(),
        },
        _ => ScanFailure::Tool {
            arguments: vec!["scripted".to_string()],
            status: Some(1),
            output: "tool exploded".to_string(),
        },
    }
}

#[async_trait]
impl MediaScanner for ScriptedScanner {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn list_titles(&self, dir: &Path) -> ScanResult<BTreeSet<u32>> {
        match self.outcome(name(dir)) {
            Scripted::Titles(titles) => Ok(titles.into_iter().collect()),
            other => Err(failure(other)),
        }
    }

    async fn demux_title(
        &self,
        dir: &Path,
        title: u32,
        _languages: &[String],
    ) -> ScanResult<BTreeSet<String>> {
        match self.outcome(format!("{}#{}", name(dir), title)) {
            Scripted::Generated(names) => Ok(names.into_iter().map(String::from).collect()),
            other => Err(failure(other)),
        }
    }

    async fn demux_file(&self, file: &Path, _languages: &[String]) -> ScanResult<BTreeSet<String>> {
        match self.outcome(name(file)) {
            Scripted::Generated(names) => Ok(names.into_iter().map(String::from).collect()),
            other => Err(failure(other)),
        }
    }
}
