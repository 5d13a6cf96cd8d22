//! The scan loop
//!
//! One flow of control polls the watched directory, demuxes every unit the
//! ledger does not exempt, records the outcome, runs extension hooks, and
//! sleeps. External tool invocations are strictly serial.

use crate::extension::ExtensionRegistry;
use crate::system_config::DaemonConfig;
use anyhow::{Context, Result};
use ledger::key::is_representable_name;
use ledger::{exemption, Attempts, Exemption, Ledger, ScanKey};
use scanner::{MediaScanner, ScanFailure, Severity};
use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use watcher::{list_entries, Entry, EntryKind, IgnoreReason, IgnoreRules};

/// How a pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassOutcome {
    /// Every entry was considered
    #[default]
    Completed,
    /// The ledger could not be reloaded; nothing was scanned
    LedgerUnavailable,
    /// The watched directory could not be listed; nothing was scanned
    ListingFailed,
}

/// Counters for one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub outcome: PassOutcome,
    /// Units demuxed successfully
    pub succeeded: usize,
    /// Units that failed, including title enumeration failures
    pub failed: usize,
    /// Units that crossed the retry limit this pass
    pub abandoned: usize,
    /// Units skipped because the ledger exempts them
    pub skipped: usize,
    /// Filenames added through the extension ledger handle
    pub extension_records: usize,
    /// After-scan hooks that returned an error
    pub hook_failures: usize,
    /// Whether the ledger was written at the end of the pass
    pub persisted: bool,
}

impl PassReport {
    /// Units actually handed to the scanner
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Skip messages held back until the pass does real work; an idle pass
/// logs them at debug level only.
#[derive(Debug, Default)]
struct TentativeLog {
    pending: Vec<String>,
}

impl TentativeLog {
    fn push(&mut self, message: String) {
        self.pending.push(message);
    }

    fn flush(&mut self) {
        for message in self.pending.drain(..) {
            info!("{}", message);
        }
    }

    fn discard(&mut self) {
        for message in self.pending.drain(..) {
            debug!("{}", message);
        }
    }
}

/// Long-running scan loop state
pub struct ScanLoop {
    watch_dir: PathBuf,
    languages: Vec<String>,
    sleep_interval: Duration,
    ledger: Ledger,
    scanner: Box<dyn MediaScanner>,
    rules: IgnoreRules,
    extensions: ExtensionRegistry,
}

impl ScanLoop {
    /// Assemble the loop from validated configuration and a loaded ledger
    pub fn new(
        config: &DaemonConfig,
        ledger: Ledger,
        scanner: Box<dyn MediaScanner>,
        extensions: ExtensionRegistry,
    ) -> Result<Self> {
        let rules = IgnoreRules::load(&config.watch_dir, &config.record_file, &config.ignore)
            .context("Failed to load ignore rules")?;

        Ok(Self {
            watch_dir: config.watch_dir.clone(),
            languages: config.languages.clone(),
            sleep_interval: config.sleep_interval,
            ledger,
            scanner,
            rules,
            extensions,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Run passes until `shutdown` completes.
    ///
    /// Shutdown is observed between passes; a pass in progress always
    /// finishes and persists first. Returns the number of passes run.
    pub async fn run<F>(mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut passes = 0;

        info!(
            watch_dir = %self.watch_dir.display(),
            scanner = self.scanner.name(),
            languages = ?self.languages,
            max_retries = self.ledger.max_retries(),
            extensions = ?self.extensions.names(),
            "daemon started"
        );

        loop {
            let report = self.run_pass().await;
            passes += 1;

            if report.attempted() > 0 {
                info!(
                    succeeded = report.succeeded,
                    failed = report.failed,
                    abandoned = report.abandoned,
                    skipped = report.skipped,
                    "finished scanning"
                );
            }
            debug!(
                minutes = self.sleep_interval.as_secs() / 60,
                "sleeping until next pass"
            );

            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!(passes, "shutdown requested, stopping");
                    break;
                }

                _ = tokio::time::sleep(self.sleep_interval) => {}
            }
        }

        passes
    }

    /// One polling pass over the watched directory
    pub async fn run_pass(&mut self) -> PassReport {
        let mut report = PassReport::default();

        // 1. Reload so operator edits and extension additions are seen
        match self.ledger.reload() {
            Ok(stats) if stats.skipped > 0 => {
                warn!(
                    path = %self.ledger.path().display(),
                    skipped = stats.skipped,
                    "skipped malformed ledger lines"
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!("failed to reload ledger, skipping pass: {}", e);
                report.outcome = PassOutcome::LedgerUnavailable;
                return report;
            }
        }
        report.extension_records += self.apply_extension_records();

        if let Err(e) = self.rules.reload_ignore_file() {
            warn!("keeping previous ignore rules: {}", e);
        }

        // 2. Enumerate candidates
        let listing = match list_entries(&self.watch_dir, &self.rules) {
            Ok(listing) => listing,
            Err(e) => {
                error!("skipping pass: {}", e);
                report.outcome = PassOutcome::ListingFailed;
                return report;
            }
        };

        for (name, reason) in &listing.ignored {
            if *reason == IgnoreReason::Unrepresentable {
                warn!(
                    unit = ?name,
                    "cannot track a name containing '|' or a line break, skipping"
                );
            }
        }

        // 3-6. Scan each entry the ledger does not exempt
        let mut tentative = TentativeLog::default();
        for entry in &listing.entries {
            let key = ScanKey::whole(&entry.name);
            if let Some(reason) = exemption(&self.ledger, &key) {
                tentative.push(skip_message(&key, reason));
                report.skipped += 1;
                continue;
            }

            let generated = match entry.kind {
                EntryKind::Directory => self.scan_disc(entry, &mut report, &mut tentative).await,
                EntryKind::File => self.scan_file(entry, &mut report, &mut tentative).await,
            };

            // Hooks only see entries that actually produced files
            if let Some(generated) = generated.filter(|names| !names.is_empty()) {
                let paths: Vec<PathBuf> = generated
                    .iter()
                    .map(|name| self.watch_dir.join(name))
                    .collect();
                report.hook_failures += self.extensions.after_scan(&entry.path, &paths).await;
                report.extension_records += self.apply_extension_records();
            }
        }

        if report.attempted() == 0 {
            tentative.discard();
        }

        // 7. Persist only when the ledger changed
        if self.ledger.is_dirty() {
            match self.ledger.persist() {
                Ok(()) => report.persisted = true,
                Err(e) => error!("failed to persist ledger: {}", e),
            }
        }

        report
    }

    /// Enumerate and demux the titles of a disc directory.
    ///
    /// Returns the generated filenames if at least one title succeeded.
    async fn scan_disc(
        &mut self,
        entry: &Entry,
        report: &mut PassReport,
        tentative: &mut TentativeLog,
    ) -> Option<BTreeSet<String>> {
        let titles = match self.scanner.list_titles(&entry.path).await {
            Ok(titles) => titles,
            Err(failure) => {
                tentative.flush();
                self.record_failure(ScanKey::whole(&entry.name), &failure, report);
                return None;
            }
        };

        if titles.is_empty() {
            tentative.push(format!("no titles found in {}", entry.name));
            return None;
        }
        tentative.push(format!("found titles {:?} in {}", titles, entry.name));

        let mut generated = BTreeSet::new();
        let mut any_success = false;

        for title in titles {
            let key = ScanKey::disc_title(&entry.name, title);
            if let Some(reason) = exemption(&self.ledger, &key) {
                tentative.push(skip_message(&key, reason));
                report.skipped += 1;
                continue;
            }

            tentative.flush();
            info!(unit = %entry.name, title, "demuxing title");

            match self
                .scanner
                .demux_title(&entry.path, title, &self.languages)
                .await
            {
                Ok(names) => {
                    self.record_success(key, &names, report);
                    generated.extend(names);
                    any_success = true;
                }
                Err(failure) => self.record_failure(key, &failure, report),
            }
        }

        any_success.then_some(generated)
    }

    /// Demux a flat container file
    async fn scan_file(
        &mut self,
        entry: &Entry,
        report: &mut PassReport,
        tentative: &mut TentativeLog,
    ) -> Option<BTreeSet<String>> {
        let key = ScanKey::whole(&entry.name);

        tentative.flush();
        info!(unit = %entry.name, "demuxing file");

        match self.scanner.demux_file(&entry.path, &self.languages).await {
            Ok(names) => {
                self.record_success(key, &names, report);
                Some(names)
            }
            Err(failure) => {
                self.record_failure(key, &failure, report);
                None
            }
        }
    }

    /// Mark the unit and everything it generated as handled
    fn record_success(
        &mut self,
        key: ScanKey,
        generated: &BTreeSet<String>,
        report: &mut PassReport,
    ) {
        info!(
            unit = key.name(),
            title = ?key.title(),
            generated = generated.len(),
            "demux succeeded"
        );
        for name in generated {
            debug!(unit = key.name(), artifact = %name, "recording generated file");
            self.record_handled(name);
        }
        self.ledger.record_success(key);
        report.succeeded += 1;
    }

    fn record_failure(&mut self, key: ScanKey, failure: &ScanFailure, report: &mut PassReport) {
        match failure.severity() {
            Severity::StructuralMismatch => {
                warn!(unit = key.name(), title = ?key.title(), "scan failed: {}", failure);
            }
            Severity::ToolFailure | Severity::IoFailure => {
                error!(
                    unit = key.name(),
                    title = ?key.title(),
                    arguments = ?failure.arguments(),
                    "scan failed: {}",
                    failure
                );
            }
        }
        report.failed += 1;

        match self.ledger.record_failure(key.clone()) {
            Attempts::Abandoned => {
                report.abandoned += 1;
                error!(
                    unit = key.name(),
                    title = ?key.title(),
                    max_retries = self.ledger.max_retries(),
                    "failed the maximum number of times, abandoning"
                );
            }
            Attempts::Retrying(attempts) => {
                info!(
                    unit = key.name(),
                    title = ?key.title(),
                    attempts,
                    max_retries = self.ledger.max_retries(),
                    "will retry on a later pass"
                );
            }
            Attempts::Success => {}
        }
    }

    /// Record a filename in the watched directory as already handled
    fn record_handled(&mut self, name: &str) -> bool {
        if !is_representable_name(name) {
            warn!(unit = ?name, "cannot track a name containing '|' or a line break");
            return false;
        }
        self.ledger.record_success(ScanKey::whole(name));
        true
    }

    /// Apply filenames queued by extensions
    fn apply_extension_records(&mut self) -> usize {
        let names = self.extensions.handle().drain();
        let mut applied = 0;
        for name in names {
            if self.record_handled(&name) {
                debug!(unit = %name, "extension marked file as handled");
                applied += 1;
            }
        }
        applied
    }

}

fn skip_message(key: &ScanKey, reason: Exemption) -> String {
    match reason {
        Exemption::Succeeded => format!("skipping {}: already demuxed", key),
        Exemption::Abandoned => format!("skipping {}: abandoned after repeated failures", key),
    }
}

/// Completes on SIGINT or SIGTERM.
///
/// Handlers are installed immediately so a signal that arrives during a pass
/// is not lost; it stops the loop at the next sleep.
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt =
            signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        Ok(async move {
            tokio::select! {
                _ = interrupt.recv() => {}
                _ = terminate.recv() => {}
            }
        })
    }

    #[cfg(not(unix))]
    {
        Ok(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanner::FixtureScanner;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config(dir: &Path) -> DaemonConfig {
        DaemonConfig {
            watch_dir: dir.to_path_buf(),
            scanner: "mock".to_string(),
            scanner_args: Vec::new(),
            max_retries: 3,
            languages: vec!["eng".to_string()],
            sleep_interval: Duration::from_secs(600),
            record_file: "scanRecord.txt".to_string(),
            ignore: Vec::new(),
        }
    }

    fn scan_loop(dir: &Path) -> ScanLoop {
        let config = config(dir);
        let ledger = Ledger::open(config.ledger_path(), config.max_retries).unwrap();
        ScanLoop::new(
            &config,
            ledger,
            Box::new(FixtureScanner::new()),
            ExtensionRegistry::empty(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_directory_does_not_persist() {
        let temp_dir = TempDir::new().unwrap();
        let mut scan = scan_loop(temp_dir.path());

        let report = scan.run_pass().await;

        assert_eq!(report.outcome, PassOutcome::Completed);
        assert_eq!(report.attempted(), 0);
        assert!(!report.persisted);
        assert!(!temp_dir.path().join("scanRecord.txt").exists());
    }

    #[tokio::test]
    async fn test_file_success_records_generated_names() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("movie.mkv"), b"").unwrap();
        let mut scan = scan_loop(temp_dir.path());

        let report = scan.run_pass().await;

        assert_eq!(report.succeeded, 1);
        assert!(report.persisted);
        let ledger = scan.ledger();
        assert!(ledger.contains_success(&ScanKey::whole("movie.mkv")));
        assert!(ledger.contains_success(&ScanKey::whole("movie_tr2_English.dts")));
    }

    #[tokio::test]
    async fn test_exempt_units_are_skipped_without_persist() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("movie.mkv"), b"").unwrap();
        let mut scan = scan_loop(temp_dir.path());

        scan.run_pass().await;
        let written = fs::read_to_string(temp_dir.path().join("scanRecord.txt")).unwrap();

        let report = scan.run_pass().await;
        assert_eq!(report.attempted(), 0);
        assert_eq!(report.skipped, 1);
        assert!(!report.persisted);
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("scanRecord.txt")).unwrap(),
            written
        );
    }

    #[tokio::test]
    async fn test_missing_watch_dir_skips_pass() {
        let temp_dir = TempDir::new().unwrap();
        let watch_dir = temp_dir.path().join("incoming");
        fs::create_dir(&watch_dir).unwrap();
        let mut scan = scan_loop(&watch_dir);

        fs::remove_dir(&watch_dir).unwrap();
        let report = scan.run_pass().await;

        assert_eq!(report.outcome, PassOutcome::ListingFailed);
        assert!(!report.persisted);
    }

    #[test]
    fn test_tentative_log_drains() {
        let mut log = TentativeLog::default();
        log.push("skipping a".to_string());
        log.push("skipping b".to_string());
        log.flush();
        assert!(log.pending.is_empty());

        log.push("skipping c".to_string());
        log.discard();
        assert!(log.pending.is_empty());
    }

    #[test]
    fn test_skip_message_names_the_unit() {
        let msg = skip_message(&ScanKey::disc_title("DISC1", 3), Exemption::Abandoned);
        assert!(msg.contains("DISC1 title 3"));
        assert!(msg.contains("abandoned"));
    }
}
