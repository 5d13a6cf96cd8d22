//! Post-scan extensions
//!
//! This module provides:
//! - The `Extension` capability every hook implements
//! - `LedgerHandle`, the only way an extension can touch the ledger
//! - `ExtensionRegistry`, built once at startup and ordered by priority
//! - `CommandHook`, the built-in extension configured with `[[hooks]]`

use crate::system_config::HookConfig;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A hook run after each successful scan
#[async_trait]
pub trait Extension: Send {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Lower runs first; `None` runs after every explicit priority
    fn priority(&self) -> Option<i32> {
        None
    }

    /// Called once at startup, before the first pass
    async fn on_load(&mut self, _ledger: &LedgerHandle) -> Result<()> {
        Ok(())
    }

    /// Called after a watched-directory entry produced output
    async fn after_scan(&mut self, scanned: &Path, generated: &[PathBuf]) -> Result<()>;
}

/// Capability for appending handled filenames to the ledger.
///
/// Additions are queued and applied by the scan loop after its reload and
/// after each hook, so they survive the per-pass reload and are persisted
/// with the pass.
#[derive(Debug, Clone, Default)]
pub struct LedgerHandle {
    pending: Arc<Mutex<Vec<String>>>,
}

impl LedgerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a filename in the watched directory as already handled
    pub fn add_to_ledger(&self, filename: impl Into<String>) {
        self.pending.lock().push(filename.into());
    }

    /// Take every queued filename
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Number of queued filenames
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Ordered set of loaded extensions
pub struct ExtensionRegistry {
    extensions: Vec<Box<dyn Extension>>,
    handle: LedgerHandle,
}

impl ExtensionRegistry {
    /// Sort extensions by priority, keeping registration order for ties.
    /// Extensions without a priority run after every prioritized one.
    pub fn new(mut extensions: Vec<Box<dyn Extension>>) -> Self {
        extensions.sort_by_key(|ext| {
            let priority = ext.priority();
            (priority.is_none(), priority)
        });
        Self {
            extensions,
            handle: LedgerHandle::new(),
        }
    }

    /// Registry with a `CommandHook` per configured hook
    pub fn from_config(hooks: &[HookConfig], working_dir: &Path) -> Self {
        let extensions = hooks
            .iter()
            .map(|hook| Box::new(CommandHook::from_config(hook, working_dir)) as Box<dyn Extension>)
            .collect();
        Self::new(extensions)
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Run every `on_load`; an extension that fails to load is dropped
    pub async fn load_all(&mut self) {
        let mut loaded = Vec::with_capacity(self.extensions.len());

        for mut ext in self.extensions.drain(..) {
            match ext.on_load(&self.handle).await {
                Ok(()) => {
                    info!(extension = ext.name(), priority = ?ext.priority(), "extension loaded");
                    loaded.push(ext);
                }
                Err(e) => {
                    warn!(extension = ext.name(), "failed to load extension, skipping: {:#}", e);
                }
            }
        }

        self.extensions = loaded;
    }

    /// Run every `after_scan` hook in order.
    ///
    /// A failing hook is logged and does not stop the others. Returns the
    /// number of hooks that failed.
    pub async fn after_scan(&mut self, scanned: &Path, generated: &[PathBuf]) -> usize {
        let mut failures = 0;

        for ext in &mut self.extensions {
            debug!(extension = ext.name(), scanned = %scanned.display(), "running after-scan hook");
            if let Err(e) = ext.after_scan(scanned, generated).await {
                failures += 1;
                warn!(
                    extension = ext.name(),
                    scanned = %scanned.display(),
                    "after-scan hook failed: {:#}",
                    e
                );
            }
        }

        failures
    }

    /// Ledger capability shared with every extension
    pub fn handle(&self) -> &LedgerHandle {
        &self.handle
    }

    /// Extension names in run order
    pub fn names(&self) -> Vec<&str> {
        self.extensions.iter().map(|ext| ext.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// Runs an external command after each scan.
///
/// Arguments are the configured `args`, the scanned path, then every
/// generated path. Each non-blank stdout line is a filename the command
/// created in the watched directory; it is added to the ledger so the next
/// pass does not treat it as new input.
pub struct CommandHook {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    priority: Option<i32>,
    working_dir: PathBuf,
    ledger: Option<LedgerHandle>,
}

impl CommandHook {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>, working_dir: &Path) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            priority: None,
            working_dir: working_dir.to_path_buf(),
            ledger: None,
        }
    }

    pub fn from_config(config: &HookConfig, working_dir: &Path) -> Self {
        Self {
            args: config.args.clone(),
            priority: config.priority,
            ..Self::new(&config.name, &config.command, working_dir)
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}

#[async_trait]
impl Extension for CommandHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> Option<i32> {
        self.priority
    }

    async fn on_load(&mut self, ledger: &LedgerHandle) -> Result<()> {
        self.ledger = Some(ledger.clone());
        Ok(())
    }

    async fn after_scan(&mut self, scanned: &Path, generated: &[PathBuf]) -> Result<()> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(scanned)
            .args(generated)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run hook command {}", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "hook command {} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            );
        }

        if let Some(ledger) = &self.ledger {
            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
                let name = Path::new(line)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| line.to_string());
                ledger.add_to_ledger(name);
            }
        }

        Ok(())
    }
}
