//! demuxd daemon library
//!
//! This crate provides:
//! - Configuration loading and validation (`system_config`)
//! - Tracing setup with optional rolling file output (`logging`)
//! - The extension registry and the built-in command hook (`extension`)
//! - The scan loop that drives the ledger, watcher and scanner (`daemon`)

pub mod daemon;
pub mod extension;
pub mod logging;
pub mod system_config;

pub use daemon::{shutdown_signal, PassOutcome, PassReport, ScanLoop};
pub use extension::{CommandHook, Extension, ExtensionRegistry, LedgerHandle};
pub use system_config::{ConfigError, DaemonConfig, SystemConfig};
