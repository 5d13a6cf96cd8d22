//! CLI command implementations

pub mod config;
pub mod forget;
pub mod run;
pub mod status;

use anyhow::{Context, Result};
use cli_lib::system_config::{self, SystemConfig};
use std::path::Path;

/// Configuration missing or invalid
pub const EXIT_CONFIG: u8 = 1;

/// Ledger could not be loaded at startup
pub const EXIT_LEDGER: u8 = 2;

/// Load configuration for an operator command
pub fn load_config(path: &Path) -> Result<SystemConfig> {
    system_config::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}
