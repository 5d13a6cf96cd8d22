//! Persistent scan ledger for demuxd
//!
//! This crate provides:
//! - Ledger entry keys (container name + optional disc title)
//! - Attempt values with the success/abandoned sentinels
//! - The line-oriented backing store codec (`name|title|attempts`)
//! - The in-memory ordered ledger with reload/persist and the retry/abandon rule
//! - The exemption policy consulted before every scan attempt

pub mod attempts;
pub mod error;
pub mod exemption;
pub mod key;
pub mod ledger;
pub mod line;
pub mod store;

// Re-exports
pub use attempts::Attempts;
pub use error::LedgerError;
pub use exemption::{exemption, is_exempt, Exemption};
pub use key::ScanKey;
pub use ledger::{Ledger, ReloadStats, Summary};
pub use store::TEMP_PREFIX;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
