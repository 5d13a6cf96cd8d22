//! Ledger error types

use std::path::PathBuf;

/// Failures reading or writing the backing store
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The backing store exists but could not be read, or could not be rewritten
    #[error("ledger I/O failed on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every non-blank line of the backing store was malformed
    #[error("ledger {} has {lines} line(s) and none could be parsed", path.display())]
    Unparseable { path: PathBuf, lines: usize },
}

impl LedgerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
