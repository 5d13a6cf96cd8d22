//! Crash-safe rewrite of the backing store

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Prefix of the temporary file written next to the backing store.
///
/// Anything enumerating the watched directory must skip names with this prefix.
pub const TEMP_PREFIX: &str = ".demuxd-ledger-";

/// Atomic write helper
///
/// Writes data to a temporary file in the target's directory, fsyncs it, then
/// renames it over the target. Existing permissions on the target are kept.
pub fn atomic_write(target: &Path, data: &[u8]) -> io::Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)?;

    tmp.write_all(data)?;
    tmp.flush()?;

    if let Ok(metadata) = fs::metadata(target) {
        tmp.as_file().set_permissions(metadata.permissions())?;
    }

    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;

    // Make the rename itself durable
    #[cfg(unix)]
    {
        if let Ok(dir_handle) = File::open(dir) {
            let _ = dir_handle.sync_all();
        }
    }

    Ok(())
}
