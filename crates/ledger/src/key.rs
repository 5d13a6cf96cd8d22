//! Ledger entry keys

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Identifies one scannable unit.
///
/// `name` is the on-disk filename of a container, a disc directory, or a
/// generated artifact. `title` is only present for a single title inside a
/// disc directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ScanKey {
    name: String,
    title: Option<u32>,
}

impl ScanKey {
    /// Create a key from its parts
    pub fn new(name: impl Into<String>, title: Option<u32>) -> Self {
        Self {
            name: name.into(),
            title,
        }
    }

    /// Key for a flat file, a whole disc directory, or a generated artifact
    pub fn whole(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    /// Key for one title of a disc directory
    pub fn disc_title(name: impl Into<String>, title: u32) -> Self {
        Self::new(name, Some(title))
    }

    /// Filename this key refers to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Disc title number, if any
    pub fn title(&self) -> Option<u32> {
        self.title
    }

    /// Whether the key can be written to the backing store as a single line
    pub fn is_representable(&self) -> bool {
        is_representable_name(&self.name)
    }
}

/// A name is representable if it is non-empty and contains neither the
/// field separator nor a line break.
pub fn is_representable_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['|', '\n', '\r'])
}

impl Ord for ScanKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Absent title compares as 0; the trailing is_some() keeps the order
        // consistent with Eq (None sorts directly before Some(0)).
        self.name
            .cmp(&other.name)
            .then_with(|| self.title.unwrap_or(0).cmp(&other.title.unwrap_or(0)))
            .then_with(|| self.title.is_some().cmp(&other.title.is_some()))
    }
}

impl PartialOrd for ScanKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ScanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.title {
            Some(title) => write!(f, "{} title {}", self.name, title),
            None => f.write_str(&self.name),
        }
    }
}
