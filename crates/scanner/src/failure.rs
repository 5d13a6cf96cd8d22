//! Typed scan outcomes

use std::path::PathBuf;

/// Why a scan attempt failed
#[derive(Debug, thiserror::Error)]
pub enum ScanFailure {
    /// Directory is not a disc structure the demuxer recognizes
    #[error("not recognized as a disc structure: {output}")]
    NotADisc { output: String },

    /// Flat file is not a readable container
    #[error("not a readable container: {output}")]
    UnreadableContainer { output: String },

    /// Disc structure was recognized but is damaged
    #[error("corrupt disc structure: {output}")]
    CorruptStructure { output: String },

    /// Demuxer attempted an impossible format conversion
    #[error("bad format conversion (arguments: {arguments:?}): {output}")]
    BadConversion {
        arguments: Vec<String>,
        output: String,
    },

    /// Demuxer ran and reported any other error
    #[error("demuxer failed (arguments: {arguments:?}, exit: {status:?}): {output}")]
    Tool {
        arguments: Vec<String>,
        status: Option<i32>,
        output: String,
    },

    /// A path could not be read or the demuxer could not be run
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How loudly a failure should be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Entry is not the structure expected; may be benign
    StructuralMismatch,
    /// The demuxer ran and reported an error
    ToolFailure,
    /// A path could not be read or written
    IoFailure,
}

impl ScanFailure {
    pub fn severity(&self) -> Severity {
        match self {
            Self::NotADisc { .. } | Self::UnreadableContainer { .. } => {
                Severity::StructuralMismatch
            }
            Self::CorruptStructure { .. } | Self::BadConversion { .. } | Self::Tool { .. } => {
                Severity::ToolFailure
            }
            Self::Io { .. } => Severity::IoFailure,
        }
    }

    /// Arguments the demuxer was invoked with, when known
    pub fn arguments(&self) -> &[String] {
        match self {
            Self::BadConversion { arguments, .. } | Self::Tool { arguments, .. } => arguments,
            _ => &[],
        }
    }
}
