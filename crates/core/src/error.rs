//! Error types for the backup/restore engine

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by pattern compilation and filesystem mirroring
#[derive(Debug, Error)]
pub enum Error {
    /// Pattern string was empty
    #[error("empty pattern")]
    EmptyPattern,

    /// No patterns were supplied at all
    #[error("no patterns supplied")]
    NoPatterns,

    /// Pattern could not be compiled
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Copying an entry failed
    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Removing an entry failed
    #[error("failed to remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading entry metadata or listing a directory failed
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Walking a directory tree failed
    #[error("failed to walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}
