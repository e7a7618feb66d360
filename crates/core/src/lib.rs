//! Save-file backup and restore engine
//!
//! This crate provides:
//! - The save-name pattern dialect (`#`, `?`, `*`)
//! - The `last_` backup engine for files and directories
//! - The bulk restore engine
//! - The suspend flag shared between the two

pub mod backup;
pub mod error;
pub mod fsutil;
pub mod pattern;
pub mod restore;
pub mod suspend;

// Re-exports
pub use backup::{backup_name, backup_path, is_backup_name, BackupEngine, BackupOutcome, SkipReason};
pub use error::{Error, Result};
pub use fsutil::EntryKind;
pub use pattern::{matches, Matcher, PatternSet};
pub use restore::{FailedEntry, RestoreEngine, RestoreReport, RestoredEntry};
pub use suspend::{BackupPermit, SuspendFlag, Suspension};

/// Reserved name prefix for backups
pub const BACKUP_PREFIX: &str = "last_";
