//! Bulk restore of `last_` backups
//!
//! Only direct children of the root are considered; a directory backup is
//! restored as one whole subtree.

use crate::error::{Error, Result};
use crate::fsutil::{self, EntryKind};
use crate::pattern::PatternSet;
use crate::suspend::SuspendFlag;
use crate::BACKUP_PREFIX;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Default time the suspend flag stays raised after a restore
pub const DEFAULT_GRACE: Duration = Duration::from_secs(1);

/// An entry that was restored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// An entry that could not be restored
#[derive(Debug)]
pub struct FailedEntry {
    pub name: String,
    pub error: Error,
}

/// Outcome of one restore pass
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: Vec<RestoredEntry>,
    pub failed: Vec<FailedEntry>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Restores every tracked backup in a root directory
pub struct RestoreEngine {
    root: PathBuf,
    patterns: Arc<PatternSet>,
    flag: Arc<SuspendFlag>,
    grace: Duration,
    excluded: Vec<PathBuf>,
}

impl RestoreEngine {
    pub fn new(root: PathBuf, patterns: Arc<PatternSet>, flag: Arc<SuspendFlag>) -> Self {
        Self {
            root,
            patterns,
            flag,
            grace: DEFAULT_GRACE,
            excluded: Vec::new(),
        }
    }

    /// Set the grace period held after the copies complete
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Never overwrite `path`, even if a matching backup exists
    pub fn exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded.push(path.into());
        self
    }

    /// Original name for a backup name, if it should be restored
    pub fn original_name<'a>(&self, backup_name: &'a str) -> Option<&'a str> {
        let original = backup_name.strip_prefix(BACKUP_PREFIX)?;
        if original.is_empty() || original.contains(BACKUP_PREFIX) {
            return None;
        }
        self.patterns.matches(original).then_some(original)
    }

    /// Copy every matching backup back onto its original
    ///
    /// Backups are suspended for the whole pass plus the grace period.
    /// Per-entry failures are collected in the report; only failing to list
    /// the root is an error.
    pub fn restore_all(&self) -> Result<RestoreReport> {
        let suspension = self.flag.suspend();
        info!("Restoring to last save");

        let mut backups = Vec::new();
        let entries = fs::read_dir(&self.root).map_err(|source| Error::Read {
            path: self.root.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| Error::Read {
                path: self.root.clone(),
                source,
            })?;
            if let Some(name) = entry.file_name().to_str() {
                if let Some(original) = self.original_name(name) {
                    if self.excluded.contains(&self.root.join(original)) {
                        debug!("Not restoring excluded {}", original);
                        continue;
                    }
                    backups.push((name.to_string(), original.to_string()));
                }
            }
        }
        backups.sort();

        let mut report = RestoreReport::default();
        for (backup, original) in backups {
            info!("Restoring: {}", original);
            match self.restore_entry(&self.root.join(&backup), &self.root.join(&original)) {
                Ok(kind) => {
                    info!("Restored: {} ({})", original, kind.as_str());
                    report.restored.push(RestoredEntry { name: original, kind });
                }
                Err(error) => {
                    error!("Failed to restore {}: {}", original, error);
                    report.failed.push(FailedEntry { name: original, error });
                }
            }
        }

        info!(
            "Restore finished: {} restored, {} failed",
            report.restored.len(),
            report.failed.len()
        );

        suspension.resume_after(self.grace);
        Ok(report)
    }

    fn restore_entry(&self, backup: &Path, original: &Path) -> Result<EntryKind> {
        let kind = fsutil::entry_kind(backup)?.ok_or_else(|| Error::Read {
            path: backup.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;

        fsutil::remove_entry(original)?;
        match kind {
            EntryKind::Directory => fsutil::copy_tree(backup, original)?,
            EntryKind::File => {
                fsutil::copy_file(backup, original)?;
            }
        }

        Ok(kind)
    }
}
