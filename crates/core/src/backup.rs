//! Backup-on-change engine
//!
//! Every tracked entry gets a single sibling mirror named
//! `last_<name>`, refreshed wholesale on each change.

use crate::error::Error;
use crate::fsutil::{self, EntryKind};
use crate::pattern::PatternSet;
use crate::suspend::SuspendFlag;
use crate::BACKUP_PREFIX;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Backup name for an original name
pub fn backup_name(name: &str) -> String {
    format!("{}{}", BACKUP_PREFIX, name)
}

/// True if `name` lives in the reserved backup namespace
pub fn is_backup_name(name: &str) -> bool {
    name.starts_with(BACKUP_PREFIX)
}

/// Sibling backup path for `path`
pub fn backup_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    Some(path.with_file_name(backup_name(name)))
}

/// Why a change did not produce a backup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A restore is in progress
    Suspended,
    /// The changed entry is itself a backup
    BackupEntry,
    /// No pattern matches the name
    NotTracked,
    /// The entry disappeared before it could be copied
    Vanished,
}

/// Result of handling one change
#[derive(Debug)]
pub enum BackupOutcome {
    Skipped(SkipReason),
    BackedUp { backup: PathBuf, kind: EntryKind },
    Failed(Error),
}

impl BackupOutcome {
    pub fn is_backed_up(&self) -> bool {
        matches!(self, BackupOutcome::BackedUp { .. })
    }
}

/// Produces `last_` mirrors for changed entries
pub struct BackupEngine {
    patterns: Arc<PatternSet>,
    flag: Arc<SuspendFlag>,
}

impl BackupEngine {
    pub fn new(patterns: Arc<PatternSet>, flag: Arc<SuspendFlag>) -> Self {
        Self { patterns, flag }
    }

    /// True if `name` is an original entry covered by the active patterns
    pub fn is_tracked(&self, name: &str) -> bool {
        !is_backup_name(name) && self.patterns.matches(name)
    }

    pub fn is_suspended(&self) -> bool {
        self.flag.is_suspended()
    }

    /// Back up `path` after it was created or modified
    pub fn on_change(&self, path: &Path, is_create: bool) -> BackupOutcome {
        if self.flag.is_suspended() {
            return BackupOutcome::Skipped(SkipReason::Suspended);
        }

        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return BackupOutcome::Skipped(SkipReason::NotTracked),
        };

        if is_backup_name(name) {
            return BackupOutcome::Skipped(SkipReason::BackupEntry);
        }

        if !self.patterns.matches(name) {
            return BackupOutcome::Skipped(SkipReason::NotTracked);
        }

        // Held until the copy is complete
        let _permit = match self.flag.begin_backup() {
            Some(permit) => permit,
            None => return BackupOutcome::Skipped(SkipReason::Suspended),
        };

        match fsutil::entry_kind(path) {
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!("{} vanished before backup", path.display());
                return BackupOutcome::Skipped(SkipReason::Vanished);
            }
            Err(e) => {
                warn!("Backup of {} failed: {}", path.display(), e);
                return BackupOutcome::Failed(e);
            }
        }

        let Some(backup) = backup_path(path) else {
            return BackupOutcome::Skipped(SkipReason::NotTracked);
        };
        match fsutil::mirror(path, &backup) {
            Ok(kind) => {
                let verb = if is_create { "Created" } else { "Modified" };
                info!("{}: {}", verb, name);
                BackupOutcome::BackedUp { backup, kind }
            }
            Err(e) => {
                warn!("Backup of {} failed: {}", path.display(), e);
                BackupOutcome::Failed(e)
            }
        }
    }
}
