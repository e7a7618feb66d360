//! File system watching for lastsave
//!
//! This crate provides:
//! - Translation of raw `notify` events into create/modify changes
//! - Per-path debouncing
//! - The watch coordinator feeding the backup engine

pub mod coordinator;
pub mod debounce;
pub mod error;

pub use coordinator::{WatchCoordinator, WatchHandle};
pub use debounce::Debouncer;
pub use error::{Error, Result};

use notify::event::{EventKind as NotifyKind, ModifyKind, RenameMode};
use std::path::PathBuf;

/// A change that may trigger a backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: ChangeKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Type of change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Entry created (or renamed into place)
    Create,
    /// Entry contents modified
    Modify,
}

/// Extract the trigger changes from a raw notify event
///
/// Deletions, renames away, access and metadata-only events yield nothing.
pub fn classify(event: &notify::Event) -> Vec<WatchEvent> {
    let kind = match event.kind {
        NotifyKind::Create(_) => ChangeKind::Create,
        // Atomic saves: write a temp file, rename it over the original
        NotifyKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            return event
                .paths
                .get(1)
                .map(|to| vec![WatchEvent::new(to.clone(), ChangeKind::Create)])
                .unwrap_or_default();
        }
        NotifyKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Any)) => ChangeKind::Create,
        NotifyKind::Modify(ModifyKind::Name(_)) => return Vec::new(),
        NotifyKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        NotifyKind::Modify(_) => ChangeKind::Modify,
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .map(|path| WatchEvent::new(path.clone(), kind))
        .collect()
}
