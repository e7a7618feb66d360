//! Suspend flag shared by the backup and restore engines
//!
//! A restore raises the flag and then takes the write side of the gate,
//! which waits for every in-flight backup (holding the read side) to
//! finish. Backups check the flag both before and after taking their
//! permit, so none starts while a restore is pending or running.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Shared suspension state
///
/// The flag is a depth counter rather than a bool so that overlapping
/// restores keep it raised until the last one resumes.
#[derive(Debug, Default)]
pub struct SuspendFlag {
    depth: AtomicUsize,
    gate: RwLock<()>,
}

impl SuspendFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while any restore is in progress
    pub fn is_suspended(&self) -> bool {
        self.depth.load(Ordering::Acquire) > 0
    }

    /// Take a permit to write a backup
    ///
    /// Returns `None` when suspended. The permit must be held for the whole
    /// copy.
    pub fn begin_backup(&self) -> Option<BackupPermit<'_>> {
        if self.is_suspended() {
            return None;
        }

        let gate = self.gate.read();

        // A restore may have started while we waited for the gate
        if self.is_suspended() {
            return None;
        }

        Some(BackupPermit { _gate: gate })
    }

    /// Raise the flag and wait for in-flight backups to drain
    pub fn suspend(&self) -> Suspension<'_> {
        self.depth.fetch_add(1, Ordering::AcqRel);
        let gate = self.gate.write();

        Suspension {
            flag: self,
            gate: Some(gate),
        }
    }
}

/// Held by a backup while it writes
pub struct BackupPermit<'a> {
    _gate: RwLockReadGuard<'a, ()>,
}

/// Held by a restore while it writes; lowers the flag on drop
pub struct Suspension<'a> {
    flag: &'a SuspendFlag,
    gate: Option<RwLockWriteGuard<'a, ()>>,
}

impl Suspension<'_> {
    /// Release the gate, keep the flag raised for `grace`, then resume
    ///
    /// The grace period absorbs notification delivery lag for the entries
    /// the restore just wrote. It narrows the window but does not close it.
    pub fn resume_after(mut self, grace: Duration) {
        self.gate.take();
        if !grace.is_zero() {
            std::thread::sleep(grace);
        }
    }
}

impl Drop for Suspension<'_> {
    fn drop(&mut self) {
        self.gate.take();
        self.flag.depth.fetch_sub(1, Ordering::AcqRel);
    }
}
