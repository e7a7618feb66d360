//! Per-path debouncing logic
//!
//! Games tend to write a save in several bursts. Changes to one path are
//! held until it has been quiet for `delay`, but never longer than
//! `MAX_WAIT_FACTOR * delay` after the first change.

use crate::{ChangeKind, WatchEvent};
use ahash::AHashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const MAX_WAIT_FACTOR: u32 = 4;

#[derive(Debug, Clone, Copy)]
struct Pending {
    first_seen: Instant,
    deadline: Instant,
    kind: ChangeKind,
}

/// Coalesces bursts of changes per path
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: AHashMap<PathBuf, Pending>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: AHashMap::new(),
        }
    }

    /// Record a change observed at `now`
    pub fn push(&mut self, event: WatchEvent, now: Instant) {
        let delay = self.delay;
        self.pending
            .entry(event.path)
            .and_modify(|p| {
                p.deadline = (now + delay).min(p.first_seen + delay * MAX_WAIT_FACTOR);
                // A creation inside the window is still reported as one
                if event.kind == ChangeKind::Create {
                    p.kind = ChangeKind::Create;
                }
            })
            .or_insert(Pending {
                first_seen: now,
                deadline: now + delay,
                kind: event.kind,
            });
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Remove and return every change whose deadline has passed
    pub fn drain_due(&mut self, now: Instant) -> Vec<WatchEvent> {
        let mut due: Vec<WatchEvent> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(path, p)| WatchEvent::new(path.clone(), p.kind))
            .collect();

        for event in &due {
            self.pending.remove(&event.path);
        }

        due.sort_by(|a, b| a.path.cmp(&b.path));
        due
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
