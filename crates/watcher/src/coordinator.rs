//! Watch coordinator
//!
//! Bridges filesystem notifications to the backup engine. `notify` delivers
//! raw events on its own thread into a channel; a single worker thread
//! classifies, debounces and backs them up.

use crate::debounce::Debouncer;
use crate::error::{Error, Result};
use crate::{classify, ChangeKind, WatchEvent};
use crossbeam_channel::{Receiver, Sender};
use lastsave_core::{is_backup_name, BackupEngine, BackupOutcome};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default per-path quiet period
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Worker wake-up interval when nothing is pending
const IDLE_TICK: Duration = Duration::from_secs(1);

/// Routes changes under a root directory to the backup engine
pub struct WatchCoordinator {
    root: PathBuf,
    engine: Arc<BackupEngine>,
    debounce: Duration,
    excluded: Vec<PathBuf>,
}

impl WatchCoordinator {
    pub fn new(root: impl Into<PathBuf>, engine: Arc<BackupEngine>) -> Self {
        Self {
            root: root.into(),
            engine,
            debounce: DEFAULT_DEBOUNCE,
            excluded: Vec::new(),
        }
    }

    /// Set the per-path debounce delay (zero disables it)
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Never back up `path` or anything below it
    ///
    /// `path` must be in the same form as the root, usually canonical.
    pub fn exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded.push(path.into());
        self
    }

    /// Entries to back up for a change at `path`
    ///
    /// That is the path itself plus the outermost tracked directory above
    /// it. Changes to the root, outside it, inside a backup directory or
    /// to an excluded path yield nothing.
    pub fn targets(&self, path: &Path) -> Vec<PathBuf> {
        if self.excluded.iter().any(|excluded| path.starts_with(excluded)) {
            return Vec::new();
        }

        let rel = match path.strip_prefix(&self.root) {
            Ok(rel) => rel,
            Err(_) => return Vec::new(),
        };

        let names: Vec<&str> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            })
            .collect();

        let Some((_, ancestors)) = names.split_last() else {
            return Vec::new();
        };

        if ancestors.iter().any(|name| is_backup_name(name)) {
            return Vec::new();
        }

        let mut targets = vec![path.to_path_buf()];
        if let Some(depth) = ancestors.iter().position(|name| self.engine.is_tracked(name)) {
            let dir = ancestors[..=depth]
                .iter()
                .fold(self.root.clone(), |dir, name| dir.join(name));
            targets.push(dir);
        }

        targets
    }

    /// Back up everything affected by one change
    pub fn handle_event(&self, event: &WatchEvent) -> Vec<BackupOutcome> {
        let is_create = event.kind == ChangeKind::Create;
        self.targets(&event.path)
            .iter()
            .map(|target| self.engine.on_change(target, is_create))
            .collect()
    }

    /// Start watching the root recursively
    pub fn start(self) -> Result<WatchHandle> {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = event_tx.send(res);
        })
        .map_err(Error::Init)?;

        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|source| Error::Watch {
                path: self.root.clone(),
                source,
            })?;

        info!("Monitoring directory: {}", self.root.display());

        let worker = std::thread::Builder::new()
            .name("lastsave-watch".to_string())
            .spawn(move || self.run(event_rx, shutdown_rx))
            .map_err(Error::Spawn)?;

        Ok(WatchHandle {
            watcher: Some(watcher),
            shutdown: Some(shutdown_tx),
            worker: Some(worker),
        })
    }

    fn run(self, events: Receiver<notify::Result<notify::Event>>, shutdown: Receiver<()>) {
        let mut debouncer = Debouncer::new(self.debounce);

        loop {
            let timeout = debouncer
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_TICK);

            crossbeam_channel::select! {
                recv(events) -> msg => match msg {
                    Ok(Ok(event)) => {
                        for change in classify(&event) {
                            self.enqueue(&mut debouncer, change);
                        }
                    }
                    Ok(Err(e)) => warn!("Watch error: {}", e),
                    Err(_) => break,
                },
                recv(shutdown) -> _ => break,
                default(timeout) => {}
            }

            for change in debouncer.drain_due(Instant::now()) {
                self.handle_event(&change);
            }
        }

        if !debouncer.is_empty() {
            debug!("Discarding {} pending changes", debouncer.len());
        }
        debug!("Watch worker stopped");
    }

    fn enqueue(&self, debouncer: &mut Debouncer, change: WatchEvent) {
        // Restores write tracked files; those writes are not user changes
        if self.engine.is_suspended() {
            debug!("Ignoring {} during restore", change.path.display());
            return;
        }
        debouncer.push(change, Instant::now());
    }
}

/// A running watch; stopping it joins the worker
pub struct WatchHandle {
    watcher: Option<RecommendedWatcher>,
    shutdown: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Stop watching and wait for an in-flight backup to finish
    pub fn stop(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        self.watcher.take();
        self.shutdown.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Watch worker panicked");
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lastsave_core::{PatternSet, SkipReason, SuspendFlag};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        root: PathBuf,
        flag: Arc<SuspendFlag>,
        coordinator: WatchCoordinator,
    }

    fn fixture(patterns: &[&str]) -> Fixture {
        let dir = TempDir::new().unwrap();
        // notify reports canonical paths on some platforms
        let root = dir.path().canonicalize().unwrap();
        let flag = Arc::new(SuspendFlag::new());
        let patterns = Arc::new(PatternSet::compile(patterns).unwrap());
        let engine = Arc::new(BackupEngine::new(patterns, Arc::clone(&flag)));
        let coordinator = WatchCoordinator::new(root.clone(), engine).with_debounce(Duration::ZERO);
        Fixture {
            dir,
            root,
            flag,
            coordinator,
        }
    }

    fn wait_for(mut check: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if check() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn test_targets() {
        let fx = fixture(&["save#", "profiles"]);
        let root = &fx.root;

        assert_eq!(fx.coordinator.targets(root), Vec::<PathBuf>::new());
        assert_eq!(fx.coordinator.targets(Path::new("/elsewhere/save1")), Vec::<PathBuf>::new());
        assert_eq!(fx.coordinator.targets(&root.join("save1")), vec![root.join("save1")]);

        // Change inside a tracked directory refreshes the directory
        assert_eq!(
            fx.coordinator.targets(&root.join("profiles/p1/a.dat")),
            vec![root.join("profiles/p1/a.dat"), root.join("profiles")]
        );

        // Anything inside a backup directory is ignored
        assert!(fx.coordinator.targets(&root.join("last_profiles/a.dat")).is_empty());
    }

    #[test]
    fn test_excluded_paths_never_backed_up() {
        let fx = fixture(&["*"]);
        let root = fx.root.clone();
        let coordinator = fx
            .coordinator
            .exclude(root.join("run.log"))
            .exclude(root.join("logs/lastsave.log"));

        fs::write(root.join("run.log"), b"INFO Modified: run.log\n").unwrap();
        assert!(coordinator.targets(&root.join("run.log")).is_empty());
        let outcomes =
            coordinator.handle_event(&WatchEvent::new(root.join("run.log"), ChangeKind::Modify));
        assert!(outcomes.is_empty());
        assert!(!root.join("last_run.log").exists());

        // An excluded file inside a tracked directory does not refresh it
        assert!(coordinator.targets(&root.join("logs/lastsave.log")).is_empty());
        assert_eq!(
            coordinator.targets(&root.join("logs/other.log")),
            vec![root.join("logs/other.log"), root.join("logs")]
        );

        assert_eq!(coordinator.targets(&root.join("save1")), vec![root.join("save1")]);
    }

    #[test]
    fn test_handle_event_backs_up() {
        let fx = fixture(&["save#", "default.rec"]);
        fs::write(fx.root.join("default.rec"), b"rec").unwrap();

        let outcomes = fx
            .coordinator
            .handle_event(&WatchEvent::new(fx.root.join("default.rec"), ChangeKind::Modify));
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_backed_up());
        assert_eq!(fs::read(fx.root.join("last_default.rec")).unwrap(), b"rec");
    }

    #[test]
    fn test_events_during_restore_are_ignored() {
        let fx = fixture(&["save#"]);
        fs::write(fx.root.join("save1"), b"restored").unwrap();

        let suspension = fx.flag.suspend();
        let outcomes = fx
            .coordinator
            .handle_event(&WatchEvent::new(fx.root.join("save1"), ChangeKind::Modify));
        assert!(matches!(outcomes[0], BackupOutcome::Skipped(SkipReason::Suspended)));

        // Also dropped before reaching the debouncer
        let mut debouncer = Debouncer::new(Duration::ZERO);
        fx.coordinator
            .enqueue(&mut debouncer, WatchEvent::new(fx.root.join("save1"), ChangeKind::Modify));
        assert!(debouncer.is_empty());
        drop(suspension);

        assert!(!fx.root.join("last_save1").exists());
    }

    #[test]
    fn test_live_watch_backs_up_files() {
        let fx = fixture(&["save#", "default.rec"]);
        let root = fx.root.clone();
        let handle = fx.coordinator.start().unwrap();

        fs::write(root.join("save1"), b"A").unwrap();
        assert!(wait_for(|| fs::read(root.join("last_save1")).ok().as_deref() == Some(b"A".as_slice())));

        fs::write(root.join("save1"), b"B").unwrap();
        assert!(wait_for(|| fs::read(root.join("last_save1")).ok().as_deref() == Some(b"B".as_slice())));

        fs::write(root.join("notes.txt"), b"x").unwrap();
        std::thread::sleep(Duration::from_millis(200));
        assert!(!root.join("last_notes.txt").exists());
        assert!(!root.join("last_last_save1").exists());

        handle.stop();
        drop(fx.dir);
    }

    #[test]
    fn test_live_watch_mirrors_directory() {
        let fx = fixture(&["*"]);
        let root = fx.root.clone();
        // Files written right after mkdir can land before the new
        // directory is watched; the quiet period covers them
        let handle = fx
            .coordinator
            .with_debounce(Duration::from_millis(50))
            .start()
            .unwrap();

        let profiles = root.join("profiles");
        fs::create_dir(&profiles).unwrap();
        fs::write(profiles.join("one.dat"), b"1").unwrap();

        let mirrored = root.join("last_profiles/one.dat");
        assert!(wait_for(|| fs::read(&mirrored).ok().as_deref() == Some(b"1".as_slice())));

        handle.stop();
        drop(fx.dir);
    }
}
