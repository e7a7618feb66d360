//! Top-level run: watch, launch, listen, wait, tear down

use crate::args::Cli;
use crate::config::Settings;
use crate::hotkey::{self, HotkeyListener};
use crate::logging;
use crate::supervisor::{self, Exit};
use anyhow::{Context, Result};
use lastsave_core::{BackupEngine, PatternSet, RestoreEngine, SuspendFlag};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use watcher::WatchCoordinator;

pub async fn run(cli: Cli) -> Result<()> {
    // 1. Resolve the watched root and settings
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let root = root
        .canonicalize()
        .with_context(|| format!("Cannot watch {}", root.display()))?;

    let mut settings = Settings::discover(&root, cli.config.as_deref())?;
    settings.apply_overrides(&cli);

    let _log_guard = logging::init(settings.log_file.as_deref())?;
    // Exists once logging is up; canonical like the watched root
    let log_path = settings
        .log_file
        .as_deref()
        .and_then(|path| path.canonicalize().ok());

    // 2. Everything that can be rejected is checked before the game starts
    let trigger = hotkey::parse_key(&settings.hotkey)?;
    let patterns = Arc::new(PatternSet::compile(&cli.patterns).context("Invalid pattern")?);
    let exe = supervisor::locate_executable(&root, cli.exe.as_deref())?;

    // 3. Engines share the pattern set and the suspend flag
    let flag = Arc::new(SuspendFlag::new());
    let backup = Arc::new(BackupEngine::new(Arc::clone(&patterns), Arc::clone(&flag)));
    let mut restore =
        RestoreEngine::new(root.clone(), patterns, flag).with_grace(settings.restore_grace());
    let mut coordinator =
        WatchCoordinator::new(root.clone(), backup).with_debounce(settings.debounce());

    // Our own log writes must never be backed up or restored
    if let Some(path) = log_path {
        restore = restore.exclude(path.clone());
        coordinator = coordinator.exclude(path);
    }
    let restore = Arc::new(restore);

    let watch = coordinator
        .start()
        .context("Failed to watch save directory")?;

    // 4. Launch and supervise the game
    let child = supervisor::launch(&exe, &cli.exe_args, &root)?;

    let (interrupt_tx, interrupt_rx) = mpsc::unbounded_channel();
    let hotkey = start_hotkey(&settings, trigger, &restore, interrupt_tx);

    let exit = supervisor::supervise(child, interrupt_rx).await;

    // 5. Let running restores and backups finish
    tokio::task::spawn_blocking(move || {
        if let Some(hotkey) = hotkey {
            hotkey.stop();
        }
        watch.stop();
    })
    .await
    .context("Failed to shut down cleanly")?;

    match exit? {
        Exit::Exited(status) => info!("{} exited ({})", display_name(&exe), status),
        Exit::Interrupted => info!("Stopped"),
    }

    Ok(())
}

fn start_hotkey(
    settings: &Settings,
    trigger: crossterm::event::KeyCode,
    restore: &Arc<RestoreEngine>,
    interrupt: mpsc::UnboundedSender<()>,
) -> Option<HotkeyListener> {
    if !std::io::stdin().is_terminal() {
        warn!("stdin is not a terminal, restore hotkey disabled");
        return None;
    }

    eprintln!(
        "{} Press {} to restore the last save, {} to quit",
        "lastsave".bold(),
        settings.hotkey.cyan(),
        "Ctrl-C".cyan()
    );

    match HotkeyListener::spawn(trigger, Arc::clone(restore), interrupt) {
        Ok(listener) => Some(listener),
        Err(e) => {
            warn!("Restore hotkey disabled: {:#}", e);
            None
        }
    }
}

fn display_name(exe: &Path) -> String {
    exe.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| exe.display().to_string())
}
