//! Restore hotkey listener
//!
//! Reads key presses from the terminal in raw mode on a dedicated thread.
//! The trigger key runs a restore on its own thread so the listener stays
//! responsive; Ctrl-C (which raw mode no longer turns into a signal) is
//! forwarded as an interrupt.

use anyhow::{bail, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use lastsave_core::RestoreEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Parse a key name: `F1`..`F24` or a single character
pub fn parse_key(name: &str) -> Result<KeyCode> {
    let name = name.trim();

    if let Some(n) = name.strip_prefix(&['F', 'f'][..]).and_then(|n| n.parse::<u8>().ok()) {
        if (1..=24).contains(&n) {
            return Ok(KeyCode::F(n));
        }
        bail!("Unsupported function key: {}", name);
    }

    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(KeyCode::Char(c.to_ascii_lowercase())),
        _ => bail!("Unknown hotkey '{}' (expected F1-F24 or a single character)", name),
    }
}

/// What a key press means to the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Restore,
    Interrupt,
    Ignore,
}

pub fn key_action(key: &KeyEvent, trigger: KeyCode) -> KeyAction {
    if key.kind != KeyEventKind::Press {
        return KeyAction::Ignore;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyAction::Interrupt;
    }

    let code = match key.code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    };

    if code == trigger {
        KeyAction::Restore
    } else {
        KeyAction::Ignore
    }
}

/// Background key listener; restores the terminal when stopped
pub struct HotkeyListener {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    raw_mode: bool,
}

impl HotkeyListener {
    /// Enter raw mode and start listening for `trigger`
    pub fn spawn(
        trigger: KeyCode,
        restore: Arc<RestoreEngine>,
        interrupt: UnboundedSender<()>,
    ) -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable raw terminal mode")?;

        let mut listener = Self {
            stop: Arc::new(AtomicBool::new(false)),
            thread: None,
            raw_mode: true,
        };

        let stop = Arc::clone(&listener.stop);
        let thread = std::thread::Builder::new()
            .name("lastsave-hotkey".to_string())
            .spawn(move || listen(trigger, restore, interrupt, stop))
            .context("Failed to spawn hotkey listener")?;
        listener.thread = Some(thread);

        Ok(listener)
    }

    /// Stop listening; waits for running restores to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Hotkey listener panicked");
            }
        }
        if self.raw_mode {
            self.raw_mode = false;
            if let Err(e) = terminal::disable_raw_mode() {
                warn!("Failed to restore terminal mode: {}", e);
            }
        }
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn listen(
    trigger: KeyCode,
    restore: Arc<RestoreEngine>,
    interrupt: UnboundedSender<()>,
    stop: Arc<AtomicBool>,
) {
    let mut restores: Vec<JoinHandle<()>> = Vec::new();

    while !stop.load(Ordering::Acquire) {
        let key = match event::poll(POLL_INTERVAL) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) => Some(key),
                Ok(_) => None,
                Err(e) => {
                    warn!("Hotkey listener stopped: {}", e);
                    break;
                }
            },
            Ok(false) => None,
            Err(e) => {
                warn!("Hotkey listener stopped: {}", e);
                break;
            }
        };

        match key.map(|k| key_action(&k, trigger)) {
            Some(KeyAction::Restore) => {
                if let Some(handle) = spawn_restore(&restore) {
                    restores.push(handle);
                }
            }
            Some(KeyAction::Interrupt) => {
                let _ = interrupt.send(());
            }
            _ => {}
        }

        restores.retain(|handle| !handle.is_finished());
    }

    for handle in restores {
        let _ = handle.join();
    }
}

fn spawn_restore(restore: &Arc<RestoreEngine>) -> Option<JoinHandle<()>> {
    let restore = Arc::clone(restore);
    std::thread::Builder::new()
        .name("lastsave-restore".to_string())
        .spawn(move || match restore.restore_all() {
            Ok(report) if !report.is_complete() => {
                warn!("{} entries could not be restored", report.failed.len());
            }
            Ok(_) => {}
            Err(e) => error!("Restore failed: {}", e),
        })
        .map_err(|e| error!("Failed to start restore: {}", e))
        .ok()
}
