//! Game process supervision

use anyhow::{bail, Context, Result};
use lastsave_core::is_backup_name;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

/// How the supervised process ended
#[derive(Debug)]
pub enum Exit {
    /// The process exited on its own
    Exited(ExitStatus),
    /// The user interrupted; the process was killed
    Interrupted,
}

/// Resolve the executable to launch
///
/// An explicit path is resolved against `root` when relative and must
/// exist. Otherwise `root` must contain exactly one executable file.
pub fn locate_executable(root: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        if !path.is_file() {
            bail!("Executable not found: {}", path.display());
        }
        return Ok(path);
    }

    let own_exe = std::env::current_exe()
        .ok()
        .and_then(|p| p.canonicalize().ok());

    let mut candidates = Vec::new();
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("Failed to read directory {}", root.display()))?;
    for entry in entries {
        let path = entry?.path();
        let is_backup = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, is_backup_name);
        if is_backup || !is_launchable(&path) {
            continue;
        }
        if own_exe.is_some() && path.canonicalize().ok() == own_exe {
            continue;
        }
        candidates.push(path);
    }
    candidates.sort();

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => bail!(
            "No executable found in {}; pass one with --exe",
            root.display()
        ),
        n => bail!(
            "Found {} executables in {} ({}); pick one with --exe",
            n,
            root.display(),
            candidates
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

#[cfg(unix)]
fn is_launchable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(windows)]
fn is_launchable(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("exe"))
}

#[cfg(not(any(unix, windows)))]
fn is_launchable(_path: &Path) -> bool {
    false
}

/// Start the executable with `cwd` as its working directory
pub fn launch(exe: &Path, args: &[String], cwd: &Path) -> Result<Child> {
    let child = Command::new(exe)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to launch {}", exe.display()))?;

    info!("Launching {}", exe.display());
    Ok(child)
}

/// Wait for the child to exit, or kill it on Ctrl-C / an interrupt message
pub async fn supervise(mut child: Child, mut interrupt: UnboundedReceiver<()>) -> Result<Exit> {
    let status = tokio::select! {
        status = child.wait() => Some(status.context("Failed to wait for process")?),
        _ = tokio::signal::ctrl_c() => None,
        Some(()) = interrupt.recv() => None,
    };

    match status {
        Some(status) => Ok(Exit::Exited(status)),
        None => {
            info!("Interrupted, stopping game");
            child.kill().await.context("Failed to kill process")?;
            Ok(Exit::Interrupted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    #[cfg(unix)]
    fn write_executable(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        fs::write(path, body).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_explicit_relative_exe() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("game.bin"), b"").unwrap();

        let exe = locate_executable(temp_dir.path(), Some(Path::new("game.bin"))).unwrap();
        assert_eq!(exe, temp_dir.path().join("game.bin"));
    }

    #[test]
    fn test_explicit_missing_exe() {
        let temp_dir = TempDir::new().unwrap();
        let err = locate_executable(temp_dir.path(), Some(Path::new("jh.exe"))).unwrap_err();
        assert!(err.to_string().contains("Executable not found"));
    }

    #[test]
    fn test_no_executable_found() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("save1"), b"data").unwrap();

        let err = locate_executable(temp_dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("--exe"));
    }

    #[cfg(unix)]
    #[test]
    fn test_single_executable_discovered() {
        let temp_dir = TempDir::new().unwrap();
        write_executable(&temp_dir.path().join("game.sh"), "#!/bin/sh\n");
        write_executable(&temp_dir.path().join("last_game.sh"), "#!/bin/sh\n");
        fs::write(temp_dir.path().join("save1"), b"data").unwrap();

        let exe = locate_executable(temp_dir.path(), None).unwrap();
        assert_eq!(exe, temp_dir.path().join("game.sh"));
    }

    #[cfg(unix)]
    #[test]
    fn test_ambiguous_executables() {
        let temp_dir = TempDir::new().unwrap();
        write_executable(&temp_dir.path().join("a.sh"), "#!/bin/sh\n");
        write_executable(&temp_dir.path().join("b.sh"), "#!/bin/sh\n");

        let err = locate_executable(temp_dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("a.sh, b.sh"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_supervise_reports_exit() {
        let temp_dir = TempDir::new().unwrap();
        let exe = temp_dir.path().join("game.sh");
        write_executable(&exe, "#!/bin/sh\nexit 3\n");

        let (_tx, rx) = mpsc::unbounded_channel();
        let child = launch(&exe, &[], temp_dir.path()).unwrap();

        match supervise(child, rx).await.unwrap() {
            Exit::Exited(status) => assert_eq!(status.code(), Some(3)),
            Exit::Interrupted => panic!("not interrupted"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_supervise_interrupt_kills_child() {
        let temp_dir = TempDir::new().unwrap();
        let exe = temp_dir.path().join("game.sh");
        write_executable(&exe, "#!/bin/sh\nsleep 30\n");

        let (tx, rx) = mpsc::unbounded_channel();
        let child = launch(&exe, &[], temp_dir.path()).unwrap();
        tx.send(()).unwrap();

        let exit = tokio::time::timeout(std::time::Duration::from_secs(5), supervise(child, rx))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(exit, Exit::Interrupted));
    }
}
