//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

/// lastsave - keep a `last_` copy of every save file and restore it on demand
#[derive(Parser, Debug)]
#[command(name = "lastsave")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Save file patterns (`#` digits, `?` any character, `*` alone matches everything)
    #[arg(required = true, value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Executable to launch (default: the only executable in the root)
    #[arg(short, long, value_name = "PATH")]
    pub exe: Option<PathBuf>,

    /// Directory to watch (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Config file (default: <root>/lastsave.toml if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Restore hotkey, e.g. F8 or r
    #[arg(long, value_name = "KEY")]
    pub hotkey: Option<String>,

    /// Milliseconds backups stay paused after a restore
    #[arg(long, value_name = "MS")]
    pub grace_ms: Option<u64>,

    /// Milliseconds a save must be quiet before it is backed up
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Arguments passed through to the executable
    #[arg(last = true, value_name = "ARGS")]
    pub exe_args: Vec<String>,
}
