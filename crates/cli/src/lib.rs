//! lastsave command-line front end
//!
//! Wires the backup/restore engine to a filesystem watch, a restore
//! hotkey and the supervised game process.

pub mod app;
pub mod args;
pub mod config;
pub mod hotkey;
pub mod logging;
pub mod supervisor;

pub use args::Cli;
pub use config::Settings;
