//! Watcher setup errors

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to create filesystem watcher: {0}")]
    Init(#[source] notify::Error),

    #[error("cannot watch {}: {source}", .path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to spawn watch worker: {0}")]
    Spawn(#[source] std::io::Error),
}
