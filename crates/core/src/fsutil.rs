//! Filesystem helpers for mirroring entries

use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Kind of a tracked entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory tree
    Directory,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
        }
    }
}

/// Kind of the entry at `path`, or `None` if nothing is there
pub fn entry_kind(path: &Path) -> Result<Option<EntryKind>> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Directory)),
        Ok(_) => Ok(Some(EntryKind::File)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Remove a file or directory tree; missing entries are not an error
pub fn remove_entry(path: &Path) -> Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Copy a single file over `to`
pub fn copy_file(from: &Path, to: &Path) -> Result<u64> {
    fs::copy(from, to).map_err(|source| Error::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// Recursively copy the directory `from` into a new directory `to`
///
/// Symlinks inside the tree are skipped.
pub fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|source| Error::Walk {
            path: from.to_path_buf(),
            source,
        })?;

        // WalkDir only yields paths below `from`
        let rel = match entry.path().strip_prefix(from) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = to.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|source| Error::Copy {
                from: entry.path().to_path_buf(),
                to: target.clone(),
                source,
            })?;
        } else if file_type.is_file() {
            copy_file(entry.path(), &target)?;
        } else {
            debug!("Skipping non-regular entry {}", entry.path().display());
        }
    }

    Ok(())
}

/// Make `to` a verbatim copy of `from`
///
/// Directories fully replace whatever is at `to`. Files overwrite an
/// existing file in place; an existing directory is removed first.
pub fn mirror(from: &Path, to: &Path) -> Result<EntryKind> {
    let kind = entry_kind(from)?.ok_or_else(|| Error::Read {
        path: from.to_path_buf(),
        source: io::Error::from(io::ErrorKind::NotFound),
    })?;

    match kind {
        EntryKind::Directory => {
            remove_entry(to)?;
            copy_tree(from, to)?;
        }
        EntryKind::File => {
            if entry_kind(to)? == Some(EntryKind::Directory) {
                remove_entry(to)?;
            }
            copy_file(from, to)?;
        }
    }

    Ok(kind)
}
