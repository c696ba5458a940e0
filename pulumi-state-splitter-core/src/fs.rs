//! Filesystem operations.

use std::{
    fs::{self, File},
    io::{self, ErrorKind, Write as _},
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Removes a directory if it is empty.
///
/// Returns whether the directory is gone. A directory that still has
/// contents is left alone; other errors are propagated.
pub fn rmdir_if_empty(path: &Path) -> Result<bool> {
    match fs::remove_dir(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed empty directory");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::DirectoryNotEmpty => Ok(false),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
        Err(e) => Err(Error::fs(path, e)),
    }
}

/// Removes `dir` and its ancestors as long as they are empty, never touching
/// `root` or anything above it.
pub fn prune_empty_dirs(dir: &Path, root: &Path) -> Result<()> {
    let mut current = Some(dir);
    while let Some(d) = current {
        if d == root || !d.starts_with(root) {
            break;
        }
        if !rmdir_if_empty(d)? {
            break;
        }
        current = d.parent();
    }
    Ok(())
}

/// Removes a file. A file that is already gone is not an error.
pub fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed file");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "file already removed");
            Ok(())
        }
        Err(e) => Err(Error::fs(path, e)),
    }
}

pub fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::fs(path, e))
}

/// Writes a file and flushes it to stable storage, creating parent
/// directories as needed.
pub fn write(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::fs(parent, e))?;
    }
    let write = || -> io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(contents)?;
        file.sync_all()
    };
    write().map_err(|e| Error::fs(path, e))?;
    tracing::debug!(path = %path.display(), "wrote file");
    Ok(())
}

/// Subdirectories of `dir`, sorted, without hidden ones. A missing `dir` has none.
pub fn visible_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::fs(dir, e)),
    };
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::fs(dir, e))?;
        let path = entry.path();
        if is_hidden(&path) {
            continue;
        }
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// All files below `dir`, at any depth, sorted.
pub fn files_below(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::fs(path, e.into())
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with('.'))
}
