//! Lock file that keeps two `enstats refresh` processes from overlapping

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Held for the duration of a refresh; the file is removed on drop.
#[derive(Debug)]
pub(crate) struct RefreshLock {
    path: PathBuf,
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .map(|modified| SystemTime::now().duration_since(modified).unwrap_or_default())
        .is_some_and(|age| age >= stale_after)
}

impl RefreshLock {
    /// `Ok(None)` when another process holds a lock younger than `stale_after`.
    /// An older lock is left over from a crashed run and is taken over.
    pub(crate) fn acquire(path: &Path, stale_after: Duration) -> io::Result<Option<Self>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{}", std::process::id()) {
                        log::debug!("Cannot write pid to {}: {}", path.display(), e);
                    }
                    return Ok(Some(Self {
                        path: path.to_path_buf(),
                    }));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if !is_stale(path, stale_after) {
                        return Ok(None);
                    }
                    log::warn!("Taking over stale refresh lock {}", path.display());
                    match fs::remove_file(path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

impl Drop for RefreshLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Cannot remove refresh lock {}: {}", self.path.display(), e);
        }
    }
}
