//! On-disk copy of the last good raw snapshot
//!
//! Stored raw, so normalization changes never invalidate it.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::RawSnapshot;
use crate::utils::write_json_atomic;

const CACHE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CachedSnapshot {
    #[serde(default)]
    version: u32,
    source: String,
    snapshot: RawSnapshot,
}

pub(crate) struct SnapshotCache {
    path: Option<PathBuf>,
}

impl SnapshotCache {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// `~/.cache/enstats/snapshot.json`
    pub(crate) fn default_location() -> Self {
        Self {
            path: crate::utils::cache_dir().map(|dir| dir.join("snapshot.json")),
        }
    }

    /// A cache that never persists
    #[cfg(test)]
    pub(crate) fn ephemeral() -> Self {
        Self { path: None }
    }

    pub(crate) fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The cached snapshot, if it was written by `source` with this cache version.
    pub(crate) fn load(&self, source: &str) -> Option<RawSnapshot> {
        let path = self.path.as_ref()?;
        let file = File::open(path).ok()?;
        match serde_json::from_reader::<_, CachedSnapshot>(file) {
            Ok(cached) if cached.version == CACHE_VERSION && cached.source == source => {
                Some(cached.snapshot)
            }
            Ok(_) => {
                log::info!("Ignoring cache at {} (other source or version)", path.display());
                None
            }
            Err(e) => {
                log::warn!("Unreadable snapshot cache {}: {}", path.display(), e);
                None
            }
        }
    }

    pub(crate) fn save(&self, source: &str, snapshot: &RawSnapshot) {
        let Some(path) = &self.path else {
            return;
        };
        let cached = CachedSnapshot {
            version: CACHE_VERSION,
            source: source.to_string(),
            snapshot: snapshot.clone(),
        };
        match write_json_atomic(path, &cached) {
            Ok(()) => log::debug!("Saved snapshot cache to {}", path.display()),
            Err(e) => log::warn!("Cannot write snapshot cache {}: {}", path.display(), e),
        }
    }
}
