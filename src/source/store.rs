//! The current snapshot and its refresh protocol
//!
//! Readers take an `Arc<Snapshot>` and keep it for as long as they like; a
//! refresh builds a complete replacement off to the side and swaps the
//! pointer, so nobody ever sees a half-loaded snapshot. At most one refresh
//! runs at a time, across processes too when the cache has a directory, and a
//! failed one leaves the current snapshot in place.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::consts::REFRESH_LOCK_STALE_AFTER;
use crate::core::{RawSnapshot, Snapshot, normalize_snapshot};
use crate::error::SourceError;

use super::lock::RefreshLock;
use super::{BoxedSource, SnapshotCache};

/// Where the snapshot being served came from.
#[derive(Debug)]
pub(crate) enum Freshness {
    Live,
    /// Offline mode: read from the local cache on purpose
    Cached,
    /// The fetch failed and the last cached snapshot is served instead
    Stale(SourceError),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RefreshOutcome {
    Refreshed { billing: usize, crm: usize },
    /// Another refresh was already in flight; nothing was done
    AlreadyRunning,
}

/// Clears the in-flight flag however the refresh ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub(crate) struct SnapshotStore {
    source: BoxedSource,
    cache: SnapshotCache,
    current: RwLock<Arc<Snapshot>>,
    refreshing: AtomicBool,
}

impl SnapshotStore {
    pub(crate) fn new(source: BoxedSource, cache: SnapshotCache) -> Self {
        Self {
            source,
            cache,
            current: RwLock::new(Arc::new(Snapshot::default())),
            refreshing: AtomicBool::new(false),
        }
    }

    pub(crate) fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub(crate) fn snapshot(&self) -> Arc<Snapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn install(&self, raw: &RawSnapshot) -> (usize, usize) {
        let snapshot = normalize_snapshot(raw);
        let counts = (snapshot.billing.len(), snapshot.crm.len());
        let snapshot = Arc::new(snapshot);
        match self.current.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
        counts
    }

    fn fetch_and_install(&self) -> Result<(usize, usize), SourceError> {
        let start = Instant::now();
        let raw = self.source.fetch_snapshot()?;
        if self.source.cacheable() {
            self.cache.save(self.source.name(), &raw);
        }
        let counts = self.install(&raw);
        log::info!(
            "Snapshot from {} ready: {} billing, {} CRM rows ({:.0}ms)",
            self.source.name(),
            counts.0,
            counts.1,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(counts)
    }

    fn install_cached(&self) -> Option<(usize, usize)> {
        let raw = self.cache.load(self.source.name())?;
        Some(self.install(&raw))
    }

    /// Initial load. Offline reads only the cache; online falls back to the
    /// cache when the fetch fails.
    pub(crate) fn load(&self, offline: bool) -> Result<Freshness, SourceError> {
        if offline {
            return match self.install_cached() {
                Some(_) => Ok(Freshness::Cached),
                None => Err(SourceError::NoCachedSnapshot {
                    path: self.cache.path().map(Into::into).unwrap_or_default(),
                }),
            };
        }
        match self.fetch_and_install() {
            Ok(_) => Ok(Freshness::Live),
            Err(e) => {
                if self.install_cached().is_some() {
                    log::warn!("Fetch failed, serving cached snapshot: {}", e);
                    Ok(Freshness::Stale(e))
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Re-fetch the snapshot, optionally asking upstream to recompute first.
    /// Calls overlapping a running refresh, in this process or another one
    /// sharing the cache, return `AlreadyRunning`.
    pub(crate) fn refresh(&self, upstream: bool) -> Result<RefreshOutcome, SourceError> {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::info!("Refresh already in flight; skipping");
            return Ok(RefreshOutcome::AlreadyRunning);
        }
        let _in_flight = InFlight(&self.refreshing);

        // Cacheless stores have no shared directory to lock in
        let _lock = match self.cache.path().map(|p| p.with_file_name("refresh.lock")) {
            None => None,
            Some(path) => match RefreshLock::acquire(&path, REFRESH_LOCK_STALE_AFTER) {
                Ok(Some(lock)) => Some(lock),
                Ok(None) => {
                    log::info!("Another process holds {}; skipping", path.display());
                    return Ok(RefreshOutcome::AlreadyRunning);
                }
                Err(e) => {
                    log::warn!("Cannot take refresh lock {}: {}", path.display(), e);
                    None
                }
            },
        };

        if upstream {
            match self.source.request_upstream_refresh() {
                Err(SourceError::RefreshUnsupported { source_name }) => {
                    log::info!("{} has no upstream recompute; re-fetching only", source_name);
                }
                other => other?,
            }
        }
        let (billing, crm) = self.fetch_and_install()?;
        Ok(RefreshOutcome::Refreshed { billing, crm })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SnapshotSource;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::mpsc;
    use std::time::Duration;

    fn raw(ucs: &[&str]) -> RawSnapshot {
        RawSnapshot {
            billing: ucs
                .iter()
                .map(|uc| json!({"uc": uc}).as_object().unwrap().clone())
                .collect(),
            crm: Vec::new(),
            fetched_at: None,
        }
    }

    /// Serves queued results in order; an empty queue is a timeout.
    struct Scripted {
        results: Mutex<Vec<Result<RawSnapshot, SourceError>>>,
        upstream: Mutex<Option<SourceError>>,
    }

    impl Scripted {
        fn boxed(results: Vec<Result<RawSnapshot, SourceError>>) -> BoxedSource {
            Box::new(Self {
                results: Mutex::new(results),
                upstream: Mutex::new(None),
            })
        }
    }

    impl SnapshotSource for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn fetch_snapshot(&self) -> Result<RawSnapshot, SourceError> {
            let mut results = self.results.lock().unwrap();
            if results.is_empty() {
                return Err(SourceError::Timeout {
                    message: "scripted".to_string(),
                });
            }
            results.remove(0)
        }

        fn request_upstream_refresh(&self) -> Result<(), SourceError> {
            match self.upstream.lock().unwrap().take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    fn http_error() -> SourceError {
        SourceError::Http {
            status: 500,
            url: "x".to_string(),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn failed_refresh_keeps_the_previous_snapshot() {
        let store = SnapshotStore::new(
            Scripted::boxed(vec![Ok(raw(&["1", "2"])), Err(http_error())]),
            SnapshotCache::ephemeral(),
        );
        assert!(matches!(store.load(false).unwrap(), Freshness::Live));
        let before = store.snapshot();

        assert!(store.refresh(false).is_err());
        assert_eq!(store.snapshot().billing.len(), 2);
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn upstream_timeout_is_distinguishable() {
        let source = Scripted {
            results: Mutex::new(vec![Ok(raw(&["1"]))]),
            upstream: Mutex::new(Some(SourceError::Timeout {
                message: "canceling statement".to_string(),
            })),
        };
        let store = SnapshotStore::new(Box::new(source), SnapshotCache::ephemeral());
        let err = store.refresh(true).unwrap_err();
        assert!(err.is_timeout());
        // The fetch never ran, so a later refresh still gets the queued rows
        assert_eq!(
            store.refresh(false).unwrap(),
            RefreshOutcome::Refreshed { billing: 1, crm: 0 }
        );
    }

    #[test]
    fn unsupported_upstream_still_refetches() {
        let source = Scripted {
            results: Mutex::new(vec![Ok(raw(&["1", "2"]))]),
            upstream: Mutex::new(Some(SourceError::RefreshUnsupported {
                source_name: "scripted",
            })),
        };
        let store = SnapshotStore::new(Box::new(source), SnapshotCache::ephemeral());
        assert_eq!(
            store.refresh(true).unwrap(),
            RefreshOutcome::Refreshed { billing: 2, crm: 0 }
        );
    }

    #[test]
    fn falls_back_to_cache_when_fetch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path().join("snapshot.json"));
        cache.save("scripted", &raw(&["7"]));

        let store = SnapshotStore::new(Scripted::boxed(vec![Err(http_error())]), cache);
        assert!(matches!(store.load(false).unwrap(), Freshness::Stale(_)));
        assert_eq!(store.snapshot().billing[0].uc, "7");
    }

    #[test]
    fn offline_without_cache_is_an_error() {
        let store = SnapshotStore::new(Scripted::boxed(Vec::new()), SnapshotCache::ephemeral());
        assert!(matches!(
            store.load(true),
            Err(SourceError::NoCachedSnapshot { .. })
        ));
    }

    #[test]
    fn refresh_lock_held_elsewhere_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("refresh.lock");
        let store = SnapshotStore::new(
            Scripted::boxed(vec![Ok(raw(&["1"]))]),
            SnapshotCache::new(dir.path().join("snapshot.json")),
        );

        let other = RefreshLock::acquire(&lock_path, Duration::from_secs(3600))
            .unwrap()
            .unwrap();
        assert_eq!(store.refresh(false).unwrap(), RefreshOutcome::AlreadyRunning);
        drop(other);

        assert_eq!(
            store.refresh(false).unwrap(),
            RefreshOutcome::Refreshed { billing: 1, crm: 0 }
        );
        assert!(!lock_path.exists());
    }

    /// Blocks inside the fetch until released, to hold a refresh open.
    struct Gated {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl SnapshotSource for Gated {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn fetch_snapshot(&self) -> Result<RawSnapshot, SourceError> {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(5))
                .unwrap();
            Ok(raw(&["1"]))
        }
    }

    #[test]
    fn overlapping_refresh_is_a_no_op() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = Arc::new(SnapshotStore::new(
            Box::new(Gated {
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            }),
            SnapshotCache::ephemeral(),
        ));

        let background = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.refresh(false))
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // Readers are not blocked while the refresh is in flight
        assert!(store.snapshot().billing.is_empty());
        assert_eq!(store.refresh(false).unwrap(), RefreshOutcome::AlreadyRunning);

        release_tx.send(()).unwrap();
        let outcome = background.join().unwrap().unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { billing: 1, crm: 0 });
        assert_eq!(store.snapshot().billing.len(), 1);
    }
}
