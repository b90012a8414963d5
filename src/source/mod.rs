//! Snapshot sources
//!
//! A source delivers the complete billing and CRM collections as raw rows.
//! Pagination and transport retries are the source's business; the store
//! above it only sees a whole snapshot or an error.

mod cache;
pub(crate) mod file;
mod lock;
pub(crate) mod registry;
pub(crate) mod store;
pub(crate) mod supabase;

use std::path::PathBuf;
use std::time::Duration;

use crate::core::RawSnapshot;
use crate::error::SourceError;

/// Connection settings shared by every source, after CLI and config merging.
#[derive(Debug, Clone, Default)]
pub(crate) struct SourceSettings {
    pub(crate) supabase_url: Option<String>,
    pub(crate) supabase_key: Option<String>,
    pub(crate) billing_view: String,
    pub(crate) crm_view: String,
    pub(crate) refresh_rpc: String,
    pub(crate) page_size: usize,
    pub(crate) timeout: Duration,
    pub(crate) data_dir: Option<PathBuf>,
}

pub(crate) trait SnapshotSource: Send + Sync {
    /// Unique name for this source (used by `--source`)
    fn name(&self) -> &'static str;

    /// Whether a successful fetch should be written to the local cache
    fn cacheable(&self) -> bool {
        true
    }

    /// Read both collections in full.
    fn fetch_snapshot(&self) -> Result<RawSnapshot, SourceError>;

    /// Ask the system of record to recompute before the next fetch.
    fn request_upstream_refresh(&self) -> Result<(), SourceError> {
        Err(SourceError::RefreshUnsupported {
            source_name: self.name(),
        })
    }
}

pub(crate) type BoxedSource = Box<dyn SnapshotSource>;

pub(crate) use cache::SnapshotCache;
pub(crate) use registry::build_source;
pub(crate) use store::{Freshness, RefreshOutcome, SnapshotStore};
