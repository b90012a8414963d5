use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde_json::Value;

use crate::utils::write_json_atomic;

pub(super) fn get_cache_path() -> Option<PathBuf> {
    Some(crate::utils::cache_dir()?.join("commission.json"))
}

pub(super) fn load_raw_cache() -> Option<HashMap<String, Value>> {
    let path = get_cache_path()?;
    let file = File::open(&path).ok()?;
    serde_json::from_reader(file).ok()
}

pub(super) fn load_raw_cache_if_fresh(ttl: Duration) -> Option<(HashMap<String, Value>, Duration)> {
    let path = get_cache_path()?;
    let meta = std::fs::metadata(&path).ok()?;
    let modified = meta.modified().ok()?;
    let age = SystemTime::now().duration_since(modified).ok()?;
    if age > ttl {
        return None;
    }
    let file = File::open(&path).ok()?;
    let data = serde_json::from_reader(file).ok()?;
    Some((data, age))
}

pub(super) fn save_raw_cache(raw_data: &HashMap<String, Value>) {
    let Some(path) = get_cache_path() else {
        return;
    };
    if let Err(e) = write_json_atomic(&path, raw_data) {
        log::warn!("Cannot write commission cache {}: {}", path.display(), e);
    }
}
