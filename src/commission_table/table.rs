use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::core::{CommissionLookup, parse_number};

use super::cache::{load_raw_cache, load_raw_cache_if_fresh, save_raw_cache};
use super::provider::fetch_raw;

const COMMISSION_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Keys tried, in order, when the table is an array of rows.
const ROW_ACCOUNT_KEYS: &[&str] = &["uc", "UC"];
const ROW_PERCENT_KEYS: &[&str] = &["percentual", "porcentagem", "percentage", "comissao"];

/// Per-account commission percentages.
#[derive(Debug, Default)]
pub(crate) struct CommissionTable {
    rates: HashMap<String, f64>,
}

/// Accepts `{"<uc>": pct, ...}` or `[{"uc": ..., "percentual": ...}, ...]`.
fn normalize_document(document: Value) -> Option<HashMap<String, Value>> {
    match document {
        Value::Object(map) => Some(map.into_iter().collect()),
        Value::Array(rows) => Some(
            rows.into_iter()
                .filter_map(|row| {
                    let uc = ROW_ACCOUNT_KEYS.iter().find_map(|k| match row.get(*k)? {
                        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })?;
                    let pct = ROW_PERCENT_KEYS.iter().find_map(|k| row.get(*k).cloned())?;
                    Some((uc, pct))
                })
                .collect(),
        ),
        _ => None,
    }
}

impl CommissionTable {
    fn from_raw_data(data: &HashMap<String, Value>) -> Self {
        let rates = data
            .iter()
            .filter(|(_, value)| matches!(value, Value::Number(_) | Value::String(_)))
            .map(|(uc, value)| (uc.trim().to_string(), parse_number(value)))
            .collect();
        Self { rates }
    }

    pub(crate) fn len(&self) -> usize {
        self.rates.len()
    }

    /// `location` is a local JSON path or an http(s) URL. Remote tables are
    /// cached for a day; a failed fetch falls back to the stale cache.
    pub(crate) fn load(location: Option<&str>, offline: bool, timeout: Duration) -> Self {
        let Some(location) = location.map(str::trim).filter(|l| !l.is_empty()) else {
            log::info!("No commission table configured; every percentage is 0");
            return Self::default();
        };

        if !(location.starts_with("http://") || location.starts_with("https://")) {
            return Self::load_file(Path::new(location));
        }

        let start = Instant::now();
        if offline {
            return match load_raw_cache() {
                Some(raw) => Self::from_raw_data(&raw),
                None => {
                    log::warn!("Offline and no cached commission table");
                    Self::default()
                }
            };
        }

        if let Some((raw, age)) = load_raw_cache_if_fresh(COMMISSION_CACHE_TTL) {
            log::info!("Using cached commission table ({:.1}h old)", age.as_secs_f64() / 3600.0);
            return Self::from_raw_data(&raw);
        }

        if let Some(raw) = fetch_raw(location, timeout).and_then(normalize_document) {
            save_raw_cache(&raw);
            let table = Self::from_raw_data(&raw);
            log::info!(
                "Fetched {} commission rates ({:.2}ms)",
                table.len(),
                start.elapsed().as_secs_f64() * 1000.0
            );
            return table;
        }

        match load_raw_cache() {
            Some(raw) => {
                log::warn!("Commission table fetch failed; using stale cache");
                Self::from_raw_data(&raw)
            }
            None => {
                log::warn!("Commission table fetch failed and nothing is cached");
                Self::default()
            }
        }
    }

    fn load_file(path: &Path) -> Self {
        let document = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str::<Value>(&content).map_err(|e| e.to_string()));
        match document.map(normalize_document) {
            Ok(Some(raw)) => Self::from_raw_data(&raw),
            Ok(None) => {
                log::warn!("{} is neither an object nor an array", path.display());
                Self::default()
            }
            Err(e) => {
                log::warn!("Cannot read commission table {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

impl CommissionLookup for CommissionTable {
    fn percentage(&self, uc: &str) -> Option<f64> {
        self.rates.get(uc.trim()).copied()
    }
}
