//! Local JSON exports of the billing and CRM views
//!
//! Files named `billing*.json` and `crm*.json` in one directory. Each holds
//! an array of row objects (a single object counts as one row). Files are read
//! in parallel and concatenated in file-name order.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rayon::prelude::*;
use serde_json::Value;

use crate::core::{RawRecord, RawSnapshot};
use crate::error::SourceError;

use super::SnapshotSource;

const BILLING_PATTERN: &str = "billing*.json";
const CRM_PATTERN: &str = "crm*.json";

pub(crate) struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn find_files(&self, pattern: &str) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if let Ok(entries) = glob::glob(&format!("{}/{}", self.dir.display(), pattern)) {
            for entry in entries.flatten() {
                files.push(entry);
            }
        }
        files.sort();
        files
    }

    fn read_all(files: &[PathBuf]) -> Result<Vec<RawRecord>, SourceError> {
        let parsed: Vec<Vec<RawRecord>> = files
            .par_iter()
            .map(|path| parse_file(path))
            .collect::<Result<_, _>>()?;
        Ok(parsed.into_iter().flatten().collect())
    }
}

fn parse_file(path: &Path) -> Result<Vec<RawRecord>, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_error = |message: String| SourceError::Parse {
        origin: path.display().to_string(),
        message,
    };
    match serde_json::from_str::<Value>(&content).map_err(|e| parse_error(e.to_string()))? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                other => {
                    log::warn!("{}: skipping non-object row {}", path.display(), other);
                    None
                }
            })
            .collect()),
        Value::Object(row) => Ok(vec![row]),
        _ => Err(parse_error("expected an array of objects".to_string())),
    }
}

impl SnapshotSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn cacheable(&self) -> bool {
        false
    }

    fn fetch_snapshot(&self) -> Result<RawSnapshot, SourceError> {
        let billing_files = self.find_files(BILLING_PATTERN);
        let crm_files = self.find_files(CRM_PATTERN);
        if billing_files.is_empty() && crm_files.is_empty() {
            return Err(SourceError::NoData {
                path: self.dir.clone(),
            });
        }
        log::info!(
            "Reading {} billing and {} CRM export files from {}",
            billing_files.len(),
            crm_files.len(),
            self.dir.display()
        );
        Ok(RawSnapshot {
            billing: Self::read_all(&billing_files)?,
            crm: Self::read_all(&crm_files)?,
            fetched_at: Some(Utc::now()),
        })
    }
}
