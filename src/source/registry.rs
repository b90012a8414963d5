//! Data source registry
//!
//! Maps `--source` names and aliases to constructors.

use std::path::PathBuf;

use crate::error::{AppError, SourceError};

use super::file::FileSource;
use super::supabase::SupabaseSource;
use super::{BoxedSource, SourceSettings};

struct SourceEntry {
    name: &'static str,
    aliases: &'static [&'static str],
    build: fn(&SourceSettings) -> Result<BoxedSource, SourceError>,
}

fn build_supabase(settings: &SourceSettings) -> Result<BoxedSource, SourceError> {
    Ok(Box::new(SupabaseSource::new(settings)?))
}

fn build_file(settings: &SourceSettings) -> Result<BoxedSource, SourceError> {
    let dir = settings
        .data_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(Box::new(FileSource::new(dir)))
}

/// All registered data sources
static SOURCES: &[SourceEntry] = &[
    SourceEntry {
        name: "supabase",
        aliases: &["sb", "remote"],
        build: build_supabase,
    },
    SourceEntry {
        name: "file",
        aliases: &["files", "local"],
        build: build_file,
    },
];

pub(crate) fn source_names() -> Vec<&'static str> {
    SOURCES.iter().map(|s| s.name).collect()
}

/// Build a source by name or alias
pub(crate) fn build_source(name: &str, settings: &SourceSettings) -> Result<BoxedSource, AppError> {
    let name_lower = name.trim().to_lowercase();
    let entry = SOURCES
        .iter()
        .find(|s| s.name == name_lower || s.aliases.contains(&name_lower.as_str()))
        .ok_or_else(|| AppError::UnknownSource {
            name: name.to_string(),
            known: source_names().join(", "),
        })?;
    Ok((entry.build)(settings)?)
}
