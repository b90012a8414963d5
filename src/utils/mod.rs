pub(crate) mod date;
pub(crate) mod fs;
pub(crate) mod timezone;

use std::path::PathBuf;

pub(crate) use date::{parse_date, parse_flexible_date};
pub(crate) use fs::write_json_atomic;
pub(crate) use timezone::Timezone;

/// `~/.cache/enstats`, shared by the snapshot and commission caches
pub(crate) fn cache_dir() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".cache").join("enstats"))
}
