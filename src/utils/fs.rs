use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()
}

/// Write `value` to a sibling `.tmp` file and rename it over `path`.
/// On failure the previous contents of `path` are untouched.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let written = write_json(&tmp, value).and_then(|()| fs::rename(&tmp, path));
    if written.is_err()
        && let Err(e) = fs::remove_file(&tmp)
    {
        log::debug!("Cannot remove {}: {}", tmp.display(), e);
    }
    written
}
