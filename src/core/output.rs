use crate::utils::error::Result;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub const FILE_PREFIX: &str = "equation";

pub fn timestamped_path(dir: &Path, extension: &str) -> PathBuf {
    timestamped_path_at(dir, extension, Local::now())
}

/// `equation_<YYYYmmdd_HHMMSS>.<ext>`, with `_1`, `_2`, ... appended when an
/// export from the same second already exists.
pub fn timestamped_path_at(dir: &Path, extension: &str, now: DateTime<Local>) -> PathBuf {
    let stem = format!("{}_{}", FILE_PREFIX, now.format("%Y%m%d_%H%M%S"));
    let mut candidate = dir.join(format!("{}.{}", stem, extension));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}_{}.{}", stem, counter, extension));
        counter += 1;
    }
    candidate
}

/// Rename, falling back to copy + delete when the temp dir sits on another
/// filesystem.
pub async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await?;
    Ok(())
}
