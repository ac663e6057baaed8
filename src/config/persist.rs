//! Crash-safe file replacement.
//!
//! Content is written to a sibling `<name>.tmp`, flushed to disk, and
//! renamed over the target. `rename(2)` is atomic on the same
//! filesystem, so readers see either the old file or the new one, never
//! a partial write. On failure the temp file is removed best-effort. The
//! parent directory is synced after the rename so the new entry survives
//! a crash; that step is best-effort too.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::GatewayError;

#[must_use]
pub fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

pub async fn write_atomic(target: &Path, content: &[u8]) -> Result<(), GatewayError> {
    let temp_path = temp_path_for(target);

    if let Err(e) = write_synced(&temp_path, content).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(GatewayError::persistence(&temp_path, e));
    }

    if let Err(e) = tokio::fs::rename(&temp_path, target).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(GatewayError::persistence(target, e));
    }

    if let Err(e) = sync_parent(target).await {
        tracing::debug!(path = %target.display(), error = %e, "parent directory sync failed");
    }

    Ok(())
}

async fn sync_parent(target: &Path) -> std::io::Result<()> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    tokio::fs::File::open(parent).await?.sync_all().await
}

async fn write_synced(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(content).await?;
    file.sync_all().await
}
