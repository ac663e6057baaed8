//! Pre-mutation snapshots of the active document.
//!
//! Backups are byte-identical copies stored as
//! `<dir>/backups/config_v<revision>.json`, keyed by the revision that
//! was active when the copy was taken. Only the newest
//! [`DEFAULT_RETENTION`] revisions are kept; eviction is ordered by
//! revision number, never by file modification time.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::model::{RoutingDocument, SYSTEM_USER};
use super::persist::write_atomic;
use crate::error::GatewayError;

pub const DEFAULT_RETENTION: usize = 5;
pub const BACKUP_DIR_NAME: &str = "backups";

const FILE_PREFIX: &str = "config_v";
const FILE_SUFFIX: &str = ".json";

#[must_use]
pub fn backup_file_name(revision: u64) -> String {
    format!("{FILE_PREFIX}{revision}{FILE_SUFFIX}")
}

/// Revision encoded in a backup file name, if it is one.
#[must_use]
pub fn parse_backup_file_name(name: &str) -> Option<u64> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse()
        .ok()
}

/// One row of `history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub revision: u64,
    pub backed_up_at: DateTime<Utc>,
    pub modified_by: String,
    pub size_bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
    keep: usize,
}

impl BackupManager {
    #[must_use]
    pub fn new(dir: PathBuf, keep: usize) -> Self {
        Self {
            dir,
            keep: keep.max(1),
        }
    }

    /// Manager for the `backups/` directory beside `document_path`.
    #[must_use]
    pub fn beside(document_path: &Path) -> Self {
        let parent = document_path.parent().unwrap_or_else(|| Path::new("."));
        Self::new(parent.join(BACKUP_DIR_NAME), DEFAULT_RETENTION)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, revision: u64) -> PathBuf {
        self.dir.join(backup_file_name(revision))
    }

    /// Copy `source` unchanged into the backup set under `revision`, then
    /// prune. Returns `None` when there is no file to back up.
    pub async fn snapshot(
        &self,
        source: &Path,
        revision: u64,
    ) -> Result<Option<PathBuf>, GatewayError> {
        let content = match tokio::fs::read(source).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(GatewayError::persistence(source, e)),
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| GatewayError::persistence(&self.dir, e))?;

        let target = self.path_for(revision);
        write_atomic(&target, &content).await?;
        tracing::debug!(revision, backup = %target.display(), "backup written");

        self.prune().await?;
        Ok(Some(target))
    }

    /// Delete everything but the newest `keep` revisions. Individual
    /// deletion failures are logged and skipped. Returns the evicted
    /// revisions, oldest first.
    pub async fn prune(&self) -> Result<Vec<u64>, GatewayError> {
        let revisions = self.revisions().await?;
        let excess = revisions.len().saturating_sub(self.keep);
        let mut evicted = Vec::with_capacity(excess);

        for revision in revisions.into_iter().take(excess) {
            let path = self.path_for(revision);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => evicted.push(revision),
                Err(e) => {
                    tracing::warn!(
                        revision,
                        backup = %path.display(),
                        error = %e,
                        "failed to delete old backup"
                    );
                }
            }
        }

        if !evicted.is_empty() {
            tracing::debug!(evicted = ?evicted, "old backups pruned");
        }
        Ok(evicted)
    }

    /// Revisions present in the backup directory, ascending.
    pub async fn revisions(&self) -> Result<Vec<u64>, GatewayError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(GatewayError::persistence(&self.dir, e)),
        };

        let mut revisions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| GatewayError::persistence(&self.dir, e))?
        {
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if !is_file {
                continue;
            }
            if let Some(revision) = entry.file_name().to_str().and_then(parse_backup_file_name) {
                revisions.push(revision);
            }
        }

        revisions.sort_unstable();
        Ok(revisions)
    }

    /// Raw bytes of the backup for `revision`.
    pub async fn read(&self, revision: u64) -> Result<Vec<u8>, GatewayError> {
        let path = self.path_for(revision);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(GatewayError::BackupNotFound { revision })
            }
            Err(e) => Err(GatewayError::persistence(path, e)),
        }
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>, GatewayError> {
        let mut history = Vec::new();

        for revision in self.revisions().await? {
            let path = self.path_for(revision);
            // A concurrent prune may remove a file between listing and reading.
            let (meta, bytes) = match (
                tokio::fs::metadata(&path).await,
                tokio::fs::read(&path).await,
            ) {
                (Ok(meta), Ok(bytes)) => (meta, bytes),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::debug!(revision, error = %e, "backup vanished while listing");
                    continue;
                }
            };

            let backed_up_at = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            let modified_by = serde_json::from_slice::<RoutingDocument>(&bytes)
                .map_or_else(|_| SYSTEM_USER.to_string(), |doc| doc.metadata.modified_by);

            history.push(HistoryEntry {
                revision,
                backed_up_at,
                modified_by,
                size_bytes: meta.len(),
                sha256: format!("{:x}", Sha256::digest(&bytes)),
            });
        }

        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_round_trip() {
        assert_eq!(backup_file_name(12), "config_v12.json");
        assert_eq!(parse_backup_file_name("config_v12.json"), Some(12));
        assert_eq!(parse_backup_file_name("config_v12.json.tmp"), None);
        assert_eq!(parse_backup_file_name("notes.json"), None);
    }

    #[tokio::test]
    async fn snapshot_without_source_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::beside(&dir.path().join("config.json"));
        let result = manager
            .snapshot(&dir.path().join("config.json"), 1)
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(!manager.dir().exists());
    }

    #[tokio::test]
    async fn snapshot_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("config.json");
        std::fs::write(&source, b"{\"exact\":  \"bytes\"}\n").unwrap();

        let manager = BackupManager::beside(&source);
        let written = manager.snapshot(&source, 3).await.unwrap().unwrap();

        assert_eq!(written, dir.path().join("backups").join("config_v3.json"));
        assert_eq!(std::fs::read(written).unwrap(), std::fs::read(&source).unwrap());
    }

    #[tokio::test]
    async fn prune_evicts_by_revision_not_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("config.json");
        std::fs::write(&source, b"{}").unwrap();
        let manager = BackupManager::beside(&source);

        // Write high revisions first so the low ones carry the newest mtimes.
        for revision in [10, 9, 8, 7, 6, 2, 1] {
            manager.snapshot(&source, revision).await.unwrap();
        }

        assert_eq!(manager.revisions().await.unwrap(), vec![6, 7, 8, 9, 10]);
    }

    #[tokio::test]
    async fn read_missing_revision_is_backup_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::beside(&dir.path().join("config.json"));
        let err = manager.read(42).await.unwrap_err();
        assert!(matches!(err, GatewayError::BackupNotFound { revision: 42 }));
    }

    #[tokio::test]
    async fn history_reports_digest_and_author() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("config.json");
        let mut doc = RoutingDocument::initial(Utc::now());
        doc.metadata.modified_by = "operator".into();
        let bytes = serde_json::to_vec_pretty(&doc).unwrap();
        std::fs::write(&source, &bytes).unwrap();

        let manager = BackupManager::beside(&source);
        manager.snapshot(&source, 1).await.unwrap();

        let history = manager.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].revision, 1);
        assert_eq!(history[0].modified_by, "operator");
        assert_eq!(history[0].size_bytes, bytes.len() as u64);
        assert_eq!(history[0].sha256, format!("{:x}", Sha256::digest(&bytes)));
    }
}
