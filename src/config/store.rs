//! The configuration store: sole owner of the routing document.
//!
//! [`ConfigStore`] keeps the active [`RoutingDocument`] in memory and on
//! disk. Callers only ever receive copies (via [`ConfigStore::get`]) and
//! hand back whole documents through [`ConfigStore::save`]; there is no
//! partial update.
//!
//! # Locking
//!
//! `load`, `save` and `rollback` serialize on a single write gate that
//! covers the document file and the backup directory. The in-memory
//! snapshot sits behind an `RwLock` that a mutation write-locks only for
//! the final pointer swap, so `get` runs concurrently with other readers
//! and with the disk I/O of an in-flight mutation, and never observes a
//! half-applied document. No network I/O ever happens under either lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use super::backup::{BackupManager, HistoryEntry, BACKUP_DIR_NAME, DEFAULT_RETENTION};
use super::model::RoutingDocument;
use super::persist::write_atomic;
use super::schema::{SchemaValidator, SCHEMA_FILE_NAME};
use crate::error::GatewayError;

pub const DEFAULT_DOCUMENT_PATH: &str = "/etc/routekeeper/config.json";

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub document_path: PathBuf,
    pub schema_path: PathBuf,
    pub backup_dir: PathBuf,
    pub retention: usize,
}

impl StoreSettings {
    /// Settings with the schema and backup directory beside the document.
    #[must_use]
    pub fn for_document(document_path: impl Into<PathBuf>) -> Self {
        let document_path = document_path.into();
        let dir = document_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self {
            schema_path: dir.join(SCHEMA_FILE_NAME),
            backup_dir: dir.join(BACKUP_DIR_NAME),
            retention: DEFAULT_RETENTION,
            document_path,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::for_document(DEFAULT_DOCUMENT_PATH)
    }
}

pub struct ConfigStore {
    path: PathBuf,
    schema: SchemaValidator,
    backups: BackupManager,
    current: RwLock<Arc<RoutingDocument>>,
    write_gate: Mutex<()>,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("path", &self.path)
            .field("schema", &self.schema.schema_path())
            .field("backups", &self.backups.dir())
            .finish_non_exhaustive()
    }
}

impl ConfigStore {
    /// Open the store, loading the document or creating the default one.
    pub async fn open(settings: StoreSettings) -> Result<Self, GatewayError> {
        let schema = SchemaValidator::new(settings.schema_path);
        let backups = BackupManager::new(settings.backup_dir, settings.retention);
        let document = read_or_init(&settings.document_path, &schema).await?;

        Ok(Self {
            path: settings.document_path,
            schema,
            backups,
            current: RwLock::new(Arc::new(document)),
            write_gate: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Re-read the document from disk, replacing the in-memory copy.
    pub async fn load(&self) -> Result<(), GatewayError> {
        let _gate = self.write_gate.lock().await;
        self.load_locked().await
    }

    /// A deep copy of the active document.
    pub async fn get(&self) -> RoutingDocument {
        let current = Arc::clone(&*self.current.read().await);
        (*current).clone()
    }

    pub async fn revision(&self) -> u64 {
        self.current.read().await.revision()
    }

    /// Persist `doc` as the next revision and make it active.
    ///
    /// The revision in `doc` is ignored: the saved document always gets
    /// the previous in-memory revision plus one. Returns the document as
    /// written.
    pub async fn save(&self, mut doc: RoutingDocument) -> Result<RoutingDocument, GatewayError> {
        let _gate = self.write_gate.lock().await;
        let previous = self.revision().await;

        self.backup_best_effort(previous).await;

        doc.metadata.modified_at = Utc::now();
        doc.metadata.revision = previous + 1;

        let bytes = encode(&doc, &self.path)?;
        self.schema.check(&bytes, &self.label()).await?;
        write_atomic(&self.path, &bytes).await?;

        *self.current.write().await = Arc::new(doc.clone());

        tracing::info!(
            revision = doc.metadata.revision,
            modified_by = %doc.metadata.modified_by,
            domains = doc.domains.len(),
            routes = doc.total_routes(),
            "routing document saved"
        );
        Ok(doc)
    }

    /// Restore the backup taken at `revision` and make it active.
    ///
    /// The restored document keeps its recorded revision; the counter
    /// moves again on the next `save`.
    pub async fn rollback(&self, revision: u64) -> Result<RoutingDocument, GatewayError> {
        let _gate = self.write_gate.lock().await;

        let bytes = self.backups.read(revision).await?;
        let backup_label = self.backups.path_for(revision).display().to_string();
        self.schema.check(&bytes, &backup_label).await?;
        serde_json::from_slice::<RoutingDocument>(&bytes).map_err(|e| {
            GatewayError::CorruptDocument {
                path: self.backups.path_for(revision),
                source: e,
            }
        })?;

        let active = self.revision().await;
        self.backup_best_effort(active).await;

        write_atomic(&self.path, &bytes).await?;
        self.load_locked().await?;

        let restored = self.get().await;
        tracing::info!(
            from_revision = active,
            to_revision = restored.revision(),
            "routing document rolled back"
        );
        Ok(restored)
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>, GatewayError> {
        self.backups.history().await
    }

    async fn load_locked(&self) -> Result<(), GatewayError> {
        let document = read_or_init(&self.path, &self.schema).await?;
        *self.current.write().await = Arc::new(document);
        Ok(())
    }

    async fn backup_best_effort(&self, revision: u64) {
        if let Err(e) = self.backups.snapshot(&self.path, revision).await {
            tracing::warn!(revision, error = %e, "backup failed, continuing without it");
        }
    }

    fn label(&self) -> String {
        self.path.display().to_string()
    }
}

fn encode(doc: &RoutingDocument, path: &Path) -> Result<Vec<u8>, GatewayError> {
    let mut bytes = serde_json::to_vec_pretty(doc)
        .map_err(|e| GatewayError::persistence(path, std::io::Error::other(e)))?;
    bytes.push(b'\n');
    Ok(bytes)
}

async fn read_or_init(
    path: &Path,
    schema: &SchemaValidator,
) -> Result<RoutingDocument, GatewayError> {
    let label = path.display().to_string();

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return create_default(path, schema).await;
        }
        Err(e) => return Err(GatewayError::persistence(path, e)),
    };

    schema.check(&bytes, &label).await?;

    let document: RoutingDocument =
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::CorruptDocument {
            path: path.to_path_buf(),
            source: e,
        })?;

    tracing::info!(
        path = %label,
        revision = document.revision(),
        routes = document.total_routes(),
        "routing document loaded"
    );
    Ok(document)
}

async fn create_default(
    path: &Path,
    schema: &SchemaValidator,
) -> Result<RoutingDocument, GatewayError> {
    tracing::info!(path = %path.display(), "no routing document found, creating default");

    let document = RoutingDocument::initial(Utc::now());
    let bytes = encode(&document, path)?;
    schema.check(&bytes, &path.display().to_string()).await?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| GatewayError::persistence(parent, e))?;
    }
    write_atomic(path, &bytes).await?;
    Ok(document)
}
