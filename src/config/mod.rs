//! Routing document persistence, validation, and versioning.
//!
//! [`ConfigStore`] owns the document on disk and in memory. Submodules
//! provide the data model, the schema check run on every write, the
//! write-time value validation used by the CLI, the backup set that
//! makes rollback possible, and the atomic file replacement they share.

pub mod backup;
pub mod model;
pub mod persist;
pub mod schema;
pub mod store;
pub mod validation;

pub use backup::{BackupManager, HistoryEntry};
pub use model::{Route, RoutingDocument};
pub use schema::SchemaValidator;
pub use store::{ConfigStore, StoreSettings};
