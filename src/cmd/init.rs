//! `routekeeper init` — create the routing document and its schema.
//!
//! Writes the default schema beside the document, then opens the store,
//! which synthesizes and persists the revision-1 document when none
//! exists yet. An existing document is left untouched.

use crate::cli::InitArgs;
use crate::config::persist::write_atomic;
use crate::config::schema::DEFAULT_SCHEMA;
use crate::config::ConfigStore;
use crate::error::GatewayError;

pub async fn execute(args: &InitArgs) -> Result<(), GatewayError> {
    let settings = args.store.settings();

    if settings.schema_path.exists() && !args.force {
        return Err(GatewayError::FileExists {
            path: settings.schema_path,
        });
    }

    if let Some(parent) = settings.schema_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    write_atomic(&settings.schema_path, DEFAULT_SCHEMA.as_bytes()).await?;
    println!("Created {}", settings.schema_path.display());

    let existed = settings.document_path.exists();
    let store = ConfigStore::open(settings).await?;
    let doc = store.get().await;

    if existed {
        println!(
            "Kept {} (revision {})",
            store.path().display(),
            doc.revision()
        );
    } else {
        println!("Created {} (revision {})", store.path().display(), doc.revision());
    }
    Ok(())
}
