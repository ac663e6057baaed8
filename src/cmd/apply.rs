//! `routekeeper apply` — save a staged document as the next revision.
//!
//! The staged file is value-validated before the store sees it. Its own
//! `metadata.revision` and `metadata.modified` are ignored; the store
//! assigns both.

use crate::cli::ApplyArgs;
use crate::config::model::RoutingDocument;
use crate::config::{validation, ConfigStore};
use crate::error::GatewayError;

pub async fn execute(args: &ApplyArgs) -> Result<(), GatewayError> {
    let bytes = match tokio::fs::read(&args.file).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(GatewayError::ConfigFileNotFound {
                path: args.file.clone(),
            });
        }
        Err(e) => return Err(GatewayError::Io(e)),
    };

    let mut doc: RoutingDocument =
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::CorruptDocument {
            path: args.file.clone(),
            source: e,
        })?;

    validation::validate(&doc).map_err(|errors| GatewayError::ConfigValidation { errors })?;
    for warning in validation::warnings(&doc) {
        tracing::warn!(file = %args.file.display(), "{warning}");
    }

    if let Some(by) = &args.by {
        doc.metadata.modified_by.clone_from(by);
    }

    let store = ConfigStore::open(args.store.settings()).await?;
    let saved = store.save(doc).await?;
    println!(
        "Saved {} as revision {}",
        store.path().display(),
        saved.revision()
    );

    if args.deploy {
        super::deploy::push(&store, &args.engine).await?;
    }
    Ok(())
}
