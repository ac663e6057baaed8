//! `routekeeper rollback` — restore a backed-up revision.

use crate::cli::RollbackArgs;
use crate::config::ConfigStore;
use crate::error::GatewayError;

pub async fn execute(args: &RollbackArgs) -> Result<(), GatewayError> {
    let store = ConfigStore::open(args.store.settings()).await?;
    let previous = store.revision().await;
    let restored = store.rollback(args.revision).await?;
    println!(
        "Rolled back {} from revision {previous} to revision {}",
        store.path().display(),
        restored.revision()
    );

    if args.deploy {
        super::deploy::push(&store, &args.engine).await?;
    }
    Ok(())
}
