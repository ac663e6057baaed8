//! `routekeeper deploy` — push the active document to the proxy engine.

use crate::cli::{DeployArgs, EngineArgs};
use crate::config::ConfigStore;
use crate::deploy;
use crate::error::GatewayError;
use crate::sync::SyncClient;

pub async fn execute(args: &DeployArgs) -> Result<(), GatewayError> {
    let store = ConfigStore::open(args.store.settings()).await?;
    push(&store, &args.engine).await
}

/// Shared by `apply --deploy` and `rollback --deploy`.
pub(crate) async fn push(store: &ConfigStore, engine: &EngineArgs) -> Result<(), GatewayError> {
    let client = SyncClient::new(&engine.settings())?;
    let report = deploy::deploy(store, &client).await?;
    println!(
        "Deployed revision {} to {} ({} proxy, {} deny rules, correlation id {})",
        report.revision,
        client.load_uri(),
        report.proxy_rules,
        report.deny_rules,
        report.correlation_id
    );
    Ok(())
}
