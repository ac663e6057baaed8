//! Snapshot, compile, push.
//!
//! [`deploy`] copies the active document out of the store before doing
//! any network I/O, so a slow or unreachable engine never holds up the
//! next `save` or `rollback`. A failed push leaves local state untouched.

use crate::compiler;
use crate::config::ConfigStore;
use crate::error::GatewayError;
use crate::sync::SyncClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub revision: u64,
    pub proxy_rules: usize,
    pub deny_rules: usize,
    pub correlation_id: String,
}

pub async fn deploy(store: &ConfigStore, client: &SyncClient) -> Result<DeployReport, GatewayError> {
    let snapshot = store.get().await;
    let table = compiler::compile(&snapshot);

    tracing::info!(
        revision = snapshot.revision(),
        proxy_rules = table.proxy_rules(),
        deny_rules = table.deny_rules(),
        engine = %client.load_uri(),
        "deploying route table"
    );

    let pushed = client.push(&table).await.inspect_err(|e| {
        tracing::error!(revision = snapshot.revision(), error = %e, "deploy failed");
    })?;

    Ok(DeployReport {
        revision: snapshot.revision(),
        proxy_rules: table.proxy_rules(),
        deny_rules: table.deny_rules(),
        correlation_id: pushed.correlation_id,
    })
}
