//! `routekeeper check-upstream` — check that a device answers HTTP
//! before routing traffic to it.

use crate::cli::CheckUpstreamArgs;
use crate::error::GatewayError;
use crate::sync::SyncClient;

pub async fn execute(args: &CheckUpstreamArgs) -> Result<(), GatewayError> {
    let client = SyncClient::new(&args.engine.settings())?;
    let report = client.test_upstream(args.address).await?;
    println!(
        "{} answered {} in {}ms",
        report.address, report.status, report.latency_ms
    );
    Ok(())
}
