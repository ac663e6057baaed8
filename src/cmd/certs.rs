//! `routekeeper certs` — list the certificates the proxy engine manages.

use console::style;

use crate::cli::{CertsArgs, OutputFormat};
use crate::error::GatewayError;
use crate::sync::SyncClient;

pub async fn execute(args: &CertsArgs) -> Result<(), GatewayError> {
    let client = SyncClient::new(&args.engine.settings())?;
    let certificates = client.certificates().await?;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&certificates)?);
        }
        OutputFormat::Text => {
            if certificates.is_empty() {
                println!("The proxy engine manages no certificates");
                return Ok(());
            }
            let header = format!(
                "{:<32}  {:<20}  {:>9}  {:<10}  AUTO-RENEW",
                "ISSUER", "EXPIRES", "DAYS LEFT", "STATUS"
            );
            println!("{}", style(header).bold());
            let now = chrono::Utc::now();
            for cert in &certificates {
                println!(
                    "{:<32}  {:<20}  {:>9}  {:<10}  {}",
                    cert.issuer,
                    cert.not_after.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                    cert.days_left(now),
                    cert.status,
                    if cert.auto_renew { "yes" } else { "no" }
                );
            }
        }
    }
    Ok(())
}
