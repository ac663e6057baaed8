//! `routekeeper history` — list the retained backups, oldest first.

use console::style;

use crate::cli::{HistoryArgs, OutputFormat};
use crate::config::ConfigStore;
use crate::error::GatewayError;

pub async fn execute(args: &HistoryArgs) -> Result<(), GatewayError> {
    let store = ConfigStore::open(args.store.settings()).await?;
    let entries = store.history().await?;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No backups in {}", store.backups().dir().display());
                return Ok(());
            }
            let header = format!(
                "{:>8}  {:<25}  {:<16}  {:>8}  SHA-256",
                "REVISION", "BACKED UP", "MODIFIED BY", "BYTES"
            );
            println!("{}", style(header).bold());
            for entry in &entries {
                println!(
                    "{:>8}  {:<25}  {:<16}  {:>8}  {}",
                    entry.revision,
                    entry.backed_up_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                    entry.modified_by,
                    entry.size_bytes,
                    &entry.sha256[..entry.sha256.len().min(12)]
                );
            }
        }
    }
    Ok(())
}
