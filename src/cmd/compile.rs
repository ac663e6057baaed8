//! `routekeeper compile` — print the engine route table for the active
//! document without contacting the engine.

use crate::cli::CompileArgs;
use crate::compiler;
use crate::config::ConfigStore;
use crate::error::GatewayError;

pub async fn execute(args: &CompileArgs) -> Result<(), GatewayError> {
    let store = ConfigStore::open(args.store.settings()).await?;
    let doc = store.get().await;
    let table = compiler::compile(&doc);

    let rendered = if args.routes_only {
        serde_json::to_string_pretty(&table.routes)?
    } else {
        serde_json::to_string_pretty(&table.to_engine_config())?
    };
    println!("{rendered}");
    Ok(())
}
