//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function initializes logging and routes the parsed
//! CLI to the matching handler. Each handler lives in its own submodule.

pub mod apply;
pub mod certs;
pub mod check_upstream;
pub mod compile;
pub mod deploy;
pub mod history;
pub mod init;
pub mod rollback;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::GatewayError;
use crate::logging;

pub async fn dispatch(cli: Cli) -> Result<(), GatewayError> {
    let Some(command) = cli.command else {
        print_welcome();
        return Ok(());
    };

    logging::init(
        &cli.log.log_level,
        logging::resolve_format(cli.log.pretty, cli.log.json),
    );

    match command {
        Commands::Init(ref args) => init::execute(args).await,
        Commands::Validate(ref args) => validate::execute(args).await,
        Commands::Compile(ref args) => compile::execute(args).await,
        Commands::Apply(ref args) => apply::execute(args).await,
        Commands::Deploy(ref args) => deploy::execute(args).await,
        Commands::Rollback(ref args) => rollback::execute(args).await,
        Commands::History(ref args) => history::execute(args).await,
        Commands::Certs(ref args) => certs::execute(args).await,
        Commands::CheckUpstream(ref args) => check_upstream::execute(args).await,
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  routekeeper v{version} \u{2014} routing configuration for the gateway\n\n  \
         No command provided. To get started:\n\n    \
         routekeeper init -c ./config.json      Create a document and schema\n    \
         routekeeper compile -c ./config.json   Show the engine route table\n    \
         routekeeper --help                     See all commands and options\n"
    );
}
