//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands, and their argument structs. Every flag has an
//! environment variable equivalent for container deployments.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::store::{StoreSettings, DEFAULT_DOCUMENT_PATH};
use crate::sync::{
    SyncSettings, DEFAULT_ADMIN_URL, DEFAULT_MAX_IN_FLIGHT, DEFAULT_POOL_SIZE,
};

#[derive(Parser)]
#[command(
    name = "routekeeper",
    version,
    about = "Versioned routing configuration for a domain-fronting gateway",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        routekeeper init -c ./config.json         Create a document and schema\n  \
        routekeeper apply new.json --deploy       Save a document and push it\n  \
        routekeeper rollback 4 --deploy           Restore revision 4 and push it"
)]
pub struct Cli {
    #[command(flatten)]
    pub log: LogArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the routing document and its schema
    Init(InitArgs),

    /// Validate a routing document without saving it
    Validate(ValidateArgs),

    /// Print the engine route table for the active document
    Compile(CompileArgs),

    /// Save a document as the next revision
    Apply(ApplyArgs),

    /// Push the active document to the proxy engine
    Deploy(DeployArgs),

    /// Restore a backed-up revision
    Rollback(RollbackArgs),

    /// List backed-up revisions
    History(HistoryArgs),

    /// List the certificates the proxy engine manages
    Certs(CertsArgs),

    /// Check that a device answers HTTP
    CheckUpstream(CheckUpstreamArgs),
}

#[derive(Args)]
pub struct LogArgs {
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty", global = true)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct StoreArgs {
    /// Routing document path; schema and backups live beside it
    #[arg(short, long, env = "ROUTEKEEPER_CONFIG", default_value = DEFAULT_DOCUMENT_PATH)]
    pub config: PathBuf,
}

impl StoreArgs {
    #[must_use]
    pub fn settings(&self) -> StoreSettings {
        StoreSettings::for_document(&self.config)
    }
}

#[derive(Args, Clone)]
pub struct EngineArgs {
    /// Proxy engine admin endpoint
    #[arg(
        long,
        env = "ENGINE_ADMIN_URL",
        default_value = DEFAULT_ADMIN_URL,
        help_heading = "Proxy Engine"
    )]
    pub admin_url: String,

    /// Maximum simultaneous pushes
    #[arg(
        long,
        env = "SYNC_MAX_IN_FLIGHT",
        default_value_t = DEFAULT_MAX_IN_FLIGHT,
        help_heading = "Proxy Engine"
    )]
    pub max_in_flight: usize,

    /// Transport handles kept in the pool
    #[arg(
        long,
        env = "SYNC_POOL_SIZE",
        default_value_t = DEFAULT_POOL_SIZE,
        help_heading = "Proxy Engine"
    )]
    pub pool_size: usize,

    /// Push timeout in milliseconds
    #[arg(
        long,
        env = "SYNC_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        help_heading = "Proxy Engine"
    )]
    pub request_timeout_ms: u64,

    /// Give up waiting for a push slot after this many milliseconds (default: wait)
    #[arg(long, env = "SYNC_ACQUIRE_TIMEOUT_MS", help_heading = "Proxy Engine")]
    pub acquire_timeout_ms: Option<u64>,
}

impl EngineArgs {
    #[must_use]
    pub fn settings(&self) -> SyncSettings {
        SyncSettings {
            admin_url: self.admin_url.clone(),
            max_in_flight: self.max_in_flight,
            pool_size: self.pool_size,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            acquire_timeout: self.acquire_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Args)]
pub struct InitArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Overwrite an existing schema file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Document to validate
    pub file: PathBuf,

    /// Schema to validate against (default: the one beside the file)
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct CompileArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Print only the routes, without the engine envelope
    #[arg(long)]
    pub routes_only: bool,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        routekeeper apply staged.json                     Save as the next revision\n  \
        routekeeper apply staged.json --by alice --deploy Save, record author, push")]
pub struct ApplyArgs {
    /// Document to save (its revision is ignored)
    pub file: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Recorded as metadata.modifiedBy
    #[arg(long, env = "ROUTEKEEPER_USER")]
    pub by: Option<String>,

    /// Push to the proxy engine after saving
    #[arg(long)]
    pub deploy: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Args)]
pub struct RollbackArgs {
    /// Revision to restore
    pub revision: u64,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Push to the proxy engine after restoring
    #[arg(long)]
    pub deploy: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Args)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct CertsArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct CheckUpstreamArgs {
    /// Device address as ip:port
    pub address: SocketAddr,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_defaults_wait_indefinitely() {
        let cli = Cli::parse_from(["routekeeper", "deploy"]);
        let Some(Commands::Deploy(args)) = cli.command else {
            panic!("expected deploy");
        };
        let settings = args.engine.settings();
        assert_eq!(settings.admin_url, DEFAULT_ADMIN_URL);
        assert_eq!(settings.max_in_flight, 10);
        assert_eq!(settings.pool_size, 20);
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
        assert_eq!(settings.acquire_timeout, None);
        assert_eq!(args.store.config, PathBuf::from(DEFAULT_DOCUMENT_PATH));
    }

    #[test]
    fn rollback_parses_revision_and_flags() {
        let cli = Cli::parse_from([
            "routekeeper",
            "rollback",
            "4",
            "-c",
            "/tmp/gw/config.json",
            "--deploy",
            "--acquire-timeout-ms",
            "250",
        ]);
        let Some(Commands::Rollback(args)) = cli.command else {
            panic!("expected rollback");
        };
        assert_eq!(args.revision, 4);
        assert!(args.deploy);
        assert_eq!(
            args.engine.settings().acquire_timeout,
            Some(Duration::from_millis(250))
        );
        assert_eq!(
            args.store.settings().backup_dir,
            PathBuf::from("/tmp/gw/backups")
        );
    }

    #[test]
    fn check_upstream_parses_socket_address() {
        let cli = Cli::parse_from(["routekeeper", "check-upstream", "[fd00::5]:8080"]);
        let Some(Commands::CheckUpstream(args)) = cli.command else {
            panic!("expected check-upstream");
        };
        assert_eq!(args.address, "[fd00::5]:8080".parse().unwrap());
    }

    #[test]
    fn check_upstream_rejects_bare_ip() {
        assert!(Cli::try_parse_from(["routekeeper", "check-upstream", "10.0.0.5"]).is_err());
    }
}
