//! Routekeeper keeps the routing configuration of a domain-fronting
//! gateway.
//!
//! A single JSON routing document maps domains and URL paths to backend
//! devices. Routekeeper stores it with atomic, schema-checked writes and a
//! bounded set of numbered backups, compiles it into the proxy engine's
//! route table, and pushes that table to the engine's admin endpoint.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (init, validate, compile,
//!   apply, deploy, rollback, history, certs, check-upstream).
//! - [`config`] -- The routing document model and the versioned
//!   [`ConfigStore`](config::ConfigStore) with its schema check and backups.
//! - [`compiler`] -- Pure translation of a document into an engine route
//!   table.
//! - [`sync`] -- Bounded-concurrency push of a route table to the engine,
//!   plus certificate listing and device reachability checks.
//! - [`deploy`] -- Snapshot, compile and push, without holding store locks
//!   across network I/O.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod compiler;
pub mod config;
pub mod deploy;
pub mod error;
pub mod logging;
pub mod sync;
