//! Unified error types for routekeeper.
//!
//! [`GatewayError`] carries the store, compiler and sync failure taxonomy.
//! [`ValidationError`] describes a single write-time value problem found
//! by [`config::validation`](crate::config::validation). Messages include
//! contextual hints to guide the operator toward a fix.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub scope: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  {}: {}: {}", self.scope, self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

fn format_messages(messages: &[String]) -> String {
    messages
        .iter()
        .map(|m| format!("  {m}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// The candidate bytes are not JSON or do not satisfy the schema.
    #[error("Schema violation in {source_label}:\n{}", format_messages(.errors))]
    SchemaViolation {
        source_label: String,
        errors: Vec<String>,
    },

    #[error("No backup found for revision {revision}.\n\n  Run 'routekeeper history' to list the available revisions.")]
    BackupNotFound { revision: u64 },

    #[error("Failed to persist {}: {source}", path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes passed schema validation but could not be decoded.
    #[error("Corrupt document {}: {source}", path.display())]
    CorruptDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Proxy engine unreachable at {url}: {source}")]
    SyncUnreachable {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Proxy engine rejected the route table with status {status}: {body}")]
    SyncRejected { status: hyper::StatusCode, body: String },

    #[error("Proxy engine at {url} returned a response that could not be decoded: {source}")]
    SyncMalformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No sync slot became available within {waited_ms}ms")]
    SyncSaturated { waited_ms: u64 },

    #[error("Failed to encode route table: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("File already exists: {} (use --force to overwrite)", path.display())]
    FileExists { path: PathBuf },

    #[error("Invalid admin URL '{url}': {reason}")]
    InvalidAdminUrl { url: String, reason: String },

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PersistenceFailure {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_renders_suggestion() {
        let err = ValidationError {
            scope: "a.example".into(),
            field: "subnet".into(),
            message: "'10.0.0.0' is not a CIDR block".into(),
            suggestion: Some("did you mean '10.0.0.0/24'?".into()),
        };
        assert_eq!(
            err.to_string(),
            "  a.example: subnet: '10.0.0.0' is not a CIDR block (did you mean '10.0.0.0/24'?)"
        );
    }

    #[test]
    fn schema_violation_lists_every_message() {
        let err = GatewayError::SchemaViolation {
            source_label: "config.json".into(),
            errors: vec!["first".into(), "second".into()],
        };
        let text = err.to_string();
        assert!(text.contains("  first\n  second"));
    }
}
