//! JSON Schema check for candidate document bytes.
//!
//! The schema lives next to the document as `config.schema.json`. A
//! missing schema file is a soft failure: a warning is logged and the
//! bytes are accepted unchecked. Everything else that goes wrong here is
//! reported as [`GatewayError::SchemaViolation`].

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::GatewayError;

pub const SCHEMA_FILE_NAME: &str = "config.schema.json";

/// Schema describing the on-disk document layout, written by `init`.
pub const DEFAULT_SCHEMA: &str = include_str!("../../schema/config.schema.json");

#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema_path: PathBuf,
}

impl SchemaValidator {
    #[must_use]
    pub fn new(schema_path: PathBuf) -> Self {
        Self { schema_path }
    }

    /// Validator for the schema that sits beside `document_path`.
    #[must_use]
    pub fn beside(document_path: &Path) -> Self {
        let dir = document_path.parent().unwrap_or_else(|| Path::new("."));
        Self::new(dir.join(SCHEMA_FILE_NAME))
    }

    #[must_use]
    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    /// Check `bytes` against the schema file, re-reading it on every call.
    pub async fn check(&self, bytes: &[u8], source_label: &str) -> Result<(), GatewayError> {
        let schema_bytes = match tokio::fs::read(&self.schema_path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    schema = %self.schema_path.display(),
                    "schema file not found, skipping validation"
                );
                return Ok(());
            }
            Err(e) => {
                return Err(GatewayError::SchemaViolation {
                    source_label: source_label.to_string(),
                    errors: vec![format!(
                        "schema {} is unreadable: {e}",
                        self.schema_path.display()
                    )],
                });
            }
        };

        let schema: Value = serde_json::from_slice(&schema_bytes).map_err(|e| {
            GatewayError::SchemaViolation {
                source_label: source_label.to_string(),
                errors: vec![format!(
                    "schema {} is not valid JSON: {e}",
                    self.schema_path.display()
                )],
            }
        })?;

        validate_bytes(&schema, bytes, source_label)
    }
}

/// Validate `bytes` against an already-parsed schema.
pub fn validate_bytes(schema: &Value, bytes: &[u8], source_label: &str) -> Result<(), GatewayError> {
    let violation = |errors: Vec<String>| GatewayError::SchemaViolation {
        source_label: source_label.to_string(),
        errors,
    };

    let instance: Value = serde_json::from_slice(bytes)
        .map_err(|e| violation(vec![format!("not valid JSON: {e}")]))?;

    let validator = jsonschema::validator_for(schema)
        .map_err(|e| violation(vec![format!("schema does not compile: {e}")]))?;

    let errors: Vec<String> = validator
        .iter_errors(&instance)
        .map(|e| {
            let location = e.instance_path.to_string();
            if location.is_empty() {
                e.to_string()
            } else {
                format!("{location}: {e}")
            }
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(violation(errors))
    }
}
