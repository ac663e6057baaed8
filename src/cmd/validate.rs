//! `routekeeper validate` — check a routing document without saving it.
//!
//! Runs the schema check and the write-time value validation, reporting
//! results in either human-readable text or machine-readable JSON.

use console::style;

use crate::cli::{OutputFormat, ValidateArgs};
use crate::config::model::RoutingDocument;
use crate::config::validation;
use crate::config::SchemaValidator;
use crate::error::GatewayError;

pub async fn execute(args: &ValidateArgs) -> Result<(), GatewayError> {
    let path = &args.file;
    let label = path.display().to_string();

    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(GatewayError::ConfigFileNotFound { path: path.clone() });
        }
        Err(e) => return Err(GatewayError::Io(e)),
    };

    let schema = args
        .schema
        .clone()
        .map_or_else(|| SchemaValidator::beside(path), SchemaValidator::new);
    if let Err(e) = schema.check(&bytes, &label).await {
        if let GatewayError::SchemaViolation { ref errors, .. } = e {
            report_failure(args, &label, errors);
        }
        return Err(e);
    }

    let doc: RoutingDocument =
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::CorruptDocument {
            path: path.clone(),
            source: e,
        })?;

    if let Err(errors) = validation::validate(&doc) {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        match args.format {
            OutputFormat::Text => report_failure(args, &label, &messages),
            OutputFormat::Json => {
                let json_errors: Vec<serde_json::Value> = errors
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "scope": e.scope,
                            "field": e.field,
                            "message": e.message,
                            "suggestion": e.suggestion,
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "errors": json_errors,
                    })
                );
            }
        }
        return Err(GatewayError::ConfigValidation { errors });
    }

    match args.format {
        OutputFormat::Text => {
            println!(
                "{} {}",
                style("\u{2713}").green().bold(),
                validation::format_validation_report(&label, &doc)
            );
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "valid": true,
                    "revision": doc.revision(),
                    "domains": doc.domains.len(),
                    "routes": doc.total_routes(),
                    "warnings": validation::warnings(&doc),
                })
            );
        }
    }

    Ok(())
}

fn report_failure(args: &ValidateArgs, label: &str, messages: &[String]) {
    match args.format {
        OutputFormat::Text => {
            eprintln!(
                "{} {label} has {} errors\n",
                style("\u{2717}").red().bold(),
                messages.len()
            );
            for message in messages {
                eprintln!("{message}");
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "valid": false,
                    "errors": messages,
                })
            );
        }
    }
}
