//! Write-time value validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`RoutingDocument`] for
//! values the schema cannot express: malformed domain names, subnets
//! that are not CIDR blocks, paths without a leading slash, port zero,
//! and allow-list entries that are neither an address, a CIDR block nor
//! `any`. Routes whose domain is missing from `hostdomains` are not an
//! error; [`warnings`] reports them since the compiler denies them.

use std::net::{IpAddr, SocketAddr};

use super::model::{RoutingDocument, ALLOW_ANY};
use crate::error::ValidationError;

/// Parse `addr/prefix`, checking the prefix against the address family.
#[must_use]
pub fn parse_cidr(text: &str) -> Option<(IpAddr, u8)> {
    let (addr, prefix) = text.split_once('/')?;
    let addr: IpAddr = addr.parse().ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    (prefix <= max).then_some((addr, prefix))
}

/// Validate a domain name. Returns `Ok(())` or a human-readable error.
pub fn validate_domain(domain: &str) -> Result<(), String> {
    if domain.is_empty() {
        return Err("domain cannot be empty".into());
    }
    if domain.len() > 253 {
        return Err("domain is longer than 253 characters".into());
    }
    for label in domain.trim_end_matches('.').split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(format!("'{domain}' has an empty or oversized label"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(format!("label '{label}' cannot start or end with '-'"));
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '*')
        {
            return Err(format!("label '{label}' contains invalid characters"));
        }
    }
    Ok(())
}

/// Validate a route path. Returns `Ok(())` or a human-readable error.
pub fn validate_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("path cannot be empty".into());
    }
    if !path.starts_with('/') {
        return Err(format!("path must start with '/' (did you mean '/{path}'?)"));
    }
    if path.contains('*') {
        return Err("path cannot contain '*', prefix matching is implied".into());
    }
    Ok(())
}

/// Validate an allow-list entry: an address, a CIDR block, or `any`.
pub fn validate_allow_entry(entry: &str) -> Result<(), String> {
    if entry == ALLOW_ANY || entry.parse::<IpAddr>().is_ok() || parse_cidr(entry).is_some() {
        Ok(())
    } else {
        Err(format!(
            "'{entry}' is not an IP address, a CIDR block, or '{ALLOW_ANY}'"
        ))
    }
}

pub fn validate(doc: &RoutingDocument) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if doc.schema_version.trim().is_empty() {
        errors.push(ValidationError {
            scope: "(root)".into(),
            field: "version".into(),
            message: "schema version cannot be empty".into(),
            suggestion: Some("use \"1.0.0\"".into()),
        });
    }

    for (domain, subnet) in &doc.domains {
        if let Err(msg) = validate_domain(domain) {
            errors.push(ValidationError {
                scope: domain.clone(),
                field: "hostdomains".into(),
                message: msg,
                suggestion: None,
            });
        }
        if parse_cidr(subnet).is_none() {
            errors.push(ValidationError {
                scope: domain.clone(),
                field: "subnet".into(),
                message: format!("'{subnet}' is not a CIDR block"),
                suggestion: subnet
                    .parse::<IpAddr>()
                    .ok()
                    .map(|addr| {
                        let prefix = if addr.is_ipv4() { 24 } else { 64 };
                        format!("did you mean '{subnet}/{prefix}'?")
                    }),
            });
        }
    }

    for (domain, paths) in &doc.routes {
        for (path, route) in paths {
            let scope = format!("{domain}{path}");

            if let Err(msg) = validate_path(path) {
                errors.push(ValidationError {
                    scope: scope.clone(),
                    field: "path".into(),
                    message: msg,
                    suggestion: if !path.is_empty() && !path.starts_with('/') {
                        Some(format!("did you mean '/{path}'?"))
                    } else {
                        None
                    },
                });
            }

            if route.ports.contains(&0) {
                errors.push(ValidationError {
                    scope: scope.clone(),
                    field: "port".into(),
                    message: "port must be between 1 and 65535".into(),
                    suggestion: None,
                });
            }

            for entry in &route.allow_list {
                if let Err(msg) = validate_allow_entry(entry) {
                    errors.push(ValidationError {
                        scope: scope.clone(),
                        field: "ips".into(),
                        message: msg,
                        suggestion: None,
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Non-fatal findings about a document.
#[must_use]
pub fn warnings(doc: &RoutingDocument) -> Vec<String> {
    let mut found: Vec<String> = doc
        .orphan_domains()
        .map(|domain| {
            format!("routes for '{domain}' have no hostdomains entry and will be denied")
        })
        .collect();

    for (domain, paths) in &doc.routes {
        for (path, route) in paths {
            if route.device_address.is_none() && !route.ports.is_empty() {
                found.push(format!(
                    "{domain}{path} has ports but no deviceip, it compiles to a deny rule"
                ));
            }
        }
    }
    found
}

#[must_use]
pub fn format_validation_report(path: &str, doc: &RoutingDocument) -> String {
    let mut lines = vec![format!(
        "  revision {}, {} domains, {} routes\n",
        doc.revision(),
        doc.domains.len(),
        doc.total_routes()
    )];

    for (domain, paths) in &doc.routes {
        let subnet = doc.domains.get(domain).map_or("(not registered)", String::as_str);
        lines.push(format!("  {domain}  [{subnet}]"));
        for (route_path, route) in paths {
            let target = route.device_address.map_or_else(
                || "deny".to_string(),
                |addr| {
                    let ports: &[u16] = if route.ports.is_empty() { &[80] } else { &route.ports };
                    ports
                        .iter()
                        .map(|p| SocketAddr::new(addr, *p).to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                },
            );
            lines.push(format!("    {route_path}  -> {target}"));
        }
    }

    for warning in warnings(doc) {
        lines.push(format!("  warning: {warning}"));
    }

    format!("{} is valid\n{}", path, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::Route;

    fn minimal_doc() -> RoutingDocument {
        let mut doc = RoutingDocument::initial(chrono::Utc::now());
        doc.domains
            .insert("a.example".into(), "192.168.3.0/24".into());
        doc.routes.entry("a.example".into()).or_default().insert(
            "/".into(),
            Route {
                device_address: Some("192.168.3.5".parse().unwrap()),
                ports: vec![8080],
                label: "root".into(),
                allow_list: vec!["any".into()],
            },
        );
        doc
    }

    #[test]
    fn valid_document_passes() {
        assert!(validate(&minimal_doc()).is_ok());
    }

    #[test]
    fn subnet_without_prefix_suggests_one() {
        let mut doc = minimal_doc();
        doc.domains.insert("a.example".into(), "192.168.3.0".into());
        let errors = validate(&doc).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].suggestion.as_deref(),
            Some("did you mean '192.168.3.0/24'?")
        );
    }

    #[test]
    fn path_without_slash_fails() {
        let mut doc = minimal_doc();
        let route = doc.routes["a.example"]["/"].clone();
        doc.routes.get_mut("a.example").unwrap().insert("api".into(), route);
        let errors = validate(&doc).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.suggestion.as_deref() == Some("did you mean '/api'?")));
    }

    #[test]
    fn port_zero_fails() {
        let mut doc = minimal_doc();
        doc.routes.get_mut("a.example").unwrap().get_mut("/").unwrap().ports = vec![0];
        let errors = validate(&doc).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "port"));
    }

    #[test]
    fn bad_allow_entry_fails() {
        let mut doc = minimal_doc();
        doc.routes
            .get_mut("a.example")
            .unwrap()
            .get_mut("/")
            .unwrap()
            .allow_list = vec!["10.0.0.0/40".into(), "everyone".into()];
        let errors = validate(&doc).unwrap_err();
        assert_eq!(errors.iter().filter(|e| e.field == "ips").count(), 2);
    }

    #[test]
    fn orphan_route_is_a_warning_not_an_error() {
        let mut doc = minimal_doc();
        let route = doc.routes["a.example"]["/"].clone();
        doc.routes
            .entry("ghost.example".into())
            .or_default()
            .insert("/".into(), route);
        assert!(validate(&doc).is_ok());
        assert_eq!(warnings(&doc).len(), 1);
    }

    #[test]
    fn cidr_parsing_respects_family() {
        assert!(parse_cidr("10.0.0.0/24").is_some());
        assert!(parse_cidr("fd00::/64").is_some());
        assert!(parse_cidr("10.0.0.0/33").is_none());
        assert!(parse_cidr("10.0.0.0").is_none());
    }

    #[test]
    fn domain_labels_are_checked() {
        assert!(validate_domain("a.example").is_ok());
        assert!(validate_domain("*.example").is_ok());
        assert!(validate_domain("-bad.example").is_err());
        assert!(validate_domain("a..example").is_err());
        assert!(validate_domain("").is_err());
    }
}
