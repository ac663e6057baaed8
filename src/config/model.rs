//! Serde data structures for the routing document.
//!
//! Contains [`RoutingDocument`] (the root), [`Metadata`], [`Route`],
//! [`Endpoint`], [`Options`] and [`RateLimit`]. Field names follow the
//! on-disk layout the gateway has always written, so existing
//! `config.json` files load unchanged. Maps are `BTreeMap` so that
//! serialization and route compilation are deterministic.

use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";
pub const SYSTEM_USER: &str = "system";
pub const ALLOW_ANY: &str = "any";

const fn default_websocket_timeout() -> u64 {
    600
}

const fn default_log_retention_days() -> u32 {
    30
}

const fn default_session_timeout() -> u64 {
    86_400
}

const fn default_max_request_size() -> u64 {
    10_485_760
}

const fn default_requests_per_minute() -> u32 {
    60
}

const fn default_burst() -> u32 {
    120
}

fn default_modified_by() -> String {
    SYSTEM_USER.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoutingDocument {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(rename = "version")]
    pub schema_version: String,

    pub metadata: Metadata,

    /// Domain name -> subnet (CIDR).
    #[serde(rename = "hostdomains", default)]
    pub domains: BTreeMap<String, String>,

    /// Domain name -> path -> route.
    #[serde(rename = "hostingdevice", default)]
    pub routes: BTreeMap<String, BTreeMap<String, Route>>,

    /// Username -> opaque password hash.
    #[serde(rename = "adminuser", default)]
    pub admins: BTreeMap<String, String>,

    #[serde(default)]
    pub endpoint: Endpoint,

    #[serde(default)]
    pub options: Options,
}

impl RoutingDocument {
    /// The document synthesized on first start: empty, revision 1.
    #[must_use]
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            schema: None,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            metadata: Metadata {
                created_at: now,
                modified_at: now,
                modified_by: default_modified_by(),
                revision: 1,
            },
            domains: BTreeMap::new(),
            routes: BTreeMap::new(),
            admins: BTreeMap::new(),
            endpoint: Endpoint::default(),
            options: Options::default(),
        }
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.metadata.revision
    }

    #[must_use]
    pub fn total_routes(&self) -> usize {
        self.routes.values().map(BTreeMap::len).sum()
    }

    /// Domains that have routes but no `hostdomains` entry.
    pub fn orphan_domains(&self) -> impl Iterator<Item = &str> {
        self.routes
            .keys()
            .filter(|domain| !self.domains.contains_key(*domain))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Metadata {
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "modified")]
    pub modified_at: DateTime<Utc>,

    #[serde(rename = "modifiedBy", default = "default_modified_by")]
    pub modified_by: String,

    pub revision: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Route {
    /// `None` turns the route into an explicit deny.
    #[serde(rename = "deviceip", default, with = "empty_as_none")]
    pub device_address: Option<IpAddr>,

    #[serde(rename = "port", default)]
    pub ports: Vec<u16>,

    #[serde(rename = "sitename", default)]
    pub label: String,

    /// IP addresses, CIDR blocks, or [`ALLOW_ANY`].
    #[serde(rename = "ips", default)]
    pub allow_list: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Endpoint {
    #[serde(rename = "logserver", default)]
    pub log_server: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Options {
    #[serde(default = "default_websocket_timeout")]
    pub websocket_timeout: u64,

    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u32,

    #[serde(default = "default_session_timeout")]
    pub session_timeout: u64,

    #[serde(default = "default_max_request_size")]
    pub max_request_size: u64,

    #[serde(default)]
    pub rate_limit: RateLimit,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            websocket_timeout: default_websocket_timeout(),
            log_retention_days: default_log_retention_days(),
            session_timeout: default_session_timeout(),
            max_request_size: default_max_request_size(),
            rate_limit: RateLimit::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimit {
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            burst: default_burst(),
        }
    }
}

/// `""` on disk is "no device".
mod empty_as_none {
    use std::net::IpAddr;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<IpAddr>, ser: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(addr) => ser.collect_str(addr),
            None => ser.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<IpAddr>, D::Error> {
        let raw = Option::<String>::deserialize(de)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => text.parse().map(Some).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_device_ip_is_none() {
        let route: Route = serde_json::from_str(r#"{"deviceip": "", "port": [80]}"#).unwrap();
        assert_eq!(route.device_address, None);
        assert_eq!(route.ports, vec![80]);

        let back = serde_json::to_value(&route).unwrap();
        assert_eq!(back["deviceip"], "");
    }

    #[test]
    fn device_ip_round_trips() {
        let route: Route =
            serde_json::from_str(r#"{"deviceip": "192.168.3.10", "port": [8080, 8443]}"#).unwrap();
        assert_eq!(route.device_address, Some("192.168.3.10".parse().unwrap()));
        let back = serde_json::to_value(&route).unwrap();
        assert_eq!(back["deviceip"], "192.168.3.10");
    }

    #[test]
    fn malformed_device_ip_is_rejected() {
        let result = serde_json::from_str::<Route>(r#"{"deviceip": "not-an-ip"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn legacy_layout_loads() {
        let json = r#"{
            "version": "1.0.0",
            "metadata": {
                "created": "2025-06-01T09:00:00Z",
                "modified": "2025-06-02T10:30:00.123456789Z",
                "modifiedBy": "lacisadmin",
                "revision": 7
            },
            "hostdomains": {"a.example": "192.168.3.0/24"},
            "hostingdevice": {
                "a.example": {
                    "/": {"deviceip": "192.168.3.5", "port": [80], "sitename": "root", "ips": ["any"]}
                }
            },
            "adminuser": {"lacisadmin": "$argon2id$v=19$..."},
            "endpoint": {"logserver": ""},
            "options": {"websocket_timeout": 300}
        }"#;
        let doc: RoutingDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.revision(), 7);
        assert_eq!(doc.metadata.modified_by, "lacisadmin");
        assert_eq!(doc.total_routes(), 1);
        assert_eq!(doc.options.websocket_timeout, 300);
        assert_eq!(doc.options.rate_limit, RateLimit::default());
    }

    #[test]
    fn initial_document_is_empty_revision_one() {
        let doc = RoutingDocument::initial(Utc::now());
        assert_eq!(doc.revision(), 1);
        assert_eq!(doc.schema_version, DEFAULT_SCHEMA_VERSION);
        assert!(doc.domains.is_empty());
        assert!(doc.routes.is_empty());
        assert_eq!(doc.metadata.modified_by, SYSTEM_USER);
    }

    #[test]
    fn orphan_domains_are_reported() {
        let mut doc = RoutingDocument::initial(Utc::now());
        doc.domains.insert("a.example".into(), "10.0.0.0/24".into());
        doc.routes.insert("a.example".into(), BTreeMap::new());
        doc.routes.insert("ghost.example".into(), BTreeMap::new());
        let orphans: Vec<_> = doc.orphan_domains().collect();
        assert_eq!(orphans, vec!["ghost.example"]);
    }
}
