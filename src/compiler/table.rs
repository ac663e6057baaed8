//! Engine-facing route table and its JSON wire shape.
//!
//! [`RouteTable`] is what the compiler produces. [`EngineConfig`] wraps
//! it in the envelope the proxy engine's `POST /load` endpoint expects:
//!
//! ```json
//! {"apps":{"http":{"servers":{"srv0":{"listen":[":80",":443"],"routes":[...]}}}}}
//! ```
//!
//! Empty match lists, upstream lists and header sets are omitted from the
//! output, as is `terminal` when it is false.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const SERVER_NAME: &str = "srv0";
pub const LISTEN_ADDRESSES: [&str; 2] = [":80", ":443"];

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    pub routes: Vec<RouteRule>,
}

impl RouteTable {
    #[must_use]
    pub fn proxy_rules(&self) -> usize {
        self.routes.iter().filter(|r| r.is_proxy()).count()
    }

    /// Explicit deny rules, not counting the trailing catch-all.
    #[must_use]
    pub fn deny_rules(&self) -> usize {
        self.routes
            .iter()
            .filter(|r| !r.is_proxy() && !r.is_catch_all())
            .count()
    }

    #[must_use]
    pub fn to_engine_config(&self) -> EngineConfig {
        let server = Server {
            listen: LISTEN_ADDRESSES.iter().map(|s| (*s).to_string()).collect(),
            routes: self.routes.clone(),
        };
        EngineConfig {
            apps: Apps {
                http: HttpApp {
                    servers: BTreeMap::from([(SERVER_NAME.to_string(), server)]),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    #[serde(rename = "match", default, skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<MatchSet>,

    pub handle: Vec<Handler>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub terminal: bool,
}

impl RouteRule {
    #[must_use]
    pub fn deny(matchers: Vec<MatchSet>) -> Self {
        Self {
            matchers,
            handle: vec![Handler::error()],
            terminal: true,
        }
    }

    #[must_use]
    pub fn catch_all() -> Self {
        Self::deny(Vec::new())
    }

    #[must_use]
    pub fn is_proxy(&self) -> bool {
        self.handle
            .iter()
            .any(|h| h.handler == HandlerKind::ReverseProxy)
    }

    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.matchers.is_empty() && self.terminal && !self.is_proxy()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    ReverseProxy,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handler {
    pub handler: HandlerKind,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upstreams: Vec<Upstream>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderOps>,
}

impl Handler {
    #[must_use]
    pub fn error() -> Self {
        Self {
            handler: HandlerKind::Error,
            upstreams: Vec::new(),
            headers: None,
        }
    }

    #[must_use]
    pub fn reverse_proxy(upstreams: Vec<Upstream>, headers: HeaderOps) -> Self {
        Self {
            handler: HandlerKind::ReverseProxy,
            upstreams,
            headers: Some(headers),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upstream {
    pub dial: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderOps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<HeaderMods>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMods {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub apps: Apps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Apps {
    pub http: HttpApp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpApp {
    pub servers: BTreeMap<String, Server>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub listen: Vec<String>,
    pub routes: Vec<RouteRule>,
}
