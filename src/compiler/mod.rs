//! Translation of a routing document into the engine's route table.
//!
//! [`compile`] is total over any document the store admits. For every
//! registered domain it emits one rule per path: a reverse-proxy rule
//! when the route names a device, a terminal deny rule when it does not.
//! Routes under a domain missing from `hostdomains` produce nothing. A
//! single terminal catch-all deny is always appended last, so anything
//! the explicit rules do not match is refused.
//!
//! Iteration follows the document's ordered maps, so the same document
//! always compiles to the same table.

pub mod headers;
pub mod table;

use std::net::{IpAddr, SocketAddr};

use crate::config::model::{Route, RoutingDocument};
use table::{Handler, MatchSet, RouteRule, RouteTable, Upstream};

/// Port dialled when a route lists none.
pub const DEFAULT_UPSTREAM_PORT: u16 = 80;

#[must_use]
pub fn compile(doc: &RoutingDocument) -> RouteTable {
    let mut routes = Vec::with_capacity(doc.total_routes() + 1);

    for (domain, paths) in &doc.routes {
        if !doc.domains.contains_key(domain) {
            tracing::warn!(
                domain = %domain,
                paths = paths.len(),
                "routes for unregistered domain skipped"
            );
            continue;
        }

        for (path, route) in paths {
            routes.push(compile_route(domain, path, route));
        }
    }

    routes.push(RouteRule::catch_all());

    let table = RouteTable { routes };
    tracing::debug!(
        revision = doc.revision(),
        proxy_rules = table.proxy_rules(),
        deny_rules = table.deny_rules(),
        "route table compiled"
    );
    table
}

fn compile_route(domain: &str, path: &str, route: &Route) -> RouteRule {
    let matchers = vec![match_for(domain, path)];

    match route.device_address {
        None => RouteRule::deny(matchers),
        Some(address) => RouteRule {
            matchers,
            handle: vec![Handler::reverse_proxy(
                upstreams_for(address, &route.ports),
                headers::client_identity(),
            )],
            terminal: false,
        },
    }
}

/// Host match, plus a prefix path match for anything below the root.
#[must_use]
pub fn match_for(domain: &str, path: &str) -> MatchSet {
    let path = if path.is_empty() || path == "/" {
        Vec::new()
    } else {
        vec![format!("{path}*")]
    };
    MatchSet {
        host: vec![domain.to_string()],
        path,
    }
}

/// One upstream per port, in order; port 80 when none are listed.
#[must_use]
pub fn upstreams_for(address: IpAddr, ports: &[u16]) -> Vec<Upstream> {
    let dial = |port: u16| Upstream {
        dial: SocketAddr::new(address, port).to_string(),
    };

    if ports.is_empty() {
        vec![dial(DEFAULT_UPSTREAM_PORT)]
    } else {
        ports.iter().copied().map(dial).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_path_has_no_path_constraint() {
        let m = match_for("a.example", "/");
        assert_eq!(m.host, vec!["a.example"]);
        assert!(m.path.is_empty());
    }

    #[test]
    fn sub_path_is_a_prefix_match() {
        let m = match_for("a.example", "/camera");
        assert_eq!(m.path, vec!["/camera*"]);
    }

    #[test]
    fn empty_ports_dial_port_80() {
        let upstreams = upstreams_for("10.0.0.5".parse().unwrap(), &[]);
        assert_eq!(upstreams, vec![Upstream { dial: "10.0.0.5:80".into() }]);
    }

    #[test]
    fn ports_keep_their_order() {
        let upstreams = upstreams_for("10.0.0.5".parse().unwrap(), &[8443, 8080]);
        let dials: Vec<_> = upstreams.iter().map(|u| u.dial.as_str()).collect();
        assert_eq!(dials, vec!["10.0.0.5:8443", "10.0.0.5:8080"]);
    }

    #[test]
    fn ipv6_devices_are_bracketed() {
        let upstreams = upstreams_for("fd00::5".parse().unwrap(), &[8080]);
        assert_eq!(upstreams[0].dial, "[fd00::5]:8080");
    }

    #[test]
    fn empty_document_compiles_to_catch_all_only() {
        let doc = RoutingDocument::initial(chrono::Utc::now());
        let table = compile(&doc);
        assert_eq!(table.routes, vec![RouteRule::catch_all()]);
    }
}
