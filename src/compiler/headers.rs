//! Request header rewrites attached to every proxy rule.
//!
//! The engine overwrites `X-Real-IP` and `X-Forwarded-For` with the
//! address of the connecting client, so a device behind the gateway
//! never sees a client-supplied forwarding chain.

use std::collections::BTreeMap;

use super::table::{HeaderMods, HeaderOps};

/// Engine placeholder resolved per request to the client's address.
pub const REMOTE_HOST_PLACEHOLDER: &str = "{http.request.remote.host}";

pub const CLIENT_IDENTITY_HEADERS: [&str; 2] = ["X-Real-IP", "X-Forwarded-For"];

#[must_use]
pub fn client_identity() -> HeaderOps {
    let set: BTreeMap<String, Vec<String>> = CLIENT_IDENTITY_HEADERS
        .iter()
        .map(|name| ((*name).to_string(), vec![REMOTE_HOST_PLACEHOLDER.to_string()]))
        .collect();

    HeaderOps {
        request: Some(HeaderMods { set }),
    }
}
