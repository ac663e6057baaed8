//! Pushes compiled route tables to the proxy engine's admin endpoint.
//!
//! [`SyncClient::push`] serializes a [`RouteTable`] into the engine's
//! `POST <admin>/load` body. Two limits bound the work in flight: an
//! admission semaphore caps simultaneous pushes, and each push borrows a
//! transport handle from a fixed-size [`HandlePool`]. Waiting for either
//! is unbounded unless [`SyncSettings::acquire_timeout`] is set.
//!
//! Any status other than `200 OK` is a rejection. There is no retry;
//! callers decide whether to push again. The request timeout covers the
//! whole exchange, from sending the request to the last byte of the
//! response body.
//!
//! The same slots serve the two read-only calls: listing the engine's
//! certificates and checking that a device answers HTTP.

pub mod certificates;
pub mod pool;

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::compiler::table::RouteTable;
use crate::error::GatewayError;
pub use certificates::Certificate;
use pool::{HandlePool, PooledHandle};

pub const DEFAULT_ADMIN_URL: &str = "http://localhost:2019";
pub const DEFAULT_MAX_IN_FLIGHT: usize = 10;
pub const DEFAULT_POOL_SIZE: usize = 20;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const UPSTREAM_TEST_TIMEOUT: Duration = Duration::from_secs(5);

const LOAD_PATH: &str = "/load";
const CERTIFICATES_PATH: &str = "/pki/certificates";
const CORRELATION_HEADER: &str = "x-correlation-id";

/// Longest rejection body kept in the error.
const MAX_ERROR_BODY: usize = 4096;

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, Full<Bytes>>;

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub admin_url: String,
    pub max_in_flight: usize,
    pub pool_size: usize,
    pub request_timeout: Duration,
    /// `None` waits for a slot indefinitely.
    pub acquire_timeout: Option<Duration>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            admin_url: DEFAULT_ADMIN_URL.to_string(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            pool_size: DEFAULT_POOL_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            acquire_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    pub correlation_id: String,
    pub body_bytes: usize,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReport {
    pub address: SocketAddr,
    pub status: hyper::StatusCode,
    pub latency_ms: u64,
}

#[must_use]
pub fn build_http_client(idle_timeout: Duration) -> HttpClient {
    // When multiple rustls crypto providers are compiled in, rustls cannot
    // auto-detect which one to use. Explicitly install `ring`.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(idle_timeout)
        .pool_max_idle_per_host(2)
        .build(https)
}

/// `<admin><path>` as a URI, rejecting anything but http(s).
pub fn admin_uri(admin_url: &str, path: &str) -> Result<hyper::Uri, GatewayError> {
    let invalid = |reason: String| GatewayError::InvalidAdminUrl {
        url: admin_url.to_string(),
        reason,
    };

    let parsed = url::Url::parse(admin_url).map_err(|e| invalid(e.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid(format!(
            "unsupported scheme '{}' (expected http or https)",
            parsed.scheme()
        )));
    }

    format!("{}{path}", admin_url.trim_end_matches('/'))
        .parse()
        .map_err(|e: hyper::http::uri::InvalidUri| invalid(e.to_string()))
}

pub fn load_uri(admin_url: &str) -> Result<hyper::Uri, GatewayError> {
    admin_uri(admin_url, LOAD_PATH)
}

pub struct SyncClient {
    load_uri: hyper::Uri,
    certificates_uri: hyper::Uri,
    admission: Semaphore,
    max_in_flight: usize,
    pool: HandlePool,
    request_timeout: Duration,
    acquire_timeout: Option<Duration>,
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("load_uri", &self.load_uri)
            .field("max_in_flight", &self.max_in_flight)
            .field("pool_size", &self.pool.capacity())
            .field("request_timeout", &self.request_timeout)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish_non_exhaustive()
    }
}

/// An admission permit plus a borrowed transport handle, released together.
struct Slot<'a> {
    _permit: SemaphorePermit<'a>,
    handle: PooledHandle<'a>,
}

impl SyncClient {
    pub fn new(settings: &SyncSettings) -> Result<Self, GatewayError> {
        let max_in_flight = settings.max_in_flight.max(1);
        Ok(Self {
            load_uri: load_uri(&settings.admin_url)?,
            certificates_uri: admin_uri(&settings.admin_url, CERTIFICATES_PATH)?,
            admission: Semaphore::new(max_in_flight),
            max_in_flight,
            pool: HandlePool::new(settings.pool_size, || {
                build_http_client(Duration::from_secs(30))
            }),
            request_timeout: settings.request_timeout,
            acquire_timeout: settings.acquire_timeout,
        })
    }

    #[must_use]
    pub fn load_uri(&self) -> &hyper::Uri {
        &self.load_uri
    }

    /// Requests currently admitted.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.max_in_flight
            .saturating_sub(self.admission.available_permits())
    }

    /// Replace the engine's route table with `table`.
    pub async fn push(&self, table: &RouteTable) -> Result<PushReport, GatewayError> {
        let body = Bytes::from(serde_json::to_vec(&table.to_engine_config())?);
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let body_bytes = body.len();

        let slot = self.acquire_slot(&correlation_id).await?;
        let request = hyper::Request::builder()
            .method(hyper::Method::POST)
            .uri(self.load_uri.clone())
            .header(hyper::header::CONTENT_TYPE, "application/json")
            .header(CORRELATION_HEADER, &correlation_id)
            .body(Full::new(body))
            .map_err(|e| unreachable(&self.load_uri, Box::new(e)))?;

        let start = Instant::now();
        let (status, reply) = self
            .exchange(&slot, request, self.request_timeout)
            .await?;

        if status != hyper::StatusCode::OK {
            let body = truncate(&reply);
            tracing::error!(
                correlation_id = %correlation_id,
                status = status.as_u16(),
                body = %body,
                "proxy engine rejected route table"
            );
            return Err(GatewayError::SyncRejected { status, body });
        }

        let report = PushReport {
            correlation_id,
            body_bytes,
            latency_ms: millis(start),
        };
        tracing::info!(
            correlation_id = %report.correlation_id,
            rules = table.routes.len(),
            bytes = report.body_bytes,
            latency_ms = report.latency_ms,
            "route table pushed"
        );
        Ok(report)
    }

    /// Certificates the engine currently manages.
    pub async fn certificates(&self) -> Result<Vec<Certificate>, GatewayError> {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let slot = self.acquire_slot(&correlation_id).await?;
        let request = hyper::Request::builder()
            .method(hyper::Method::GET)
            .uri(self.certificates_uri.clone())
            .header(CORRELATION_HEADER, &correlation_id)
            .body(Full::new(Bytes::new()))
            .map_err(|e| unreachable(&self.certificates_uri, Box::new(e)))?;

        let (status, reply) = self
            .exchange(&slot, request, self.request_timeout)
            .await?;
        if status != hyper::StatusCode::OK {
            return Err(GatewayError::SyncRejected {
                status,
                body: truncate(&reply),
            });
        }

        let certificates: Vec<Certificate> =
            serde_json::from_slice(&reply).map_err(|e| GatewayError::SyncMalformed {
                url: self.certificates_uri.to_string(),
                source: e,
            })?;
        tracing::debug!(count = certificates.len(), "certificates listed");
        Ok(certificates)
    }

    /// Check that a device answers HTTP at `address`.
    ///
    /// Any HTTP response counts as reachable, whatever its status. Only a
    /// transport failure or [`UPSTREAM_TEST_TIMEOUT`] elapsing fails.
    pub async fn test_upstream(&self, address: SocketAddr) -> Result<UpstreamReport, GatewayError> {
        let uri: hyper::Uri = format!("http://{address}/")
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| GatewayError::InvalidAdminUrl {
                url: address.to_string(),
                reason: e.to_string(),
            })?;

        let correlation_id = uuid::Uuid::new_v4().to_string();
        let slot = self.acquire_slot(&correlation_id).await?;
        let request = hyper::Request::builder()
            .method(hyper::Method::GET)
            .uri(uri.clone())
            .body(Full::new(Bytes::new()))
            .map_err(|e| unreachable(&uri, Box::new(e)))?;

        let start = Instant::now();
        let (status, _) = self
            .exchange(&slot, request, UPSTREAM_TEST_TIMEOUT)
            .await
            .inspect_err(|e| {
                tracing::warn!(upstream = %address, error = %e, "upstream test failed");
            })?;

        let report = UpstreamReport {
            address,
            status,
            latency_ms: millis(start),
        };
        tracing::info!(
            upstream = %address,
            status = status.as_u16(),
            latency_ms = report.latency_ms,
            "upstream reachable"
        );
        Ok(report)
    }

    async fn acquire_slot(&self, correlation_id: &str) -> Result<Slot<'_>, GatewayError> {
        let wait_start = Instant::now();
        let acquire = async {
            let permit = self.admission.acquire().await;
            let handle = self.pool.acquire().await;
            (permit, handle)
        };
        let (permit, handle) = match self.acquire_timeout {
            Some(limit) => tokio::time::timeout(limit, acquire).await.map_err(|_| {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    waited_ms = millis(wait_start),
                    "sync client saturated"
                );
                GatewayError::SyncSaturated {
                    waited_ms: millis(wait_start),
                }
            })?,
            None => acquire.await,
        };
        let closed = |_| GatewayError::SyncSaturated {
            waited_ms: millis(wait_start),
        };
        Ok(Slot {
            _permit: permit.map_err(closed)?,
            handle: handle.map_err(closed)?,
        })
    }

    /// Send `request` and read the whole response body, all within `limit`.
    async fn exchange(
        &self,
        slot: &Slot<'_>,
        request: hyper::Request<Full<Bytes>>,
        limit: Duration,
    ) -> Result<(hyper::StatusCode, Bytes), GatewayError> {
        let uri = request.uri().clone();
        let Some(client) = slot.handle.client() else {
            return Err(GatewayError::SyncSaturated { waited_ms: 0 });
        };

        let round_trip = async {
            let response = client.request(request).await?;
            let status = response.status();
            let body = response.into_body().collect().await?.to_bytes();
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>((status, body))
        };

        match tokio::time::timeout(limit, round_trip).await {
            Ok(Ok(exchanged)) => Ok(exchanged),
            Ok(Err(e)) => Err(unreachable(&uri, e)),
            Err(_) => Err(unreachable(
                &uri,
                format!("request timed out after {}ms", limit.as_millis()).into(),
            )),
        }
    }
}

fn unreachable(uri: &hyper::Uri, source: Box<dyn std::error::Error + Send + Sync>) -> GatewayError {
    GatewayError::SyncUnreachable {
        url: uri.to_string(),
        source,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn millis(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

fn truncate(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.len() <= MAX_ERROR_BODY {
        return trimmed.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_uri_appends_path() {
        let uri = load_uri("http://localhost:2019/").unwrap();
        assert_eq!(uri.to_string(), "http://localhost:2019/load");
    }

    #[test]
    fn admin_uri_joins_paths() {
        let uri = admin_uri("http://engine:2019", CERTIFICATES_PATH).unwrap();
        assert_eq!(uri.to_string(), "http://engine:2019/pki/certificates");
    }

    #[test]
    fn load_uri_rejects_other_schemes() {
        let err = load_uri("unix:///run/engine.sock").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidAdminUrl { .. }));
    }

    #[test]
    fn load_uri_rejects_garbage() {
        assert!(load_uri("not a url").is_err());
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY + 10);
        let text = truncate(body.as_bytes());
        assert!(text.ends_with('…'));
        assert_eq!(text.chars().count(), MAX_ERROR_BODY + 1);
    }
}
