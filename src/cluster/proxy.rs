//! HTTP forwarding from the coordinator's public port to the workers.
//!
//! Every inbound request is handed to the next worker in round-robin order.
//! Method, headers, path, query and body go through unchanged; the worker's
//! response (status, headers, streamed body) comes back unchanged. Failures to
//! reach a worker become gateway errors instead of hanging the client.

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{self, Uri, header};
use axum::response::{IntoResponse, Response};
use http_body_util::{LengthLimitError, Limited};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use crate::cluster::balancer::RoundRobin;
use crate::config::ProxyConfig;
use crate::error::ProxyError;

/// Round-robin HTTP forwarder over a fixed list of worker addresses.
pub struct Proxy {
    upstreams: Vec<SocketAddr>,
    balancer: RoundRobin,
    client: Client<HttpConnector, Body>,
    config: ProxyConfig,
}

impl Proxy {
    /// Creates a proxy over `upstreams`, selected in the given order.
    pub fn new(upstreams: Vec<SocketAddr>, config: ProxyConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.upstream_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            balancer: RoundRobin::new(upstreams.len()),
            upstreams,
            client,
            config,
        }
    }

    /// Worker addresses in rotation order.
    pub fn upstreams(&self) -> &[SocketAddr] {
        &self.upstreams
    }

    /// Forwards one request to the next worker in rotation.
    ///
    /// The turn is consumed even if forwarding then fails. A declared length
    /// over the limit is refused up front; a streamed body is cut off once it
    /// passes the limit, and both end as `PayloadTooLarge`.
    pub async fn forward(&self, request: Request) -> Result<Response, ProxyError> {
        let index = self.balancer.next_index().ok_or(ProxyError::NoWorkers)?;
        let upstream = self.upstreams[index];
        let limit = self.config.max_body_bytes;

        if declared_length(&request).is_some_and(|length| length > limit as u64) {
            return Err(ProxyError::PayloadTooLarge { limit });
        }

        let (mut parts, body) = request.into_parts();
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_owned();
        debug!("{} {} -> worker {} ({})", parts.method, path, index, upstream);

        parts.uri = format!("http://{}{}", upstream, path).parse::<Uri>()?;
        let body = Body::new(Limited::new(body, limit));
        let upstream_request = http::Request::from_parts(parts, body);

        let timeout = self.config.upstream_timeout;
        let response = tokio::time::timeout(timeout, self.client.request(upstream_request))
            .await
            .map_err(|_| ProxyError::Timeout { upstream, timeout })?
            .map_err(|source| {
                if exceeds_body_limit(&source) {
                    ProxyError::PayloadTooLarge { limit }
                } else {
                    ProxyError::Unreachable { upstream, source }
                }
            })?;

        Ok(response.map(Body::new))
    }
}

fn declared_length(request: &Request) -> Option<u64> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Whether the request failed because `Limited` stopped the body.
fn exceeds_body_limit(error: &(dyn StdError + 'static)) -> bool {
    std::iter::successors(Some(error), |&e| e.source()).any(|e| e.is::<LengthLimitError>())
}

/// Builds the public router: every path and method goes through the proxy.
pub fn create_router(proxy: Arc<Proxy>) -> Router {
    Router::new().fallback(forward).with_state(proxy)
}

async fn forward(State(proxy): State<Arc<Proxy>>, request: Request) -> Response {
    match proxy.forward(request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use http_body_util::{BodyExt, Full};

    #[tokio::test]
    async fn test_body_limit_found_through_wrapping_errors() {
        let overflow = Limited::new(Full::new(Bytes::from("0123456789")), 4)
            .collect()
            .await
            .unwrap_err();
        let wrapped = axum::Error::new(overflow);

        assert!(exceeds_body_limit(&wrapped));
    }

    #[test]
    fn test_other_errors_are_not_body_limit() {
        let refused = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        assert!(!exceeds_body_limit(&refused));
    }
}
