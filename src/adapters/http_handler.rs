use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Body as AxumBody,
    http::{HeaderMap, StatusCode, header},
};
use http_body_util::Limited;
use hyper::{Request, Response};

use crate::{
    core::{
        GatewayError, GatewayService,
        auth::AuthError,
        forwarded::{ForwardedContext, Scheme, extend_chain, observed_host},
    },
    ports::http_client::{HttpClient, HttpClientError},
};

/// Headers that describe one hop and must not travel to the next one.
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Request handler for the mediagate front door.
///
/// One invocation per inbound request: local endpoints (`/health`, the `/`
/// banner) are answered in-process, everything else is matched against the
/// route table and streamed to the owning upstream. The handler holds only
/// shared immutable state, so concurrent requests never contend.
pub struct HttpHandler {
    gateway_service: Arc<GatewayService>,
    http_client: Arc<dyn HttpClient>,
}

impl HttpHandler {
    pub fn new(gateway_service: Arc<GatewayService>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            gateway_service,
            http_client,
        }
    }

    /// Main request handler that routes requests appropriately.
    pub async fn handle_request(
        &self,
        req: Request<AxumBody>,
        client_addr: Option<SocketAddr>,
    ) -> Response<AxumBody> {
        let request_id = uuid::Uuid::new_v4();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let span = crate::tracing_setup::create_request_span(
            method.as_str(),
            &path,
            &request_id.to_string(),
        );
        span.in_scope(|| tracing::info!("handling request"));

        // `/health` is always answered locally, never proxied.
        if path == "/health" {
            let response = self.handle_health_check();
            span.record("http.status_code", response.status().as_u16());
            return response;
        }

        let response = match self.handle_proxy_request(req, client_addr).await {
            Ok(response) => response,
            Err(error) => {
                use axum::response::IntoResponse;
                error.into_response()
            }
        };

        span.record("http.status_code", response.status().as_u16());
        span.in_scope(|| tracing::info!("request completed"));
        response
    }

    /// Aggregate health endpoint: `200` when every upstream is reachable,
    /// `503` otherwise, with per-service detail in the body.
    fn handle_health_check(&self) -> Response<AxumBody> {
        let services = self.gateway_service.health_snapshots();
        let all_reachable = self.gateway_service.all_upstreams_reachable();

        let status = if all_reachable {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };

        let health_data = serde_json::json!({
            "status": if all_reachable { "ok" } else { "degraded" },
            "gateway": true,
            "services": services,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        json_response(status, health_data)
    }

    /// Service banner for the bare root path, listing the configured route
    /// prefixes.
    fn handle_welcome(&self) -> Response<AxumBody> {
        let routes: Vec<&str> = self.gateway_service.routes().prefixes().collect();
        let banner = serde_json::json!({
            "service": "mediagate",
            "version": env!("CARGO_PKG_VERSION"),
            "routes": routes,
            "health": "/health",
        });
        json_response(StatusCode::OK, banner)
    }

    /// Proxy the request to the upstream owning its path prefix.
    async fn handle_proxy_request(
        &self,
        req: Request<AxumBody>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<AxumBody>, GatewayError> {
        let path = req.uri().path().to_string();

        let Some(route) = self.gateway_service.find_matching_route(&path) else {
            if path == "/" {
                return Ok(self.handle_welcome());
            }
            return Err(GatewayError::RouteNotFound);
        };

        // Gateway-side bearer pre-validation, when the rule asks for it.
        // The Principal lives exactly as long as this request.
        if route.rule.require_auth {
            let principal = self.authenticate(req.headers())?;
            tracing::debug!(
                subject = principal.subject_id,
                service = %route.rule.service,
                "bearer token pre-validated"
            );
        }

        let max_body_bytes = self.gateway_service.config().limits.max_body_bytes;
        if let Some(declared) = declared_content_length(req.headers())
            && declared > max_body_bytes
        {
            return Err(GatewayError::PayloadTooLarge);
        }

        // The externally-visible identity is derived once per request and
        // only read afterwards; the listen address stands in for the socket
        // local address when a client sends no Host header at all.
        let local_addr = self.gateway_service.config().listen_addr.parse().ok();
        let scheme = Scheme::Http;
        let context = ForwardedContext::from_request(req.headers(), local_addr, scheme);
        let this_hop = observed_host(req.headers(), local_addr);

        tracing::debug!(
            origin = %context.origin(),
            hops = context.hop_count(),
            upstream = %route.rule.upstream,
            "forwarding request"
        );

        let rewritten_path = route.rewrite_path(&path);
        let upstream_uri = match req.uri().query() {
            Some(query) => format!("{}{}?{}", route.rule.upstream, rewritten_path, query),
            None => format!("{}{}", route.rule.upstream, rewritten_path),
        };
        let read_timeout_secs = self
            .gateway_service
            .config()
            .upstream_client
            .read_timeout_secs;

        let (mut parts, body) = req.into_parts();

        parts.uri = upstream_uri
            .parse()
            .map_err(|e| GatewayError::UpstreamUnreachable(format!("invalid upstream URI: {e}")))?;

        // Strip hop-by-hop headers; the client adapter sets the upstream's
        // own Host. The forwarded chain is extended, never overwritten.
        strip_hop_by_hop(&mut parts.headers);
        parts.headers.remove(header::HOST);
        extend_chain(&mut parts.headers, &this_hop, scheme, client_addr);

        // The body streams through with a hard cap; the limit trips before
        // the upload finishes, not after buffering it.
        let limited = AxumBody::new(Limited::new(body, max_body_bytes as usize));
        let outgoing = Request::from_parts(parts, limited);

        match self.http_client.send_request(outgoing, read_timeout_secs).await {
            Ok(mut response) => {
                strip_hop_by_hop(response.headers_mut());
                Ok(response)
            }
            Err(HttpClientError::BodyTooLarge) => Err(GatewayError::PayloadTooLarge),
            Err(HttpClientError::Timeout(secs)) => Err(GatewayError::UpstreamTimeout(secs)),
            Err(HttpClientError::ConnectionError(detail)) => {
                Err(GatewayError::UpstreamUnreachable(detail))
            }
            Err(HttpClientError::InvalidRequest(detail)) => {
                Err(GatewayError::UpstreamUnreachable(detail))
            }
        }
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<crate::core::Principal, GatewayError> {
        let Some(verifier) = self.gateway_service.verifier() else {
            tracing::error!("route requires auth but no signing secret is configured");
            return Err(GatewayError::Unauthorized(AuthError::MalformedToken));
        };

        let header_value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(GatewayError::Unauthorized(AuthError::MalformedToken))?;

        verifier
            .verify_bearer(header_value)
            .map_err(GatewayError::Unauthorized)
    }
}

impl Clone for HttpHandler {
    fn clone(&self) -> Self {
        Self {
            gateway_service: self.gateway_service.clone(),
            http_client: self.http_client.clone(),
        }
    }
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<AxumBody> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(AxumBody::from(body.to_string()))
        .unwrap_or_else(|_| Response::new(AxumBody::empty()))
}

fn declared_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}
