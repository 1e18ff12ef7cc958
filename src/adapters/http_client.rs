use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use eyre::Result;
use http_body_util::BodyExt;
use hyper::{Request, Response, Version, header, header::HeaderValue};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tokio::time::timeout;
use tracing::Instrument;

use crate::{
    config::models::UpstreamClientConfig,
    ports::http_client::{HttpClient, HttpClientError, HttpClientResult},
};

/// HTTP client adapter using Hyper with Rustls (HTTP/1.1 + HTTP/2).
///
/// Responsibilities:
/// * Connection pooling per upstream; a pooled connection serves one
///   in-flight request at a time and is returned (or closed) afterwards
/// * Connect timeout on the connector, response-head timeout per request
/// * HEAD based reachability probes with their own bounded timeout
/// * Converts between Hyper body and Axum body types without buffering
///
/// This adapter is intentionally minimal; retries are deliberately absent —
/// the gateway never retries an upstream call on behalf of a client.
pub struct HttpClientAdapter {
    client: Client<HttpsConnector<HttpConnector>, AxumBody>,
}

impl HttpClientAdapter {
    /// Create a new HTTP client adapter.
    pub fn new(config: &UpstreamClientConfig) -> Result<Self> {
        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false); // Allow HTTPS URLs
        http_connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        if !native_certs.certs.is_empty() {
            for cert in native_certs.certs {
                if root_cert_store.add(cert).is_err() {
                    tracing::warn!("Failed to add native certificate to rustls RootCertStore");
                }
            }
            tracing::info!("Loaded {} native root certificates.", root_cert_store.len());
        }

        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, AxumBody>(https_connector);

        tracing::info!(
            connect_timeout_secs = config.connect_timeout_secs,
            "Created upstream HTTP client"
        );
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for HttpClientAdapter {
    async fn send_request(
        &self,
        mut req: Request<AxumBody>,
        read_timeout_secs: u64,
    ) -> HttpClientResult<Response<AxumBody>> {
        let client = self.client.clone();

        let upstream_identifier = format!(
            "{}://{}",
            req.uri().scheme_str().unwrap_or("http"),
            req.uri()
                .authority()
                .map_or_else(|| "unknown".to_string(), |a| a.to_string())
        );
        let request_path = req.uri().path().to_string();
        let request_method = req.method().to_string();

        let span = crate::tracing_setup::create_upstream_span(
            &upstream_identifier,
            &request_method,
            &request_path,
        );

        // The Host header must name the upstream, not the gateway.
        if let Some(host_str) = req.uri().host() {
            let host_header_val = if let Some(port) = req.uri().port() {
                HeaderValue::from_str(&format!("{host_str}:{}", port.as_u16()))
                    .unwrap_or_else(|_| HeaderValue::from_static(""))
            } else {
                HeaderValue::from_str(host_str).unwrap_or_else(|_| HeaderValue::from_static(""))
            };
            if !host_header_val.is_empty() {
                req.headers_mut().insert(header::HOST, host_header_val);
            }
        } else {
            tracing::error!("Outgoing URI has no host: {}", req.uri());
            return Err(HttpClientError::InvalidRequest(
                "Outgoing URI has no host".to_string(),
            ));
        }

        let (mut parts, body) = req.into_parts();
        parts.version = Version::HTTP_11;
        let outgoing_request = Request::from_parts(parts, body);

        let method_for_error_log = outgoing_request.method().clone();
        let uri_for_error_log = outgoing_request.uri().clone();

        // Bound the wait for the response head; the body streams unbounded
        // afterwards (large media downloads must not be cut off mid-stream).
        let outcome = timeout(
            Duration::from_secs(read_timeout_secs),
            client.request(outgoing_request),
        )
        .instrument(span.clone())
        .await;

        match outcome {
            Ok(Ok(response)) => {
                let status_code = response.status().as_u16();
                span.record("http.status_code", status_code);

                let (mut parts, hyper_body) = response.into_parts();

                // The body is re-framed on the way back out; stale framing
                // headers would conflict with what Axum writes.
                parts.headers.remove(header::TRANSFER_ENCODING);

                Ok(Response::from_parts(parts, AxumBody::new(hyper_body)))
            }
            Ok(Err(e)) => {
                span.record("http.status_code", 599u16);

                if error_chain_has_length_limit(&e) {
                    tracing::warn!(
                        "Request body limit tripped while streaming to {}",
                        upstream_identifier
                    );
                    return Err(HttpClientError::BodyTooLarge);
                }

                tracing::error!(
                    "Error making request to upstream {} ({} {}): {}",
                    upstream_identifier,
                    method_for_error_log,
                    uri_for_error_log,
                    e
                );

                Err(HttpClientError::ConnectionError(format!(
                    "Request to {method_for_error_log} {uri_for_error_log} failed: {e}"
                )))
            }
            Err(_) => {
                span.record("http.status_code", 599u16);
                tracing::warn!(
                    "Upstream {} did not answer within {}s",
                    upstream_identifier,
                    read_timeout_secs
                );
                Err(HttpClientError::Timeout(read_timeout_secs))
            }
        }
    }

    async fn health_check(&self, url: &str, timeout_secs: u64) -> HttpClientResult<bool> {
        let client = self.client.clone();

        let request = Request::builder()
            .method("HEAD")
            .uri(url)
            .version(Version::HTTP_11)
            .body(AxumBody::empty())
            .map_err(|e| HttpClientError::InvalidRequest(e.to_string()))?;

        tracing::debug!("Probing URL: {}", url);
        let timeout_duration = Duration::from_secs(timeout_secs);

        match timeout(timeout_duration, client.request(request)).await {
            Ok(result) => match result {
                Ok(response) => {
                    let is_reachable = response.status().is_success();
                    // Consume the body to return the connection to the pool
                    let _ = response.into_body().collect().await;
                    tracing::debug!("Probe for {} result: {}", url, is_reachable);
                    Ok(is_reachable)
                }
                Err(err) => {
                    tracing::debug!("Probe error for {}: {}", url, err);
                    Ok(false)
                }
            },
            Err(_) => {
                tracing::debug!("Probe timeout for {}", url);
                Err(HttpClientError::Timeout(timeout_secs))
            }
        }
    }
}

/// Walk an error's source chain looking for the body-limit marker that
/// `http_body_util::Limited` produces when the inbound stream runs past the
/// configured maximum.
fn error_chain_has_length_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if e.is::<http_body_util::LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}
