use async_trait::async_trait;
use axum::body::Body as AxumBody;
use hyper::{Request, Response};
use thiserror::Error;

/// Custom error type for upstream HTTP client operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpClientError {
    /// Error when connection to the upstream fails
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when the upstream does not answer in time
    #[error("Timeout error after {0} seconds")]
    Timeout(u64),

    /// Error when the inbound body tripped its size limit while streaming
    #[error("Request body exceeded the configured limit")]
    BodyTooLarge,

    /// Error when request is invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for HTTP client operations
pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// HttpClient defines the port (interface) for talking to upstream services.
///
/// The adapter behind it owns connection pooling; a pooled connection is
/// handed to exactly one in-flight request at a time (checkout/return, never
/// concurrent sharing).
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Send an HTTP request to an upstream, streaming both bodies.
    ///
    /// `read_timeout_secs` bounds the wait for the response head; exceeding
    /// it aborts only this request.
    async fn send_request(
        &self,
        req: Request<AxumBody>,
        read_timeout_secs: u64,
    ) -> HttpClientResult<Response<AxumBody>>;

    /// Perform a bounded reachability probe against a URL.
    ///
    /// Returns `Ok(true)`/`Ok(false)` for reachable/unreachable; `Err` is
    /// reserved for probes that could not be attempted at all.
    async fn health_check(&self, url: &str, timeout_secs: u64) -> HttpClientResult<bool>;
}
