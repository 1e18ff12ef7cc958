//! Request-level error taxonomy and its HTTP mapping.
//!
//! Every error leaving the gateway carries a stable machine-readable `error`
//! kind and nothing else: no stack traces, no upstream addresses, and no
//! hint about why a token failed (the three auth failures are deliberately
//! indistinguishable on the wire).
use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::core::auth::AuthError;

/// Failures a single proxied request can surface to the client.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    /// No route rule covers the request path.
    #[error("no route matches the request path")]
    RouteNotFound,

    /// The request body exceeded the configured maximum.
    #[error("request body exceeds the configured limit")]
    PayloadTooLarge,

    /// Bearer token verification failed at the gateway.
    #[error("authentication failed: {0}")]
    Unauthorized(#[from] AuthError),

    /// The upstream could not be reached. Detail is for logs only.
    #[error("upstream connection failed: {0}")]
    UpstreamUnreachable(String),

    /// The upstream did not produce a response in time.
    #[error("upstream timed out after {0}s")]
    UpstreamTimeout(u64),
}

impl GatewayError {
    /// Stable machine-readable kind, the only detail clients receive.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound => "route_not_found",
            GatewayError::PayloadTooLarge => "payload_too_large",
            GatewayError::Unauthorized(_) => "unauthorized",
            GatewayError::UpstreamUnreachable(_) => "upstream_unreachable",
            GatewayError::UpstreamTimeout(_) => "upstream_timeout",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound => StatusCode::NOT_FOUND,
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        // Full detail stays in the logs; the wire gets the kind only.
        match &self {
            GatewayError::Unauthorized(reason) => {
                tracing::debug!(reason = %reason, "rejecting unauthenticated request")
            }
            other => tracing::warn!(error = %other, "request failed at the gateway"),
        }

        let body = serde_json::json!({ "error": self.kind() });
        Response::builder()
            .status(self.status())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|_| {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            })
    }
}
