//! mediagate - a stateless front door for a two-service media platform.
//!
//! mediagate sits in front of an identity service and a media service and
//! gives them one public address. It is deliberately small: a streaming
//! reverse proxy, a shared-secret auth bridge, and a host-aware URL resolver,
//! with no session store, no shared database, and no coordination mechanism
//! beyond HTTP headers and one signing secret. That is what lets any number
//! of gateway processes run side by side with no affinity.
//!
//! # Features
//! - Longest-prefix routing over a static, immutable route table
//! - Per-route trailing-slash policy (the two upstreams disagree on purpose)
//! - Streaming request/response forwarding with a hard body-size cap
//! - Forwarded-chain propagation (`X-Forwarded-Host`/`-Proto`/`-For`),
//!   appended per hop with the original client-facing entry authoritative
//! - Stateless HS256 bearer verification usable by the gateway and both
//!   upstreams against the same shared secret
//! - Absolute URL resolution for stored files, embedded by the media service
//! - Periodic upstream reachability probes behind a local `/health` endpoint
//! - Graceful shutdown with a bounded drain window
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use mediagate::{GatewayService, config::GatewayConfig};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let cfg: GatewayConfig = mediagate::config::load_config("config.toml").await?;
//! let gateway = Arc::new(GatewayService::new(Arc::new(cfg), None));
//! // Wire this into the provided HttpHandler adapter (see the binary crate)
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations)
//! while keeping business logic inside `core`. `core` performs no I/O at
//! all: token verification, forwarded-context derivation, URL resolution and
//! route matching are pure functions over immutable data, which is what
//! makes the concurrency story trivial — the only mutable state shared
//! between requests is the upstream health registry, and that is atomics.
//!
//! # Error Handling
//! Request-level failures map to a closed taxonomy (`GatewayError`) with
//! stable machine-readable kinds; startup plumbing returns `eyre::Result`
//! with context attached via `WrapErr`.
// Re-export public modules with explicit visibility controls
pub mod config;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;
pub mod ports;

// Re-export the specific types needed by the binary crate and embedders
pub use crate::{
    adapters::{HealthChecker, HttpClientAdapter, HttpHandler},
    core::{
        ForwardedContext, GatewayService, Principal, SharedSecret, TokenVerifier, UrlResolver,
    },
    ports::http_client::HttpClient,
    utils::GracefulShutdown,
};
