//! Configuration data structures for mediagate.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files.
//! They are intentionally serde-friendly and include defaults so that minimal
//! configs remain concise. The whole configuration is loaded once at startup
//! and never mutated afterwards; in particular the route set is fixed for the
//! lifetime of the process.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level gateway configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GatewayConfig {
    /// The address the gateway listens on.
    pub listen_addr: String,
    /// Public base URL handed to embedded URL resolvers as the fallback for
    /// requests that carry no forwarded context.
    pub public_base_url: Option<String>,
    /// Shared-secret configuration for the auth bridge.
    pub auth: AuthConfig,
    /// Request body limits.
    pub limits: LimitsConfig,
    /// Upstream HTTP client behavior.
    pub upstream_client: UpstreamClientConfig,
    /// Upstream reachability probing.
    pub health_check: HealthCheckConfig,
    /// Path prefix to upstream routing rules.
    pub routes: HashMap<String, RouteRule>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            public_base_url: None,
            auth: AuthConfig::default(),
            limits: LimitsConfig::default(),
            upstream_client: UpstreamClientConfig::default(),
            health_check: HealthCheckConfig::default(),
            routes: HashMap::new(),
        }
    }
}

/// Where the shared signing secret comes from.
///
/// The environment variable always wins; the inline value exists for local
/// development configs only.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Environment variable holding the secret shared with both upstreams.
    pub secret_env: String,
    /// Inline secret for development setups.
    pub secret: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_env: "JWT_SIGNING_KEY".to_string(),
            secret: None,
        }
    }
}

/// Request body limits enforced at the proxy.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound request body size in bytes.
    pub max_body_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            // 100 MiB, sized for media uploads.
            max_body_bytes: 100 * 1024 * 1024,
        }
    }
}

/// Timeouts applied to every upstream call.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UpstreamClientConfig {
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Time allowed for the upstream to produce a response head.
    pub read_timeout_secs: u64,
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            read_timeout_secs: 30,
        }
    }
}

/// Health check configuration for upstream reachability probes.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Whether periodic probing is enabled.
    pub enabled: bool,
    /// Seconds between probe rounds.
    pub interval_secs: u64,
    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,
    /// Path probed on each upstream base URL.
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            timeout_secs: 5,
            path: "/health".to_string(),
        }
    }
}

/// One routing rule: requests whose path starts with the map key are
/// forwarded to `upstream`.
///
/// The two upstreams in this deployment disagree about trailing slashes on
/// purpose (the identity service's paths end in `/`, the media service's do
/// not), so the slash policy is per rule rather than global.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RouteRule {
    /// Base URL of the upstream service, e.g. `http://127.0.0.1:8000`.
    pub upstream: String,
    /// Logical service name, used for health reporting. Several rules may
    /// name the same service.
    pub service: String,
    /// `true` keeps the upstream's slash-terminated convention: the bare
    /// prefix gains a trailing slash and everything else passes through
    /// untouched. `false` strips trailing slashes instead.
    #[serde(default)]
    pub preserve_trailing_slash: bool,
    /// Verify the bearer token at the gateway before forwarding.
    #[serde(default)]
    pub require_auth: bool,
}
