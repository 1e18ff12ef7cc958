//! Core gateway orchestration service.
//!
//! The `GatewayService` aggregates the immutable configuration
//! (`GatewayConfig`) with per-process runtime state: the static route table,
//! the shared-secret token verifier, and the upstream health registry. It
//! provides:
//! * Longest-prefix route lookup
//! * Health status snapshots and the composite reachability answer
//! * Access to the verifier for gateway-side bearer pre-validation
//!
//! This layer deliberately avoids I/O and only manipulates in-memory data so
//! it remains fast and easily testable in isolation. Everything except the
//! health flags is read-only after construction, which is what keeps the
//! request path lock-free.
use std::sync::Arc;

use scc::HashMap;

use crate::{
    config::models::{GatewayConfig, HealthCheckConfig},
    core::{
        auth::{SharedSecret, TokenVerifier},
        routes::{RouteMatch, RouteTable},
        upstream::{HealthSnapshot, UpstreamHealth, UpstreamUrl},
    },
};

/// Central orchestrator for routing, auth bridging and health reporting.
/// An instance is cheap to share (`Arc` fields inside).
pub struct GatewayService {
    config: Arc<GatewayConfig>,
    routes: RouteTable,
    upstream_health: Arc<HashMap<String, UpstreamHealth>>,
    verifier: Option<Arc<TokenVerifier>>,
}

impl GatewayService {
    /// Create a new gateway service from a configuration snapshot.
    ///
    /// The health registry is pre-built with one entry per distinct
    /// `(service, upstream)` pair so the request path never allocates.
    /// `secret` is optional: a deployment with no `require_auth` route can
    /// run without one.
    pub fn new(config: Arc<GatewayConfig>, secret: Option<SharedSecret>) -> Self {
        let routes = RouteTable::from_config(&config.routes);
        let upstream_health = Arc::new(HashMap::new());

        for (service, upstream) in routes.upstreams() {
            match UpstreamUrl::new(&upstream) {
                Ok(url) => {
                    let _ = upstream_health
                        .insert_sync(service.clone(), UpstreamHealth::new(service, url));
                }
                Err(e) => {
                    // Validation rejects these before startup; guard anyway.
                    tracing::error!(service = %service, error = %e, "skipping invalid upstream");
                }
            }
        }

        let verifier = secret.map(|s| Arc::new(TokenVerifier::new(&s)));

        Self {
            config,
            routes,
            upstream_health,
            verifier,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Longest-prefix match to find a route rule for an incoming path.
    pub fn find_matching_route(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.match_path(path)
    }

    pub fn verifier(&self) -> Option<&Arc<TokenVerifier>> {
        self.verifier.as_ref()
    }

    /// Return the global health check configuration.
    pub fn health_config(&self) -> &HealthCheckConfig {
        &self.config.health_check
    }

    /// Access the concurrent health registry (mainly for the checker).
    pub fn upstream_health(&self) -> &HashMap<String, UpstreamHealth> {
        &self.upstream_health
    }

    /// Record one probe outcome for a service.
    pub fn record_probe(&self, service: &str, reachable: bool) {
        let _ = self.upstream_health.read_sync(service, |_, health| {
            if reachable {
                health.mark_reachable();
            } else {
                health.mark_unreachable();
            }
        });
    }

    /// Per-service health entries, ordered by service name for stable
    /// output.
    pub fn health_snapshots(&self) -> Vec<HealthSnapshot> {
        let mut snapshots = Vec::new();
        self.upstream_health.iter_sync(|_, health| {
            snapshots.push(health.snapshot());
            true
        });
        snapshots.sort_by(|a, b| a.service.cmp(&b.service));
        snapshots
    }

    /// Composite answer reported by `GET /health`: true only when every
    /// configured upstream is reachable.
    pub fn all_upstreams_reachable(&self) -> bool {
        let mut all = true;
        self.upstream_health.iter_sync(|_, health| {
            if !health.is_reachable() {
                all = false;
            }
            true
        });
        all
    }
}
