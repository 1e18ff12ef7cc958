use std::{sync::Arc, time::Duration};

use eyre::Result;
use tokio::time::sleep;

use crate::{core::GatewayService, ports::http_client::HttpClient};

/// Health checker adapter probing upstream reachability.
///
/// One probe per configured service per round, each with its own bounded
/// timeout. A failed probe marks only that service unreachable; the gateway
/// keeps proxying to every other upstream, and to the failed one too — the
/// registry feeds `/health`, it does not gate routing.
pub struct HealthChecker {
    gateway_service: Arc<GatewayService>,
    http_client: Arc<dyn HttpClient>,
}

impl HealthChecker {
    pub fn new(gateway_service: Arc<GatewayService>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            gateway_service,
            http_client,
        }
    }

    /// Run the health checker loop.
    pub async fn run(&self) -> Result<()> {
        let health_config = self.gateway_service.health_config();

        if !health_config.enabled {
            tracing::info!("Health checking is disabled");
            return Ok(());
        }

        let interval = Duration::from_secs(health_config.interval_secs);

        tracing::info!(
            "Starting health checker with interval: {}s, timeout: {}s, path: {}",
            health_config.interval_secs,
            health_config.timeout_secs,
            health_config.path
        );

        loop {
            // Sleep at the beginning to allow the server to start up
            sleep(interval).await;
            self.run_probe_round().await;
        }
    }

    /// Probe every configured upstream once and record the outcomes.
    pub async fn run_probe_round(&self) {
        let health_config = self.gateway_service.health_config();
        let timeout_secs = health_config.timeout_secs;
        let probe_path = health_config.path.clone();

        let mut services_to_probe = Vec::new();
        self.gateway_service.upstream_health().iter_sync(|service, health| {
            services_to_probe.push((service.clone(), health.url().to_string()));
            true
        });

        for (service, base_url) in services_to_probe {
            let probe_url = format!("{base_url}{probe_path}");
            tracing::debug!(service = %service, url = %probe_url, "probing upstream");

            let reachable = match self.http_client.health_check(&probe_url, timeout_secs).await {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!(service = %service, error = %err, "probe failed");
                    false
                }
            };

            let was_reachable = self
                .gateway_service
                .upstream_health()
                .read_sync(service.as_str(), |_, h| h.is_reachable())
                .unwrap_or(true);

            if reachable != was_reachable {
                if reachable {
                    tracing::info!(service = %service, "upstream is reachable again");
                } else {
                    tracing::warn!(service = %service, "upstream is UNREACHABLE");
                }
            }

            self.gateway_service.record_probe(&service, reachable);
        }

        tracing::debug!("probe round completed");
    }
}
