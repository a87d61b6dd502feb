use crate::proxy::GatewayState;
use axum::{extract::State, Json};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Gateway liveness envelope
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
}

/// Aggregated readiness of the gateway plus every registered backend
#[derive(Debug, Serialize)]
pub struct AggregateHealth {
    pub status: &'static str,
    pub service: &'static str,
    pub services: BTreeMap<String, &'static str>,
}

/// `GET /health`: the gateway's own liveness. Exempt from authentication
/// and rate limiting.
pub async fn health_handler() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        service: "api-gateway",
    })
}

/// `GET /health/all`: probe every registered backend's `/health`
/// concurrently with the short-timeout client and aggregate the results.
pub async fn health_all_handler(State(state): State<GatewayState>) -> Json<AggregateHealth> {
    let probes = state.registry.all().map(|(name, base_url)| {
        let client = state.health_client.clone();
        let name = name.to_string();
        let url = format!("{}/health", base_url);
        async move {
            let healthy = match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => true,
                Ok(response) => {
                    warn!(service = %name, status = %response.status(), "Backend unhealthy");
                    false
                }
                Err(e) => {
                    warn!(service = %name, error = %e, "Backend health probe failed");
                    false
                }
            };
            (name, healthy)
        }
    });

    let results = join_all(probes).await;

    let mut services = BTreeMap::new();
    let mut all_healthy = true;
    for (name, healthy) in results {
        services.insert(name, if healthy { "healthy" } else { "unreachable" });
        all_healthy &= healthy;
    }

    debug!(healthy = all_healthy, checked = services.len(), "Health aggregation complete");

    Json(AggregateHealth {
        status: if all_healthy { "healthy" } else { "degraded" },
        service: "api-gateway",
        services,
    })
}
