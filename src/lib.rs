pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod health;
pub mod proxy;
pub mod rate_limit;
pub mod registry;
pub mod router;

use crate::auth::TokenVerifier;
use crate::config::GatewayConfig;
use crate::cors::CorsConfig;
use crate::error::{GatewayError, Result};
use crate::health::{health_all_handler, health_handler};
use crate::proxy::{gateway_handler, GatewayState};
use crate::rate_limit::RateLimiterService;
use crate::registry::BackendRegistry;
use crate::router::RouteTable;
use axum::{
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the gateway's axum application from validated configuration.
///
/// The health endpoints are served by the gateway itself and sit outside
/// the routing chain, so they bypass authentication and rate limiting.
pub fn build_app(config: &GatewayConfig) -> Result<Router> {
    let table = RouteTable::new(&config.routes)?;
    info!("Loaded {} routes", table.patterns().len());

    let registry = BackendRegistry::new(&config.services);
    info!("Registered {} backend services", registry.len());

    let verifier = TokenVerifier::new(&config.auth.secret);
    let limiter = RateLimiterService::new(&config.rate_limits);

    let state = GatewayState::new(
        table,
        registry,
        verifier,
        limiter,
        Duration::from_secs(config.server.forward_timeout_secs),
        Duration::from_secs(config.server.health_timeout_secs),
    )?;

    let cors = CorsConfig::default().build_layer()?;

    Ok(Router::new()
        .route("/health", get(health_handler))
        .route("/health/all", get(health_all_handler))
        .route("/*path", any(gateway_handler))
        // "/" never matches the wildcard; answer with the usual envelope
        .fallback(|uri: axum::http::Uri| async move {
            GatewayError::EndpointNotFound(uri.path().to_string())
        })
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// Start the gateway server
pub async fn init_gateway(config: GatewayConfig) -> Result<()> {
    config.validate()?;

    info!("Starting API gateway");
    info!(
        "Server listening on {}:{}",
        config.server.host, config.server.port
    );

    let app = build_app(&config)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(GatewayError::Io)?;

    info!("Gateway ready to accept connections");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| GatewayError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitegate=debug,tower_http=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();
}
