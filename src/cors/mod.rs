use crate::error::{GatewayError, Result};
use axum::http::{HeaderName, Method};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// CORS configuration: all origins permitted, explicit allow-lists for
/// methods and headers. Preflight OPTIONS requests are answered by the
/// layer without reaching the routing chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed HTTP methods
    #[serde(default = "default_methods")]
    pub allowed_methods: Vec<String>,
    /// Allowed request headers
    #[serde(default = "default_headers")]
    pub allowed_headers: Vec<String>,
    /// Headers exposed to browser callers
    #[serde(default = "default_exposed")]
    pub exposed_headers: Vec<String>,
    /// Max age for preflight cache in seconds
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
}

fn default_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_headers() -> Vec<String> {
    vec![
        "Content-Type".to_string(),
        "Authorization".to_string(),
        "X-Request-ID".to_string(),
    ]
}

fn default_exposed() -> Vec<String> {
    vec!["X-Request-ID".to_string()]
}

fn default_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_methods: default_methods(),
            allowed_headers: default_headers(),
            exposed_headers: default_exposed(),
            max_age_secs: default_max_age(),
        }
    }
}

impl CorsConfig {
    /// Build a CorsLayer from this configuration
    pub fn build_layer(&self) -> Result<CorsLayer> {
        let methods = self
            .allowed_methods
            .iter()
            .map(|m| Method::from_bytes(m.as_bytes()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| GatewayError::Config(format!("Invalid CORS method: {}", e)))?;

        let headers = parse_header_names(&self.allowed_headers)?;
        let exposed = parse_header_names(&self.exposed_headers)?;

        Ok(CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(methods)
            .allow_headers(headers)
            .expose_headers(exposed)
            .max_age(Duration::from_secs(self.max_age_secs)))
    }
}

fn parse_header_names(names: &[String]) -> Result<Vec<HeaderName>> {
    names
        .iter()
        .map(|h| {
            h.parse::<HeaderName>()
                .map_err(|e| GatewayError::Config(format!("Invalid CORS header name: {}", e)))
        })
        .collect()
}
