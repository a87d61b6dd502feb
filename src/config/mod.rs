use crate::error::{GatewayError, Result};
use crate::rate_limit::types::RateLimitPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Backend service map (logical name -> base URL)
    pub services: HashMap<String, String>,
    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limits: RateLimitSettings,
    /// Route definitions
    pub routes: Vec<RouteConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-forwarded-call timeout in seconds
    #[serde(default = "default_forward_timeout")]
    pub forward_timeout_secs: u64,
    /// Health probe timeout in seconds
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for HS256 token verification
    pub secret: String,
}

/// Rate limiting configuration: named per-route policies plus a coarse
/// global policy every request is also checked against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Named policies referenced by routes
    #[serde(default)]
    pub policies: Vec<RateLimitPolicy>,
    /// Global default policy applied to every rate-limited request
    #[serde(default = "RateLimitPolicy::global_default")]
    pub global: RateLimitPolicy,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            policies: vec![],
            global: RateLimitPolicy::global_default(),
        }
    }
}

/// Route configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Route path pattern (e.g., "/v1/orders/{id}" or "/v1/auth/{*action}")
    pub path: String,
    /// Logical backend service name
    pub service: String,
    /// Allowed HTTP methods
    pub methods: Vec<String>,
    /// Whether this route bypasses authentication
    #[serde(default)]
    pub public: bool,
    /// Named rate-limit policy for this route
    #[serde(default = "default_policy_name")]
    pub policy: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_forward_timeout() -> u64 {
    30
}

fn default_health_timeout() -> u64 {
    5
}

fn default_policy_name() -> String {
    "default".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            forward_timeout_secs: default_forward_timeout(),
            health_timeout_secs: default_health_timeout(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.auth.secret.is_empty() {
            return Err(GatewayError::Config(
                "Auth secret cannot be empty".to_string(),
            ));
        }

        for (name, base_url) in &self.services {
            let parsed = url::Url::parse(base_url).map_err(|e| {
                GatewayError::Config(format!("Invalid URL for service '{}': {}", name, e))
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(GatewayError::Config(format!(
                    "Service '{}' URL must use http or https",
                    name
                )));
            }
        }

        for policy in self
            .rate_limits
            .policies
            .iter()
            .chain(std::iter::once(&self.rate_limits.global))
        {
            if policy.requests == 0 {
                return Err(GatewayError::Config(format!(
                    "Rate limit policy '{}' must allow at least one request",
                    policy.name
                )));
            }
            if policy.window_secs == 0 {
                return Err(GatewayError::Config(format!(
                    "Rate limit policy '{}' window must be > 0",
                    policy.name
                )));
            }
        }

        for route in &self.routes {
            if route.path.is_empty() {
                return Err(GatewayError::Config(
                    "Route path cannot be empty".to_string(),
                ));
            }

            if !self.services.contains_key(&route.service) {
                return Err(GatewayError::Config(format!(
                    "Route {} references unknown service '{}'",
                    route.path, route.service
                )));
            }

            if route.methods.is_empty() {
                return Err(GatewayError::Config(format!(
                    "Route {} must list at least one method",
                    route.path
                )));
            }

            for method in &route.methods {
                let method_upper = method.to_uppercase();
                if !["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"]
                    .contains(&method_upper.as_str())
                {
                    return Err(GatewayError::Config(format!(
                        "Invalid HTTP method '{}' for route: {}",
                        method, route.path
                    )));
                }
            }

            let known_policy = route.policy == "default"
                || self
                    .rate_limits
                    .policies
                    .iter()
                    .any(|p| p.name == route.policy);
            if !known_policy {
                return Err(GatewayError::Config(format!(
                    "Route {} references unknown rate-limit policy '{}'",
                    route.path, route.policy
                )));
            }
        }

        Ok(())
    }
}
