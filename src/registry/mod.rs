use crate::error::{GatewayError, Result};
use std::collections::HashMap;

/// Static mapping from logical service name to backend base address.
///
/// Populated once from configuration; never mutated at request time.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    services: HashMap<String, String>,
}

impl BackendRegistry {
    /// Build the registry from the configured service map, normalizing
    /// trailing slashes so URL joining stays uniform.
    pub fn new(services: &HashMap<String, String>) -> Self {
        let services = services
            .iter()
            .map(|(name, url)| (name.clone(), url.trim_end_matches('/').to_string()))
            .collect();

        Self { services }
    }

    /// Resolve a logical service name to its base address.
    ///
    /// Route validation guarantees every configured route points at a known
    /// service, so a miss here is a configuration defect.
    pub fn resolve(&self, service: &str) -> Result<&str> {
        self.services
            .get(service)
            .map(String::as_str)
            .ok_or_else(|| GatewayError::Config(format!("Unknown service: {}", service)))
    }

    /// All registered (name, base address) pairs, for health aggregation
    pub fn all(&self) -> impl Iterator<Item = (&str, &str)> {
        self.services
            .iter()
            .map(|(name, url)| (name.as_str(), url.as_str()))
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
