//! Fixed-window rate limiting.
//!
//! Routes name a policy (strict, medium, high, ...); every rate-limited
//! request is checked against that policy and against a coarse global
//! policy that catches abusive aggregate traffic. Both must admit.

pub mod fixed_window;
pub mod types;

pub use fixed_window::FixedWindowLimiter;
pub use types::RateLimitPolicy;

use crate::config::RateLimitSettings;
use crate::error::{GatewayError, Result};
use std::collections::HashMap;
use tracing::warn;

/// Rate limiter service: named policies plus the global default, backed by
/// one shared counter store.
pub struct RateLimiterService {
    limiter: FixedWindowLimiter,
    policies: HashMap<String, RateLimitPolicy>,
    global: RateLimitPolicy,
}

impl RateLimiterService {
    /// Build the service from configuration. A "default" policy is always
    /// present; configuration may override it.
    pub fn new(settings: &RateLimitSettings) -> Self {
        let mut policies = HashMap::new();
        policies.insert("default".to_string(), RateLimitPolicy::default_policy());
        for policy in &settings.policies {
            policies.insert(policy.name.clone(), policy.clone());
        }

        Self {
            limiter: FixedWindowLimiter::new(),
            policies,
            global: settings.global.clone(),
        }
    }

    /// Check a client against the named policy and the global policy.
    ///
    /// The named policy is checked first; a rejection there short-circuits
    /// without charging the global counter.
    pub fn check(&self, client: &str, policy_name: &str) -> Result<()> {
        let policy = self.policies.get(policy_name).unwrap_or_else(|| {
            warn!(policy = %policy_name, "Unknown rate-limit policy, using default");
            &self.policies["default"]
        });

        if !self.limiter.check(client, policy) {
            return Err(GatewayError::RateLimitExceeded(policy.name.clone()));
        }

        if !self.limiter.check(client, &self.global) {
            return Err(GatewayError::RateLimitExceeded(self.global.name.clone()));
        }

        Ok(())
    }

    /// Look up a named policy (for tests and startup logging)
    pub fn policy(&self, name: &str) -> Option<&RateLimitPolicy> {
        self.policies.get(name)
    }
}
