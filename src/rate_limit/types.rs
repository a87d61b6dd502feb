use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A named fixed-window rate-limit policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Policy name referenced by routes
    pub name: String,
    /// Maximum number of requests allowed per window
    pub requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl RateLimitPolicy {
    /// Get the window as a Duration
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Index of the window containing the given instant (seconds since epoch)
    pub fn window_index(&self, now_secs: u64) -> u64 {
        now_secs / self.window_secs
    }

    /// Fallback policy for routes that do not name one
    pub fn default_policy() -> Self {
        Self {
            name: "default".to_string(),
            requests: 100,
            window_secs: 60,
        }
    }

    /// Coarse long-window policy every request is also checked against
    pub fn global_default() -> Self {
        Self {
            name: "global".to_string(),
            requests: 1000,
            window_secs: 3600,
        }
    }
}

/// Key for one counter: a client within one policy's current window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    /// Client identity (remote address)
    pub client: String,
    /// Policy name
    pub policy: String,
    /// Window index (floor of now / window length)
    pub window: u64,
}

impl CounterKey {
    pub fn new(client: &str, policy: &RateLimitPolicy, now_secs: u64) -> Self {
        Self {
            client: client.to_string(),
            policy: policy.name.clone(),
            window: policy.window_index(now_secs),
        }
    }
}
