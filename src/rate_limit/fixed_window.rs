use super::types::{CounterKey, RateLimitPolicy};
use dashmap::DashMap;
use tracing::debug;

/// Counter value plus the instant its window closes, so stale entries can
/// be swept without knowing which policy produced them.
#[derive(Debug)]
struct Counter {
    count: u64,
    window_ends_at: u64,
}

/// In-memory fixed-window counter store.
///
/// Time is partitioned into non-overlapping windows per policy; each
/// (client, policy, window) triple owns one counter. Increments go through
/// the map's per-shard entry lock, so concurrent bursts cannot lose
/// updates. Counters keep counting past the cap, which keeps admission
/// denied for the rest of the window.
///
/// Known property of the strategy: a client can burst up to 2x a policy's
/// cap across a window boundary.
pub struct FixedWindowLimiter {
    counters: DashMap<CounterKey, Counter>,
}

/// Sweep stale windows once the table grows past this many entries.
const PRUNE_THRESHOLD: usize = 10_000;

impl FixedWindowLimiter {
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }

    /// Record a request against the policy's current window and report
    /// whether it is admitted.
    pub fn check(&self, client: &str, policy: &RateLimitPolicy) -> bool {
        self.check_at(client, policy, unix_now())
    }

    /// Same as [`check`](Self::check) with an explicit clock reading.
    pub fn check_at(&self, client: &str, policy: &RateLimitPolicy, now_secs: u64) -> bool {
        let key = CounterKey::new(client, policy, now_secs);
        let window_ends_at = (policy.window_index(now_secs) + 1) * policy.window_secs;

        let count = {
            let mut entry = self.counters.entry(key).or_insert(Counter {
                count: 0,
                window_ends_at,
            });
            entry.count += 1;
            entry.count
        };

        if self.counters.len() > PRUNE_THRESHOLD {
            self.prune(now_secs);
        }

        let allowed = count <= u64::from(policy.requests);
        if !allowed {
            debug!(
                client = %client,
                policy = %policy.name,
                count,
                limit = policy.requests,
                "Rate limit counter saturated"
            );
        }
        allowed
    }

    /// Drop counters whose window has already closed.
    fn prune(&self, now_secs: u64) {
        let before = self.counters.len();
        self.counters.retain(|_, c| c.window_ends_at > now_secs);
        debug!(
            removed = before - self.counters.len(),
            remaining = self.counters.len(),
            "Pruned stale rate-limit counters"
        );
    }

    /// Number of live counters (for tests and monitoring)
    pub fn active_counters(&self) -> usize {
        self.counters.len()
    }
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
