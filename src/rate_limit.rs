//! Per-client throttling for the checkout endpoint.
//!
//! Handlers go through the [`RateLimiter`] trait so deployments can
//! swap in a shared counter store. The bundled implementation keeps
//! its counters in process memory, which means limits are enforced per
//! instance and reset on restart. That is abuse mitigation, not a
//! guarantee.

use std::num::NonZeroU32;

use governor::{
    Quota, RateLimiter as GovernorRateLimiter, clock::DefaultClock,
    state::keyed::DefaultKeyedStateStore,
};

/// Decides whether a keyed caller may proceed right now.
pub trait RateLimiter: Send + Sync {
    fn allow(&self, key: &str) -> bool;
}

/// Keyed in-memory limiter. A key gets a burst of `per_minute`
/// requests which refill continuously over the minute.
pub struct InMemoryRateLimiter {
    limiter: GovernorRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>,
}

impl InMemoryRateLimiter {
    pub fn new(per_minute: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: GovernorRateLimiter::keyed(quota),
        }
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn allow(&self, key: &str) -> bool {
        self.limiter.check_key(&key.to_string()).is_ok()
    }
}
