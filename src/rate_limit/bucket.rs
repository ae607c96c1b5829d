use std::time::Duration;

use crate::rate_limit::{secs_ceil, Decision, Quota};

/// Slack for float rounding so that waiting exactly one replenish interval
/// always yields a permit.
const EPSILON: f64 = 1e-9;

/// A continuous-time token bucket.
///
/// Replenishes tokens at `rate` per second, up to `burst`. Time is passed in
/// explicitly by the caller as an offset from a shared [`Clock`](crate::Clock)
/// origin, so the bucket itself holds no clock and no lock.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    quota: Quota,
    tokens: f64,
    last_refill: Duration,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(quota: Quota, now: Duration) -> Self {
        Self { quota, tokens: f64::from(quota.burst()), last_refill: now }
    }

    /// Quota this bucket was created with.
    pub fn quota(&self) -> Quota {
        self.quota
    }

    /// Tokens available as of the last refill (fractional).
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Attempt to take one permit at `now`.
    pub fn acquire(&mut self, now: Duration) -> Decision {
        self.refill(now);

        if self.tokens + EPSILON >= 1.0 {
            self.tokens = (self.tokens - 1.0).max(0.0);
            Decision::Allowed { remaining: self.tokens.floor() as u32 }
        } else {
            let missing = 1.0 - self.tokens;
            Decision::Denied { wait: secs_ceil(missing / self.quota.rate()) }
        }
    }

    /// `true` if a permit was available and consumed.
    pub fn allow(&mut self, now: Duration) -> bool {
        self.acquire(now).is_allowed()
    }

    fn refill(&mut self, now: Duration) {
        // A reading older than the last refill counts as no elapsed time.
        let elapsed = now.saturating_sub(self.last_refill).as_secs_f64();
        let burst = f64::from(self.quota.burst());
        self.tokens = (self.tokens + elapsed * self.quota.rate()).min(burst);
        self.last_refill = self.last_refill.max(now);
    }
}
