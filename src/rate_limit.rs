//! Rate limiting primitives.
//!
//! This module provides the building blocks the registry is assembled from:
//! - [`Quota`]: validated rate/burst parameters shared by newly created buckets.
//! - [`TokenBucket`]: the continuous-time token bucket, one per key.
//! - [`Decision`]: the result of a rate limit check (Allowed/Denied).
//!
//! # Architecture
//!
//! - **Logic**: `TokenBucket` (in `bucket` module) handles the math. It is a plain
//!   value with no interior locking; callers serialize access to it.
//! - **Storage**: `EntryStore` (in `store` module) owns the key → bucket map and
//!   its lock, and is the only place buckets are mutated.
//! - **Eviction**: the `sweeper` module runs the periodic idle-entry purge.

use std::time::Duration;

use crate::error::ConfigError;

pub mod bucket;
pub(crate) mod store;
pub(crate) mod sweeper;
pub use bucket::TokenBucket;

/// The decision returned by a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// The request is allowed to proceed.
    Allowed {
        /// Whole permits remaining after this acquisition.
        /// Useful for `X-RateLimit-Remaining` headers.
        remaining: u32,
    },
    /// The request is denied.
    Denied {
        /// How long until the next permit accrues.
        /// Useful for `Retry-After` headers.
        wait: Duration,
    },
}

impl Decision {
    /// Helper to check if allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    /// Helper to check if throttled.
    pub fn is_limited(&self) -> bool {
        !self.is_allowed()
    }
}

/// Validated token-bucket parameters.
///
/// `rate` is the sustained replenishment rate in permits per second and `burst`
/// the bucket ceiling. A fresh bucket starts with `burst` permits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quota {
    rate: f64,
    burst: u32,
}

impl Quota {
    /// Create a quota, rejecting non-finite or non-positive rates and a zero burst.
    ///
    /// # Examples
    /// ```
    /// use keylimit::Quota;
    /// let quota = Quota::new(5.0, 10).unwrap();
    /// assert_eq!(quota.burst(), 10);
    /// assert!(Quota::new(0.0, 10).is_err());
    /// ```
    pub fn new(rate: f64, burst: u32) -> Result<Self, ConfigError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::InvalidRate(rate));
        }
        if burst == 0 {
            return Err(ConfigError::InvalidBurst(burst));
        }
        Ok(Self { rate, burst })
    }

    /// `burst` permits per second, with a ceiling of `burst`.
    pub fn per_second(burst: std::num::NonZeroU32) -> Self {
        Self { rate: f64::from(burst.get()), burst: burst.get() }
    }

    /// Permits replenished per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Maximum instantaneous permits.
    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Time needed to accrue a single permit, rounded up to the next nanosecond.
    pub fn replenish_interval(&self) -> Duration {
        secs_ceil(1.0 / self.rate)
    }
}

/// Convert fractional seconds to a `Duration`, rounding up to whole nanoseconds.
pub(crate) fn secs_ceil(secs: f64) -> Duration {
    let nanos = (secs * 1_000_000_000.0).ceil();
    if nanos >= u64::MAX as f64 {
        Duration::from_nanos(u64::MAX)
    } else {
        Duration::from_nanos(nanos as u64)
    }
}
