//! Key-scoped limiter registry.
//!
//! A [`LimiterRegistry`] hands every key its own [`TokenBucket`](crate::TokenBucket),
//! created lazily on first use, and evicts keys that stay idle for longer than the
//! configured idle timeout from a background task.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::runtime::Handle;
use tracing::{debug, info, trace};

use crate::clock::{Clock, MonotonicClock};
use crate::error::ConfigError;
use crate::rate_limit::store::EntryStore;
use crate::rate_limit::sweeper::Sweeper;
use crate::rate_limit::{Decision, Quota};

/// Sweep period used by [`RegistryBuilder`] when none is set.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// Idle timeout used by [`RegistryBuilder`] when none is set.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(180);

/// Validated configuration for a [`LimiterRegistry`].
///
/// `sweep_interval` (how often idle keys are looked for) and `idle_timeout`
/// (how long a key may go unused before it is evicted) are independent.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    sweep_interval: Duration,
    idle_timeout: Duration,
    quota: Quota,
}

impl RegistryConfig {
    /// Create a config with validation. Both durations must be non-zero.
    pub fn new(
        sweep_interval: Duration,
        quota: Quota,
        idle_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if sweep_interval.is_zero() {
            return Err(ConfigError::InvalidSweepInterval(sweep_interval));
        }
        if idle_timeout.is_zero() {
            return Err(ConfigError::InvalidIdleTimeout(idle_timeout));
        }
        Ok(Self { sweep_interval, idle_timeout, quota })
    }

    /// Period between background sweeps.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Inactivity after which a key is evicted.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Quota the registry was constructed with.
    pub fn quota(&self) -> Quota {
        self.quota
    }
}

/// Builder for [`LimiterRegistry`].
///
/// Durations default to [`DEFAULT_SWEEP_INTERVAL`] and [`DEFAULT_IDLE_TIMEOUT`].
/// Rate and burst have no defaults; `build` fails if either is missing.
#[derive(Debug, Clone)]
pub struct RegistryBuilder {
    sweep_interval: Duration,
    idle_timeout: Duration,
    rate: Option<f64>,
    burst: Option<u32>,
    clock: Arc<dyn Clock>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            rate: None,
            burst: None,
            clock: Arc::new(MonotonicClock::default()),
        }
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Period between background sweeps; must be > 0.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Inactivity after which a key is evicted; must be > 0.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sustained permits per second for each key.
    pub fn rate(mut self, per_second: f64) -> Self {
        self.rate = Some(per_second);
        self
    }

    /// Maximum instantaneous permits for each key.
    pub fn burst(mut self, burst: u32) -> Self {
        self.burst = Some(burst);
        self
    }

    /// Set rate and burst from an already validated quota.
    pub fn quota(self, quota: Quota) -> Self {
        self.rate(quota.rate()).burst(quota.burst())
    }

    /// Override the clock (useful for deterministic tests).
    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Validate the configuration and start the registry.
    ///
    /// Must be called from within a tokio runtime, which hosts the sweeper.
    pub fn build(self) -> Result<LimiterRegistry, ConfigError> {
        let quota = Quota::new(self.rate.unwrap_or(0.0), self.burst.unwrap_or(0))?;
        let config = RegistryConfig::new(self.sweep_interval, quota, self.idle_timeout)?;
        LimiterRegistry::start(config, self.clock)
    }
}

/// State shared between the registry and its sweeper.
#[derive(Debug)]
pub(crate) struct RegistryState {
    store: EntryStore,
    quota: ArcSwap<Quota>,
    idle_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl RegistryState {
    pub(crate) fn sweep(&self) -> usize {
        let (evicted, remaining) = self.store.evict_idle(self.clock.now(), self.idle_timeout);
        if evicted > 0 {
            debug!(target: "keylimit::registry", evicted, remaining, "evicted idle keys");
        }
        evicted
    }
}

/// Per-key token-bucket rate limiter.
///
/// Every key gets an independent bucket, created full on first use. All
/// operations take `&self`, so a registry is shared across threads and tasks by
/// reference or behind an `Arc`. Dropping the registry stops its sweeper.
///
/// # Examples
/// ```
/// use keylimit::LimiterRegistry;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let registry = LimiterRegistry::new(
///         Duration::from_secs(60),
///         5.0,
///         10,
///         Duration::from_secs(180),
///     )
///     .unwrap();
///
///     for _ in 0..10 {
///         assert!(!registry.limit("203.0.113.7"));
///     }
///     assert!(registry.limit("203.0.113.7"));
///
///     registry.shutdown().await;
/// }
/// ```
#[derive(Debug)]
pub struct LimiterRegistry {
    state: Arc<RegistryState>,
    config: RegistryConfig,
    sweeper: Sweeper,
}

impl LimiterRegistry {
    /// Create a registry and start its sweeper.
    ///
    /// `rate` is in permits per second. Errors if `rate` is not a positive finite
    /// number, `burst` is zero, either duration is zero, or no tokio runtime is
    /// running.
    pub fn new(
        sweep_interval: Duration,
        rate: f64,
        burst: u32,
        idle_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Self::builder()
            .sweep_interval(sweep_interval)
            .rate(rate)
            .burst(burst)
            .idle_timeout(idle_timeout)
            .build()
    }

    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Create a registry from a validated config, using the monotonic clock.
    pub fn with_config(config: RegistryConfig) -> Result<Self, ConfigError> {
        Self::start(config, Arc::new(MonotonicClock::default()))
    }

    fn start(config: RegistryConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        let state = Arc::new(RegistryState {
            store: EntryStore::new(),
            quota: ArcSwap::from_pointee(config.quota),
            idle_timeout: config.idle_timeout,
            clock,
        });
        let sweeper = Sweeper::spawn(&runtime, Arc::downgrade(&state), config.sweep_interval);
        Ok(Self { state, config, sweeper })
    }

    /// Take one permit for `key`. Returns `true` if the caller should be throttled.
    pub fn limit(&self, key: &str) -> bool {
        self.check(key).is_limited()
    }

    /// Take one permit for `key`, reporting the remaining budget or the wait
    /// until the next permit.
    ///
    /// Creates the key's bucket on first use and refreshes its idle timer whether
    /// or not a permit is granted.
    pub fn check(&self, key: &str) -> Decision {
        let state = &self.state;
        let access = state.store.acquire(key, state.clock.now(), || **state.quota.load());
        if access.created {
            debug!(target: "keylimit::registry", key, "admitted new key");
        }
        if let Decision::Denied { wait } = access.decision {
            trace!(target: "keylimit::registry", key, ?wait, "limited");
        }
        access.decision
    }

    /// Forget `key`, resetting its budget. Returns whether an entry existed.
    pub fn remove_entry(&self, key: &str) -> bool {
        let removed = self.state.store.remove(key);
        if removed {
            debug!(target: "keylimit::registry", key, "removed key");
        }
        removed
    }

    /// Whether `key` currently has an entry.
    pub fn contains(&self, key: &str) -> bool {
        self.state.store.contains(key)
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.state.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run one eviction pass now. Returns the number of keys evicted.
    pub fn sweep(&self) -> usize {
        self.state.sweep()
    }

    /// Quota applied to keys created from now on.
    pub fn quota(&self) -> Quota {
        **self.state.quota.load()
    }

    /// Replace the quota for keys created after this call.
    ///
    /// Existing keys keep the quota they were created with until they are
    /// removed or evicted.
    pub fn set_quota(&self, quota: Quota) {
        info!(
            target: "keylimit::registry",
            rate = quota.rate(),
            burst = quota.burst(),
            "quota updated"
        );
        self.state.quota.store(Arc::new(quota));
    }

    /// Configuration the registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Whether the background sweeper is still running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }

    /// Stop the sweeper and wait for it to exit. Idempotent.
    ///
    /// The registry keeps answering [`limit`](Self::limit) afterwards; idle keys
    /// are then only dropped by [`sweep`](Self::sweep) or [`remove_entry`](Self::remove_entry).
    pub async fn shutdown(&self) {
        self.sweeper.shutdown().await;
        info!(target: "keylimit::registry", keys = self.len(), "sweeper shut down");
    }
}
