//! Error types for limiter construction.
use std::time::Duration;

/// Errors produced when validating limiter configuration.
///
/// Every variant is a construction-time fault; once a registry exists its
/// operations cannot fail.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Rate must be finite and > 0.
    #[error("rate must be a finite number of permits per second > 0 (got {0})")]
    InvalidRate(f64),
    /// Burst must be >= 1.
    #[error("burst must be >= 1 (got {0})")]
    InvalidBurst(u32),
    /// Sweep interval must be > 0.
    #[error("sweep_interval must be > 0 (got {0:?})")]
    InvalidSweepInterval(Duration),
    /// Idle timeout must be > 0.
    #[error("idle_timeout must be > 0 (got {0:?})")]
    InvalidIdleTimeout(Duration),
    /// The background sweeper needs a tokio runtime to run on.
    #[error("no tokio runtime available to host the sweeper")]
    NoRuntime,
}
