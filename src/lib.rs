#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # keylimit
//!
//! Per-key rate limiting for async Rust: an in-memory admission gate that gives
//! every key (client address, API token, tenant id, ...) its own token bucket.
//!
//! ## Features
//!
//! - **Lazy buckets**: a key's bucket is created full on first use
//! - **Continuous refill**: permits accrue at `rate` per second up to `burst`
//! - **Idle eviction**: a background sweeper drops keys unused for longer than the idle timeout
//! - **Clean shutdown**: the sweeper stops on [`LimiterRegistry::shutdown`] or when the registry is dropped
//! - **Live quota updates** for keys created afterwards
//!
//! State is local to one process; nothing is coordinated across instances.
//!
//! ## Quick Start
//!
//! ```rust
//! use keylimit::LimiterRegistry;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = LimiterRegistry::builder()
//!         .rate(5.0)
//!         .burst(10)
//!         .sweep_interval(Duration::from_secs(60))
//!         .idle_timeout(Duration::from_secs(180))
//!         .build()
//!         .expect("valid configuration");
//!
//!     if registry.limit("198.51.100.4") {
//!         // reject with 429
//!     }
//!
//!     registry.shutdown().await;
//! }
//! ```

pub mod clock;
pub mod error;
pub mod prelude;
pub mod rate_limit;
pub mod registry;

// Re-exports
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::ConfigError;
pub use rate_limit::{Decision, Quota, TokenBucket};
pub use registry::{
    LimiterRegistry, RegistryBuilder, RegistryConfig, DEFAULT_IDLE_TIMEOUT, DEFAULT_SWEEP_INTERVAL,
};
