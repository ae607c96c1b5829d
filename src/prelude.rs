//! Convenient re-exports for common keylimit types.
pub use crate::{
    clock::{Clock, MonotonicClock},
    error::ConfigError,
    rate_limit::{Decision, Quota},
    registry::{LimiterRegistry, RegistryBuilder, RegistryConfig},
};
