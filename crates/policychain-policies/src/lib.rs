//! policychain-policies — ready-made layers for a `PolicyChain`.
//!
//! Every type here implements [`policychain_core::Policy`] and can be
//! stacked in any order:
//!
//! ```text
//! PolicyChain::first(RetryPolicy)        // innermost: retry transient failures
//!     .then(CircuitBreaker)              // fail fast while the target is down
//!     .then(RateLimiter)                 // shed load before anything runs
//!     .then(FallbackPolicy)              // outermost: answer with a substitute value
//! ```
//!
//! Layers that refuse or abandon a call report it as a [`Rejection`], so a
//! chain's error type needs `From<Rejection>` to carry them.

pub mod circuit_breaker;
pub mod error;
pub mod fallback;
pub mod rate_limiter;
pub mod retry;
pub mod timeout;

use std::sync::Arc;
use std::time::Duration;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use error::Rejection;
pub use fallback::FallbackPolicy;
pub use rate_limiter::{RateLimiter, RateLimiterConfig, TokenBucket};
pub use retry::{RetryConfig, RetryPolicy};
pub use timeout::TimeoutPolicy;

/// Decides whether a policy acts on a failure.
pub type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// No predicate means every failure is handled.
pub(crate) fn handles<E>(predicate: &Option<Predicate<E>>, error: &E) -> bool {
    predicate.as_ref().map_or(true, |p| p(error))
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
