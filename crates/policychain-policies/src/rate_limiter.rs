//! Token bucket rate limiter.
//!
//! Tokens accrue at `refill_rate` tokens/second up to `capacity`. Each call
//! through the limiter consumes `cost` tokens; when too few are left the call
//! is rejected with [`Rejection::RateLimited`] without running.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use policychain_core::{AsyncAction, Outcome, Policy, SyncAction};
use serde::{Deserialize, Serialize};

use crate::error::Rejection;

/// Rate limiter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Maximum tokens in the bucket.
    pub capacity: f64,
    /// Token refill rate (tokens per second).
    pub refill_rate: f64,
    /// Tokens consumed per call.
    pub cost: f64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 100.0,
            refill_rate: 100.0,
            cost: 1.0,
        }
    }
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Thread-safe token bucket.
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// A full bucket.
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BucketState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Try to acquire `cost` tokens.
    ///
    /// Returns `true` if tokens were available and consumed.
    /// Returns `false` if the bucket is empty (rate limit exceeded).
    pub fn try_acquire(&self, cost: f64) -> bool {
        let mut state = self.lock();
        self.refill(&mut state);

        if state.tokens >= cost {
            state.tokens -= cost;
            true
        } else {
            false
        }
    }

    /// Returns the estimated wait time before `cost` tokens are available.
    pub fn wait_time(&self, cost: f64) -> Duration {
        let mut state = self.lock();
        self.refill(&mut state);
        let deficit = cost - state.tokens;
        if deficit <= 0.0 {
            Duration::ZERO
        } else if self.refill_rate <= 0.0 {
            Duration::MAX
        } else {
            Duration::from_secs_f64(deficit / self.refill_rate)
        }
    }

    /// Returns currently available tokens.
    pub fn available(&self) -> f64 {
        let mut state = self.lock();
        self.refill(&mut state);
        state.tokens
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
        state.last_refill = now;
    }
}

/// A chain layer that admits calls while the bucket has tokens.
pub struct RateLimiter {
    bucket: TokenBucket,
    cost: f64,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            bucket: TokenBucket::new(config.capacity, config.refill_rate),
            cost: config.cost,
        }
    }

    /// Try to take one call's worth of tokens.
    pub fn try_acquire(&self) -> bool {
        self.bucket.try_acquire(self.cost)
    }

    /// Wait time before one call's worth of tokens is available.
    pub fn wait_time(&self) -> Duration {
        self.bucket.wait_time(self.cost)
    }

    fn admit(&self) -> Result<(), Rejection> {
        if self.try_acquire() {
            return Ok(());
        }
        let wait_ms = crate::millis(self.wait_time());
        tracing::debug!(wait_ms, "rate limited");
        Err(Rejection::RateLimited { wait_ms })
    }
}

#[async_trait]
impl<E> Policy<E> for RateLimiter
where
    E: From<Rejection> + Send + 'static,
{
    fn apply(&self, action: &mut SyncAction<'_, E>) -> Result<Outcome, E> {
        self.admit()?;
        action()
    }

    async fn apply_async<'a>(&self, action: &AsyncAction<'a, E>) -> Result<Outcome, E> {
        self.admit()?;
        action().await
    }

    fn name(&self) -> &str {
        "rate_limit"
    }
}
