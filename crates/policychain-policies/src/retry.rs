//! Exponential backoff retry policy with optional jitter.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use policychain_core::{AsyncAction, Outcome, Policy, SyncAction};
use serde::{Deserialize, Serialize};

use crate::{handles, Predicate};

/// Configuration for the retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the first try).
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds (caps exponential growth).
    pub max_backoff_ms: u64,
    /// Multiplier applied to backoff on each retry.
    pub multiplier: f64,
    /// Add `jitter_fraction * backoff / 2` on top of each delay (0.0 = no jitter).
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
            multiplier: 2.0,
            jitter_fraction: 0.1,
        }
    }
}

/// Retries its callback while the failure matches the `handle` predicate.
///
/// Non-matching failures and exhausted retries return the callback's own
/// error unchanged.
pub struct RetryPolicy<E> {
    config: RetryConfig,
    handles: Option<Predicate<E>>,
}

impl<E> RetryPolicy<E> {
    /// Retry every failure according to `config`.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            handles: None,
        }
    }

    /// Retry up to `max_retries` times without waiting between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(RetryConfig {
            max_retries,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            multiplier: 1.0,
            jitter_fraction: 0.0,
        })
    }

    /// Only retry failures for which `predicate` returns `true`.
    pub fn handle<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.handles = Some(Arc::new(predicate));
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Returns the delay before the `attempt`-th retry (1-based).
    /// Returns `None` if `attempt` exceeds `max_retries`.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.config.max_retries {
            return None;
        }
        let base_ms = self.config.initial_backoff_ms as f64
            * self.config.multiplier.powi((attempt - 1) as i32);
        let cap_ms = self.config.max_backoff_ms as f64;
        let capped = base_ms.min(cap_ms);

        // Deterministic half-jitter keeps delays reproducible.
        let jitter_ms = capped * self.config.jitter_fraction * 0.5;
        let total_ms = (capped + jitter_ms) as u64;

        Some(Duration::from_millis(total_ms))
    }

    /// Delay before the next attempt, or `None` when the failure should be
    /// returned as is.
    fn plan(&self, attempt: u32, error: &E) -> Option<Duration> {
        if !handles(&self.handles, error) {
            return None;
        }
        match self.next_delay(attempt) {
            Some(delay) => {
                tracing::warn!(attempt, delay_ms = crate::millis(delay), "retrying call");
                Some(delay)
            }
            None => {
                tracing::debug!(attempt, "max retries exceeded");
                None
            }
        }
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            handles: self.handles.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl<E: Send + 'static> Policy<E> for RetryPolicy<E> {
    fn apply(&self, action: &mut SyncAction<'_, E>) -> Result<Outcome, E> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let error = match action() {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            match self.plan(attempt, &error) {
                Some(delay) if !delay.is_zero() => std::thread::sleep(delay),
                Some(_) => {}
                None => return Err(error),
            }
        }
    }

    async fn apply_async<'a>(&self, action: &AsyncAction<'a, E>) -> Result<Outcome, E> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let error = match action().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            match self.plan(attempt, &error) {
                Some(delay) if !delay.is_zero() => tokio::time::sleep(delay).await,
                Some(_) => {}
                None => return Err(error),
            }
        }
    }

    fn name(&self) -> &str {
        "retry"
    }
}
