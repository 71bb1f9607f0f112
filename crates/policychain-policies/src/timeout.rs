//! Deadline on each call through the layer.
//!
//! The async path races the callback against `tokio::time::timeout` and
//! drops it when the deadline passes. The blocking path cannot preempt the
//! caller's thread: it runs the callback to completion and only logs an
//! overrun.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use policychain_core::{AsyncAction, Outcome, Policy, SyncAction};

use crate::error::Rejection;

/// Fails async calls that outlive `timeout` with [`Rejection::Timeout`].
///
/// Requires a Tokio runtime with the time driver enabled on the async path.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutPolicy {
    timeout: Duration,
}

impl TimeoutPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn timeout_ms(&self) -> u64 {
        crate::millis(self.timeout)
    }
}

#[async_trait]
impl<E> Policy<E> for TimeoutPolicy
where
    E: From<Rejection> + Send + 'static,
{
    fn apply(&self, action: &mut SyncAction<'_, E>) -> Result<Outcome, E> {
        let start = Instant::now();
        let outcome = action();
        let elapsed = start.elapsed();
        if elapsed > self.timeout {
            tracing::warn!(
                elapsed_ms = crate::millis(elapsed),
                timeout_ms = self.timeout_ms(),
                "blocking call overran its timeout"
            );
        }
        outcome
    }

    async fn apply_async<'a>(&self, action: &AsyncAction<'a, E>) -> Result<Outcome, E> {
        match tokio::time::timeout(self.timeout, action()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let ms = self.timeout_ms();
                tracing::debug!(timeout_ms = ms, "call timed out");
                Err(Rejection::Timeout { ms }.into())
            }
        }
    }

    fn name(&self) -> &str {
        "timeout"
    }
}
