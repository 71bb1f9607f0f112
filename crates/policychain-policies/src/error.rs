//! Rejections raised by the stock policies themselves.

use thiserror::Error;

/// A policy refused to run, or stopped waiting for, its callback.
///
/// Chains carrying these policies need an error type with
/// `From<Rejection>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Circuit breaker is open, so the call was not attempted.
    #[error("circuit breaker open")]
    CircuitOpen,

    /// Token bucket is empty.
    #[error("rate limit exceeded, next token in {wait_ms}ms")]
    RateLimited { wait_ms: u64 },

    /// The callback did not finish in time.
    #[error("timed out after {ms}ms")]
    Timeout { ms: u64 },
}

impl Rejection {
    /// Returns `true` if trying again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Timeout { .. })
    }
}
