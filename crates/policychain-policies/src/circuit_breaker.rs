//! Circuit breaker layer.
//!
//! ```text
//! Closed ──failure_threshold failures──▶ Open ──open_duration──▶ HalfOpen
//!    ▲                                    ▲                         │
//!    └──────success_threshold trials──────┼─────────────────────────┤
//!                                         └──────trial fails────────┘
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use policychain_core::{AsyncAction, Outcome, Policy, SyncAction};
use serde::{Deserialize, Serialize};

use crate::error::Rejection;
use crate::{handles, Predicate};

/// Observable circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        })
    }
}

/// Configuration for the circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive counted failures that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before letting trial calls through.
    pub open_duration_ms: u64,
    /// Successful trial calls needed to close the circuit again.
    pub success_threshold: u32,
}

impl CircuitBreakerConfig {
    pub fn open_duration(&self) -> Duration {
        Duration::from_millis(self.open_duration_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration_ms: 30_000,
            success_threshold: 1,
        }
    }
}

/// State plus the counter that belongs to it.
#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed { failures: u32 },
    Open { since: Instant },
    HalfOpen { successes: u32 },
}

impl Phase {
    fn state(&self) -> CircuitState {
        match self {
            Self::Closed { .. } => CircuitState::Closed,
            Self::Open { .. } => CircuitState::Open,
            Self::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Let an expired open phase start probing.
    fn settle(&mut self, config: &CircuitBreakerConfig) {
        if let Self::Open { since } = *self {
            if since.elapsed() >= config.open_duration() {
                *self = Self::HalfOpen { successes: 0 };
                tracing::info!("circuit half-open");
            }
        }
    }

    fn succeed(&mut self, config: &CircuitBreakerConfig) {
        *self = match *self {
            Self::HalfOpen { successes } if successes + 1 >= config.success_threshold => {
                tracing::info!("circuit closed");
                Self::Closed { failures: 0 }
            }
            Self::HalfOpen { successes } => Self::HalfOpen {
                successes: successes + 1,
            },
            Self::Closed { .. } => Self::Closed { failures: 0 },
            // Outcome of a call admitted before the circuit opened.
            open @ Self::Open { .. } => open,
        };
    }

    fn fail(&mut self, config: &CircuitBreakerConfig) {
        *self = match *self {
            Self::Closed { failures } if failures + 1 >= config.failure_threshold => {
                tracing::warn!(failures = failures + 1, "circuit opened");
                Self::Open {
                    since: Instant::now(),
                }
            }
            Self::Closed { failures } => Self::Closed {
                failures: failures + 1,
            },
            Self::HalfOpen { .. } => {
                tracing::warn!("trial call failed, circuit reopened");
                Self::Open {
                    since: Instant::now(),
                }
            }
            open @ Self::Open { .. } => open,
        };
    }
}

/// Rejects calls with [`Rejection::CircuitOpen`] while the circuit is open.
///
/// Every call it lets through is recorded: a success moves the circuit
/// toward closed, a failure matching the `handle` predicate toward open.
/// Other failures pass through uncounted. Clones share one circuit, so a
/// breaker can guard several chains at once.
pub struct CircuitBreaker<E> {
    config: CircuitBreakerConfig,
    phase: Arc<Mutex<Phase>>,
    handles: Option<Predicate<E>>,
}

impl<E> CircuitBreaker<E> {
    /// A closed circuit.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            phase: Arc::new(Mutex::new(Phase::Closed { failures: 0 })),
            handles: None,
        }
    }

    /// Only count failures for which `predicate` returns `true`.
    pub fn handle<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.handles = Some(Arc::new(predicate));
        self
    }

    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state. An open circuit whose `open_duration` has passed
    /// reports half-open.
    pub fn state(&self) -> CircuitState {
        let mut phase = self.lock();
        phase.settle(&self.config);
        phase.state()
    }

    pub fn is_allowed(&self) -> bool {
        self.state() != CircuitState::Open
    }

    pub fn record_success(&self) {
        self.lock().succeed(&self.config);
    }

    pub fn record_failure(&self) {
        self.lock().fail(&self.config);
    }

    fn admit(&self) -> Result<(), Rejection> {
        if self.is_allowed() {
            Ok(())
        } else {
            tracing::debug!("circuit open, call rejected");
            Err(Rejection::CircuitOpen)
        }
    }

    fn record<T>(&self, outcome: &Result<T, E>) {
        match outcome {
            Ok(_) => self.record_success(),
            Err(e) if handles(&self.handles, e) => self.record_failure(),
            Err(_) => {}
        }
    }
}

impl<E> Clone for CircuitBreaker<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            phase: self.phase.clone(),
            handles: self.handles.clone(),
        }
    }
}

impl<E> fmt::Debug for CircuitBreaker<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("state", &self.state())
            .finish()
    }
}

#[async_trait]
impl<E> Policy<E> for CircuitBreaker<E>
where
    E: From<Rejection> + Send + 'static,
{
    fn apply(&self, action: &mut SyncAction<'_, E>) -> Result<Outcome, E> {
        self.admit()?;
        let outcome = action();
        self.record(&outcome);
        outcome
    }

    async fn apply_async<'a>(&self, action: &AsyncAction<'a, E>) -> Result<Outcome, E> {
        self.admit()?;
        let outcome = action().await;
        self.record(&outcome);
        outcome
    }

    fn name(&self) -> &str {
        "circuit_breaker"
    }
}
