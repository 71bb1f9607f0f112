//! Fallback value substitution.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use policychain_core::{AsyncAction, Outcome, Policy, SyncAction};

use crate::{handles, Predicate};

/// Replaces a failure with a value computed from it.
///
/// `T` must be the type the chain's caller asks for, or the chain reports
/// a result type mismatch. Failures outside the `handle` predicate pass
/// through unchanged.
pub struct FallbackPolicy<T, E> {
    substitute: Arc<dyn Fn(&E) -> T + Send + Sync>,
    handles: Option<Predicate<E>>,
}

impl<T, E> FallbackPolicy<T, E> {
    pub fn new<F>(substitute: F) -> Self
    where
        F: Fn(&E) -> T + Send + Sync + 'static,
    {
        Self {
            substitute: Arc::new(substitute),
            handles: None,
        }
    }

    /// Substitute a clone of `value` for every handled failure.
    pub fn value(value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Self::new(move |_| value.clone())
    }

    /// Only replace failures for which `predicate` returns `true`.
    pub fn handle<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.handles = Some(Arc::new(predicate));
        self
    }

    fn recover(&self, outcome: Result<Outcome, E>) -> Result<Outcome, E>
    where
        T: Send + 'static,
    {
        match outcome {
            Err(e) if handles(&self.handles, &e) => {
                tracing::debug!("substituting fallback value");
                Ok(Box::new((self.substitute)(&e)) as Outcome)
            }
            other => other,
        }
    }
}

impl<T, E> Clone for FallbackPolicy<T, E> {
    fn clone(&self) -> Self {
        Self {
            substitute: self.substitute.clone(),
            handles: self.handles.clone(),
        }
    }
}

impl<T, E> fmt::Debug for FallbackPolicy<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackPolicy")
            .field("value_type", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait]
impl<T, E> Policy<E> for FallbackPolicy<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn apply(&self, action: &mut SyncAction<'_, E>) -> Result<Outcome, E> {
        self.recover(action())
    }

    async fn apply_async<'a>(&self, action: &AsyncAction<'a, E>) -> Result<Outcome, E> {
        self.recover(action().await)
    }

    fn name(&self) -> &str {
        "fallback"
    }
}
