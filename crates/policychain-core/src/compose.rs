//! Folding a chain around an action, on the blocking and async paths.
//!
//! Both paths walk the layer slice from its last element (outermost) to its
//! first (innermost). Each layer receives a callback that re-enters the fold
//! one index further in, so however often a layer invokes its callback, every
//! invocation passes through all inner layers before reaching the action.
//!
//! The fold adds no behavior of its own. Outcomes travel back out exactly as
//! each layer returns them; only the outermost one is unboxed for the caller.

use std::any::{type_name, Any};
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::chain::PolicyChain;
use crate::error::ChainError;
use crate::policy::{AsyncAction, Outcome, SharedPolicy, SyncAction};

/// Run `action` inside `layers` on the caller's thread.
pub(crate) fn invoke<E>(
    layers: &[SharedPolicy<E>],
    action: &mut SyncAction<'_, E>,
) -> Result<Outcome, E> {
    match layers.split_last() {
        None => action(),
        Some((outer, inner)) => {
            tracing::trace!(layer = inner.len(), policy = outer.name(), "entering layer");
            (**outer).apply(&mut || invoke(inner, &mut *action))
        }
    }
}

/// Build the future that runs `action` inside `layers`.
///
/// Every future here is `Send` and depends on no executor-specific state,
/// so resumption after any inner await can happen on whichever thread the
/// driving executor picks.
pub(crate) fn invoke_async<'s, 'a: 's, E>(
    layers: &'s [SharedPolicy<E>],
    action: &'s AsyncAction<'a, E>,
) -> BoxFuture<'s, Result<Outcome, E>>
where
    E: Send + 'static,
{
    match layers.split_last() {
        None => action(),
        Some((outer, inner)) => async move {
            tracing::trace!(layer = inner.len(), policy = outer.name(), "entering layer");
            let next = move || invoke_async(inner, action);
            (**outer).apply_async(&next).await
        }
        .boxed(),
    }
}

fn erase<T: Send + 'static>(value: T) -> Outcome {
    Box::new(value)
}

/// Unbox the outermost outcome as the caller's type.
fn unbox<T: Any, E: From<ChainError>>(outcome: Outcome) -> Result<T, E> {
    outcome.downcast::<T>().map(|value| *value).map_err(|_| {
        ChainError::ResultType {
            expected: type_name::<T>(),
        }
        .into()
    })
}

impl<E> PolicyChain<E>
where
    E: From<ChainError> + Send + 'static,
{
    /// Run `action` inside every layer of the chain.
    ///
    /// Fails with [`ChainError::Empty`] before anything runs if the chain
    /// has no layers. Whatever value a layer hands back is discarded, so a
    /// layer that swallows a failure makes the call succeed.
    pub fn run<F>(&self, mut action: F) -> Result<(), E>
    where
        F: FnMut() -> Result<(), E>,
    {
        if self.is_empty() {
            return Err(ChainError::Empty.into());
        }
        invoke(self.layers(), &mut || action().map(erase)).map(drop)
    }

    /// Run `func` inside every layer of the chain and return its value.
    ///
    /// The value is whichever outcome the outermost layer returns: one the
    /// layers let through from `func`, or a substitute a layer produced. A
    /// substitute of another type fails the call with
    /// [`ChainError::ResultType`].
    pub fn execute<T, F>(&self, mut func: F) -> Result<T, E>
    where
        T: Send + 'static,
        F: FnMut() -> Result<T, E>,
    {
        if self.is_empty() {
            return Err(ChainError::Empty.into());
        }
        let outcome = invoke(self.layers(), &mut || func().map(erase))?;
        unbox(outcome)
    }

    /// Async counterpart of [`run`](Self::run).
    pub async fn run_async<F, Fut>(&self, action: F) -> Result<(), E>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<(), E>> + Send,
    {
        if self.is_empty() {
            return Err(ChainError::Empty.into());
        }
        let terminal = || action().map(|outcome| outcome.map(erase)).boxed();
        invoke_async(self.layers(), &terminal).await.map(drop)
    }

    /// Async counterpart of [`execute`](Self::execute).
    pub async fn execute_async<T, F, Fut>(&self, func: F) -> Result<T, E>
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if self.is_empty() {
            return Err(ChainError::Empty.into());
        }
        let terminal = || func().map(|outcome| outcome.map(erase)).boxed();
        let outcome = invoke_async(self.layers(), &terminal).await?;
        unbox(outcome)
    }
}
