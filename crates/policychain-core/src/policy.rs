//! The `Policy` trait — the capability every chain layer implements.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

/// Type-erased value produced by a callback.
///
/// The engine boxes whatever the caller's function returns. Layers pass it
/// back untouched or return a substitute of their own; the engine downcasts
/// the outcome of the outermost layer to the type the caller asked for.
pub type Outcome = Box<dyn Any + Send>;

/// Callback handed to a layer on the blocking path.
///
/// Invoking it runs everything inside the layer: the next-inner layer, or
/// the caller's function when the layer is innermost.
pub type SyncAction<'a, E> = dyn FnMut() -> Result<Outcome, E> + 'a;

/// Callback handed to a layer on the async path.
///
/// Each call returns a fresh `Send` future for one run of everything inside
/// the layer. The future holds no reference to the callback itself, so a
/// layer may create and await several of them in sequence.
pub type AsyncAction<'a, E> = dyn Fn() -> BoxFuture<'a, Result<Outcome, E>> + Send + Sync + 'a;

/// A policy shared between chains (or between positions of one chain).
pub type SharedPolicy<E> = Arc<dyn Policy<E>>;

/// A fault-handling unit that wraps a callback.
///
/// Implementations may invoke the callback zero, one or many times. They may
/// return any outcome the callback produced, replace a failure with a
/// substitute value, swallow it, or raise their own error. Callers must not
/// assume the callback runs exactly once.
///
/// A substitute must have the type the caller expects from the chain, or
/// `()` for callers that only run an action. Anything else surfaces as
/// [`ChainError::ResultType`](crate::ChainError::ResultType).
///
/// # Object Safety
/// The trait is object-safe and is stored as `Arc<dyn Policy<E>>` inside a
/// [`PolicyChain`](crate::PolicyChain).
#[async_trait]
pub trait Policy<E>: Send + Sync {
    /// Run `action` under this policy on the caller's thread.
    fn apply(&self, action: &mut SyncAction<'_, E>) -> Result<Outcome, E>;

    /// Run `action` under this policy, awaiting every invocation.
    async fn apply_async<'a>(&self, action: &AsyncAction<'a, E>) -> Result<Outcome, E>;

    /// Label used in traces and chain descriptions.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

#[async_trait]
impl<E, P> Policy<E> for Arc<P>
where
    E: Send + 'static,
    P: Policy<E> + ?Sized,
{
    fn apply(&self, action: &mut SyncAction<'_, E>) -> Result<Outcome, E> {
        (**self).apply(action)
    }

    async fn apply_async<'a>(&self, action: &AsyncAction<'a, E>) -> Result<Outcome, E> {
        (**self).apply_async(action).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
