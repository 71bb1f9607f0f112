//! `PolicyChain` — an ordered stack of policies built innermost-first.
//!
//! ```text
//! PolicyChain::first(A).then(B).then(C)
//!
//! caller → [C] → [B] → [A] → action
//! ```
//!
//! Position 0 (the policy given to `first`) sits closest to the action.
//! The last `then` is the outermost layer: it is entered first and sees
//! every outcome last.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::compose::{invoke, invoke_async};
use crate::error::ChainError;
use crate::policy::{AsyncAction, Outcome, Policy, SharedPolicy, SyncAction};

/// An ordered, append-only sequence of policies.
///
/// Execution never consumes the chain: every call walks the same layers in
/// the same order, so one chain can be run any number of times and shared
/// between tasks.
pub struct PolicyChain<E> {
    /// Index 0 is the innermost layer.
    layers: Vec<SharedPolicy<E>>,
}

impl<E> PolicyChain<E> {
    /// Start a chain. `policy` becomes the innermost layer.
    pub fn first<P>(policy: P) -> Self
    where
        P: Policy<E> + 'static,
    {
        Self::first_shared(Arc::new(policy))
    }

    /// Start a chain from an already shared policy.
    pub fn first_shared(policy: SharedPolicy<E>) -> Self {
        Self {
            layers: vec![policy],
        }
    }

    /// Start a chain from a policy that may be absent, e.g. the result of a
    /// lookup.
    pub fn try_first(policy: Option<SharedPolicy<E>>) -> Result<Self, ChainError> {
        policy
            .map(Self::first_shared)
            .ok_or(ChainError::MissingPolicy { position: 0 })
    }

    /// Wrap the chain built so far in `policy`, which becomes the new
    /// outermost layer.
    pub fn then<P>(self, policy: P) -> Self
    where
        P: Policy<E> + 'static,
    {
        self.then_shared(Arc::new(policy))
    }

    /// Append an already shared policy as the new outermost layer.
    pub fn then_shared(mut self, policy: SharedPolicy<E>) -> Self {
        self.layers.push(policy);
        self
    }

    /// Append a policy that may be absent.
    pub fn try_then(self, policy: Option<SharedPolicy<E>>) -> Result<Self, ChainError> {
        match policy {
            Some(policy) => Ok(self.then_shared(policy)),
            None => Err(ChainError::MissingPolicy {
                position: self.layers.len(),
            }),
        }
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if the chain has no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers innermost-first, in the order they were added.
    pub fn layers(&self) -> &[SharedPolicy<E>] {
        &self.layers
    }

    /// Layer names in activation order (outermost first).
    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().rev().map(|p| (**p).name()).collect()
    }
}

impl<E> Clone for PolicyChain<E> {
    fn clone(&self) -> Self {
        Self {
            layers: self.layers.clone(),
        }
    }
}

impl<E> FromIterator<SharedPolicy<E>> for PolicyChain<E> {
    /// Collect policies innermost-first. The result may be empty; running an
    /// empty chain fails with [`ChainError::Empty`].
    fn from_iter<I: IntoIterator<Item = SharedPolicy<E>>>(iter: I) -> Self {
        Self {
            layers: iter.into_iter().collect(),
        }
    }
}

impl<E> Extend<SharedPolicy<E>> for PolicyChain<E> {
    fn extend<I: IntoIterator<Item = SharedPolicy<E>>>(&mut self, iter: I) {
        self.layers.extend(iter);
    }
}

impl<E> fmt::Display for PolicyChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.layers.is_empty() {
            return write!(f, "<empty>");
        }
        write!(f, "{}", self.names().join(" -> "))
    }
}

impl<E> fmt::Debug for PolicyChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyChain")
            .field("layers", &self.names())
            .finish()
    }
}

/// A chain is itself a policy, so it can sit as one layer of another chain.
#[async_trait]
impl<E> Policy<E> for PolicyChain<E>
where
    E: From<ChainError> + Send + 'static,
{
    fn apply(&self, action: &mut SyncAction<'_, E>) -> Result<Outcome, E> {
        if self.layers.is_empty() {
            return Err(ChainError::Empty.into());
        }
        invoke(&self.layers, action)
    }

    async fn apply_async<'a>(&self, action: &AsyncAction<'a, E>) -> Result<Outcome, E> {
        if self.layers.is_empty() {
            return Err(ChainError::Empty.into());
        }
        invoke_async(&self.layers, action).await
    }

    fn name(&self) -> &str {
        "chain"
    }
}
