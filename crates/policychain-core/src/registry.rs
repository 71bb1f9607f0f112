//! Named policies and config-driven chain assembly.
//!
//! A [`ChainConfig`] lists layer names innermost-first, the same order as
//! `first(..).then(..)`:
//!
//! ```json
//! { "layers": ["retry", "circuit_breaker", "rate_limit"] }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chain::PolicyChain;
use crate::error::ChainError;
use crate::policy::{Policy, SharedPolicy};

/// Layer layout for one chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Registered policy names, innermost first.
    #[serde(default)]
    pub layers: Vec<String>,
}

impl ChainConfig {
    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, ChainError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Registry of shared policies, looked up by name when building chains.
pub struct PolicyRegistry<E> {
    policies: HashMap<String, SharedPolicy<E>>,
}

impl<E> PolicyRegistry<E> {
    pub fn new() -> Self {
        Self {
            policies: HashMap::new(),
        }
    }

    /// Register `policy` under `name`, replacing any previous entry.
    pub fn register<P>(&mut self, name: impl Into<String>, policy: P)
    where
        P: Policy<E> + 'static,
    {
        self.register_shared(name, Arc::new(policy));
    }

    /// Register an already shared policy under `name`.
    pub fn register_shared(&mut self, name: impl Into<String>, policy: SharedPolicy<E>) {
        let name = name.into();
        tracing::debug!(policy = %name, "registered policy");
        self.policies.insert(name, policy);
    }

    /// Look up a policy by name.
    pub fn get(&self, name: &str) -> Option<SharedPolicy<E>> {
        self.policies.get(name).cloned()
    }

    /// Number of registered policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Assemble the chain described by `config`.
    ///
    /// Fails with [`ChainError::EmptyConfig`] for an empty layer list and
    /// [`ChainError::UnknownPolicy`] for a name that was never registered.
    pub fn build(&self, config: &ChainConfig) -> Result<PolicyChain<E>, ChainError> {
        let mut names = config.layers.iter();
        let first = names.next().ok_or(ChainError::EmptyConfig)?;

        let mut chain = PolicyChain::first_shared(self.resolve(first)?);
        for name in names {
            chain = chain.then_shared(self.resolve(name)?);
        }
        tracing::debug!(chain = %chain, "built policy chain");
        Ok(chain)
    }

    fn resolve(&self, name: &str) -> Result<SharedPolicy<E>, ChainError> {
        self.get(name).ok_or_else(|| ChainError::UnknownPolicy {
            name: name.to_string(),
        })
    }
}

impl<E> Default for PolicyRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
