//! policychain-core — nested policy composition for sync and async code.
//!
//! # Overview
//!
//! A [`PolicyChain`] stacks independent fault-handling policies (retry,
//! circuit breaker, rate limiter, ...) around one action. The core crate
//! defines:
//!
//! - [`Policy`] — the object-safe capability every layer implements, over
//!   type-erased [`Outcome`] values so a layer can substitute a result
//! - [`PolicyChain`] — the `first(..).then(..)` builder and its executors
//!   (`run`, `execute`, `run_async`, `execute_async`)
//! - [`ChainError`] — the few failures the engine itself can produce
//! - [`registry`] module — named policies and config-driven chains
//!
//! ```text
//! PolicyChain::first(retry).then(breaker).then(limiter)
//!
//! caller → [limiter] → [breaker] → [retry] → action
//! ```
//!
//! Each layer behaves exactly as if it had been applied by hand around the
//! layers inside it. Failures from the action or from any layer reach the
//! caller unchanged unless an outer layer decides otherwise.

pub mod chain;
mod compose;
pub mod error;
pub mod policy;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::PolicyChain;
pub use error::ChainError;
pub use policy::{AsyncAction, Outcome, Policy, SharedPolicy, SyncAction};
pub use registry::{ChainConfig, PolicyRegistry};
