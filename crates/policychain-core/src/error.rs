//! Engine-level error types.
//!
//! These are the only failures the engine itself produces. Everything an
//! action or a wrapped policy raises passes through untouched.

use thiserror::Error;

/// Errors raised by chain construction and execution.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A policy slot was given no policy.
    #[error("missing policy at chain position {position}")]
    MissingPolicy { position: usize },

    /// A configured layer name has no registered policy.
    #[error("unknown policy '{name}'")]
    UnknownPolicy { name: String },

    /// The chain has no layers to wrap the action in.
    #[error("there are no policies to execute")]
    Empty,

    /// A chain config lists no layers.
    #[error("chain config lists no layers")]
    EmptyConfig,

    /// The outermost layer returned a value of another type than the caller
    /// asked for, e.g. a layer swallowed a failure and returned `()`.
    #[error("policy chain did not produce a value of type {expected}")]
    ResultType { expected: &'static str },

    /// Chain configuration could not be parsed.
    #[error("invalid chain config: {0}")]
    Config(#[from] serde_json::Error),
}

impl ChainError {
    /// Returns `true` for build-time argument errors.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::MissingPolicy { .. }
                | Self::UnknownPolicy { .. }
                | Self::EmptyConfig
                | Self::Config(_)
        )
    }

    /// Returns `true` if the chain had nothing to execute.
    pub fn is_empty_chain(&self) -> bool {
        matches!(self, Self::Empty)
    }
}
