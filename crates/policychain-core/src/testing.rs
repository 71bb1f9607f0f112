//! Stub policies for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ChainError;
use crate::policy::{AsyncAction, Outcome, Policy, SyncAction};

#[derive(Debug, Error)]
pub enum TestError {
    #[error("divide by zero")]
    DivideByZero,
    #[error("invalid argument")]
    Argument,
    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl TestError {
    pub fn is_divide_by_zero(&self) -> bool {
        matches!(self, Self::DivideByZero)
    }

    pub fn is_argument(&self) -> bool {
        matches!(self, Self::Argument)
    }
}

/// Route engine traces to the test harness; `RUST_LOG` overrides the level.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("policychain_core=trace"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Shared log of layer entries.
#[derive(Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn layer(&self, name: &'static str) -> RecordingLayer {
        RecordingLayer {
            name,
            recorder: self.clone(),
        }
    }

    pub fn push(&self, entry: &str) {
        self.log.lock().unwrap().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

/// Logs its name on entry, then runs the callback once.
pub struct RecordingLayer {
    name: &'static str,
    recorder: Recorder,
}

#[async_trait]
impl<E: Send + 'static> Policy<E> for RecordingLayer {
    fn apply(&self, action: &mut SyncAction<'_, E>) -> Result<Outcome, E> {
        self.recorder.push(self.name);
        action()
    }

    async fn apply_async<'a>(&self, action: &AsyncAction<'a, E>) -> Result<Outcome, E> {
        self.recorder.push(self.name);
        action().await
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Retries once when the failure matches.
pub struct RetryOnce {
    matches: fn(&TestError) -> bool,
}

impl RetryOnce {
    pub fn on(matches: fn(&TestError) -> bool) -> Self {
        Self { matches }
    }
}

#[async_trait]
impl Policy<TestError> for RetryOnce {
    fn apply(&self, action: &mut SyncAction<'_, TestError>) -> Result<Outcome, TestError> {
        match action() {
            Err(e) if (self.matches)(&e) => action(),
            outcome => outcome,
        }
    }

    async fn apply_async<'a>(
        &self,
        action: &AsyncAction<'a, TestError>,
    ) -> Result<Outcome, TestError> {
        match action().await {
            Err(e) if (self.matches)(&e) => action().await,
            outcome => outcome,
        }
    }

    fn name(&self) -> &str {
        "retry_once"
    }
}

/// Swallows every failure.
pub struct Suppress;

#[async_trait]
impl Policy<TestError> for Suppress {
    fn apply(&self, action: &mut SyncAction<'_, TestError>) -> Result<Outcome, TestError> {
        let _ = action();
        Ok(Box::new(()) as Outcome)
    }

    async fn apply_async<'a>(
        &self,
        action: &AsyncAction<'a, TestError>,
    ) -> Result<Outcome, TestError> {
        let _ = action().await;
        Ok(Box::new(()) as Outcome)
    }

    fn name(&self) -> &str {
        "suppress"
    }
}

/// Replaces any failure with a fixed value.
pub struct Fallback {
    value: u32,
}

impl Fallback {
    pub fn with(value: u32) -> Self {
        Self { value }
    }
}

#[async_trait]
impl Policy<TestError> for Fallback {
    fn apply(&self, action: &mut SyncAction<'_, TestError>) -> Result<Outcome, TestError> {
        action().or_else(|_| Ok(Box::new(self.value) as Outcome))
    }

    async fn apply_async<'a>(
        &self,
        action: &AsyncAction<'a, TestError>,
    ) -> Result<Outcome, TestError> {
        action().await.or_else(|_| Ok(Box::new(self.value) as Outcome))
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

/// Runs the callback twice and keeps the first outcome.
pub struct KeepFirst;

#[async_trait]
impl Policy<TestError> for KeepFirst {
    fn apply(&self, action: &mut SyncAction<'_, TestError>) -> Result<Outcome, TestError> {
        let first = action();
        let _ = action();
        first
    }

    async fn apply_async<'a>(
        &self,
        action: &AsyncAction<'a, TestError>,
    ) -> Result<Outcome, TestError> {
        let first = action().await;
        let _ = action().await;
        first
    }

    fn name(&self) -> &str {
        "keep_first"
    }
}
