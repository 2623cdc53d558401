//! Retry executor
//!
//! Runs an async operation with a per-attempt timeout and exponential
//! backoff. Each failed attempt is recorded in the shared [`Diagnostics`]
//! sink before the executor either sleeps or gives up. The durable write
//! runs on the blocking pool.
//!
//! # Timeouts and cancellation
//!
//! When an attempt times out its future is dropped and no longer polled.
//! Work the operation handed to other tasks is not stopped by that; use
//! [`RetryExecutor::execute_cancellable`], which passes each attempt a
//! [`CancellationToken`] that is cancelled on timeout.

use crate::config::{RetryConfig, RetryOverrides};
use crate::error::{AttemptError, RetryError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use studio_diagnostics::{Diagnostics, ErrorLogEntry};
use tokio_util::sync::CancellationToken;

/// Retry-with-backoff executor
///
/// Cheap to share: holds the base config, the diagnostics handle, and a
/// shutdown token that cancels every execution still in flight.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    base: RetryConfig,
    diagnostics: Arc<Diagnostics>,
    shutdown: CancellationToken,
}

impl RetryExecutor {
    /// Create executor with default config
    #[must_use]
    pub fn new(diagnostics: Arc<Diagnostics>) -> Self {
        Self {
            base: RetryConfig::default(),
            diagnostics,
            shutdown: CancellationToken::new(),
        }
    }

    /// With base config (overrides are merged over it per call)
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: RetryConfig) -> Self {
        self.base = config;
        self
    }

    /// With shutdown token
    #[inline]
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Base config
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.base
    }

    /// Shared diagnostics sink
    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    /// Run `operation` until it succeeds or the attempt budget is spent
    ///
    /// # Arguments
    /// * `operation` - Re-invoked verbatim for each attempt
    /// * `session_id` - Correlation id for log entries
    /// * `overrides` - Per-call adjustments to the base config
    ///
    /// # Errors
    /// - `RetryError::InvalidConfig` before any attempt if the merged config is invalid
    /// - `RetryError::RetriesExhausted` after `max_attempts` failures
    /// - `RetryError::Cancelled` if the executor is shut down mid-execution
    pub async fn execute<T, E, F, Fut>(
        &self,
        mut operation: F,
        session_id: &str,
        overrides: RetryOverrides,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error,
    {
        let never = CancellationToken::new();
        self.run(|_| operation(), session_id, overrides, |_, _| {}, &never)
            .await
    }

    /// Like [`execute`](Self::execute), calling `on_retry(attempt, delay)`
    /// after each failed non-final attempt, before the backoff sleep
    ///
    /// # Errors
    /// Same as [`execute`](Self::execute)
    pub async fn execute_with_retry_callback<T, E, F, Fut, R>(
        &self,
        mut operation: F,
        session_id: &str,
        overrides: RetryOverrides,
        on_retry: R,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error,
        R: FnMut(u32, Duration),
    {
        let never = CancellationToken::new();
        self.run(|_| operation(), session_id, overrides, on_retry, &never)
            .await
    }

    /// Cancellation-aware execution
    ///
    /// Each attempt receives a child of `cancel`. The child is cancelled when
    /// the attempt times out; cancelling `cancel` itself ends the execution.
    ///
    /// # Errors
    /// Same as [`execute`](Self::execute)
    pub async fn execute_cancellable<T, E, F, Fut, R>(
        &self,
        operation: F,
        session_id: &str,
        overrides: RetryOverrides,
        on_retry: R,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error,
        R: FnMut(u32, Duration),
    {
        self.run(operation, session_id, overrides, on_retry, cancel)
            .await
    }

    async fn run<T, E, F, Fut, R>(
        &self,
        mut operation: F,
        session_id: &str,
        overrides: RetryOverrides,
        mut on_retry: R,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error,
        R: FnMut(u32, Duration),
    {
        let config = self.base.merge(&overrides);
        config.validate()?;

        let mut attempt = 0;
        loop {
            if self.shutdown.is_cancelled() || cancel.is_cancelled() {
                tracing::info!(
                    session_id,
                    attempts = attempt,
                    "Execution cancelled before attempt"
                );
                return Err(RetryError::Cancelled { attempts: attempt });
            }

            attempt += 1;
            let attempt_token = cancel.child_token();

            let failure = tokio::select! {
                biased;
                () = self.stopped(cancel) => {
                    attempt_token.cancel();
                    tracing::info!(session_id, attempt, "Execution cancelled");
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                outcome = tokio::time::timeout(config.timeout, operation(attempt_token.clone())) => {
                    match outcome {
                        Ok(Ok(value)) => return Ok(value),
                        Ok(Err(error)) => AttemptError::OperationFailure(error),
                        Err(_) => {
                            attempt_token.cancel();
                            AttemptError::OperationTimeout { timeout: config.timeout }
                        }
                    }
                }
            };

            let will_retry = attempt < config.max_attempts;
            let details = failure.details();
            tracing::warn!(
                session_id,
                attempt,
                max_attempts = config.max_attempts,
                will_retry,
                kind = %details.kind,
                "Attempt failed: {}",
                details.message
            );
            self.diagnostics
                .record_async(ErrorLogEntry::retry(
                    session_id,
                    details,
                    attempt,
                    config.max_attempts,
                ))
                .await;

            if !will_retry {
                tracing::error!(session_id, attempts = attempt, "Retries exhausted");
                return Err(RetryError::RetriesExhausted {
                    attempts: attempt,
                    last: failure,
                });
            }

            let delay = config.backoff_delay(attempt);
            on_retry(attempt, delay);
            tracing::debug!(
                session_id,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Backing off before retry"
            );

            tokio::select! {
                biased;
                () = self.stopped(cancel) => {
                    tracing::info!(session_id, attempt, "Execution cancelled during backoff");
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Resolves when either the executor or the caller asks to stop
    async fn stopped(&self, cancel: &CancellationToken) {
        tokio::select! {
            () = self.shutdown.cancelled() => {}
            () = cancel.cancelled() => {}
        }
    }
}
