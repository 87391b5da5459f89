//! Opt-in retry with exponential backoff.
//!
//! [`ColumnBackend`](crate::ColumnBackend) surfaces every store failure to its
//! caller. Callers that prefer to absorb transient failures wrap it in a
//! [`RetryBackend`]. All four operations are idempotent, so replaying a
//! partially applied Put or Delete converges to the same state.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use hcs_session::RequestContext;
use hcs_types::Entry;

use crate::error::{BackendError, BackendResult};
use crate::traits::Backend;

/// Backoff parameters for [`RetryBackend`].
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes a single attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        // backon counts retries, not attempts.
        ExponentialBuilder::new()
            .with_min_delay(self.initial_backoff)
            .with_max_delay(self.max_backoff)
            .with_factor(self.multiplier)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// Retries store errors of the wrapped backend.
///
/// Only [`BackendError::Store`] is retried. Invalid keys, configuration
/// errors, a closed backend, cancellation and deadlines return immediately,
/// and the caller's context also bounds the backoff sleeps.
#[derive(Debug)]
pub struct RetryBackend<B> {
    inner: B,
    policy: RetryPolicy,
}

impl<B: Backend> RetryBackend<B> {
    pub fn new(inner: B, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn retry<T, F, Fut>(&self, ctx: &RequestContext, operation: &'static str, f: F) -> BackendResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BackendResult<T>>,
    {
        let attempts = AtomicU32::new(1);

        let retried = f
            .retry(self.policy.backoff())
            .sleep(tokio::time::sleep)
            .when(|err: &BackendError| err.is_retryable())
            .notify(|err: &BackendError, backoff: Duration| {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(
                    operation,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "retrying after backoff"
                );
            });

        ctx.run(retried).await.map_err(|err| {
            if err.is_retryable() && self.policy.max_attempts > 1 {
                BackendError::RetryExhausted {
                    attempts: attempts.load(Ordering::SeqCst),
                    last_error: err.to_string(),
                }
            } else {
                err
            }
        })
    }
}

#[async_trait]
impl<B: Backend> Backend for RetryBackend<B> {
    async fn get(&self, ctx: &RequestContext, key: &str) -> BackendResult<Option<Entry>> {
        self.retry(ctx, "get", || self.inner.get(ctx, key)).await
    }

    async fn put(&self, ctx: &RequestContext, entry: &Entry) -> BackendResult<()> {
        self.retry(ctx, "put", || self.inner.put(ctx, entry)).await
    }

    async fn delete(&self, ctx: &RequestContext, key: &str) -> BackendResult<()> {
        self.retry(ctx, "delete", || self.inner.delete(ctx, key)).await
    }

    async fn list(&self, ctx: &RequestContext, prefix: &str) -> BackendResult<Vec<String>> {
        self.retry(ctx, "list", || self.inner.list(ctx, prefix)).await
    }
}
