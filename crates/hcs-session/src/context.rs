//! Per-operation cancellation and deadlines.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{SessionError, SessionResult};

/// Caller-supplied context for one storage operation.
///
/// Carries a [`CancellationToken`] and an optional deadline. Both are checked
/// before a statement starts and raced against it while it runs; whichever
/// fires first aborts the statement with [`SessionError::Cancelled`] or
/// [`SessionError::DeadlineExceeded`].
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that never cancels and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().timeout(timeout)
    }

    /// A context cancelled together with `token`.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            deadline: None,
        }
    }

    /// Tighten the deadline to at most `timeout` from now.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(candidate),
            None => candidate,
        });
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast if the context is already cancelled or past its deadline.
    pub fn check(&self) -> SessionResult<()> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(SessionError::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the context aborts first.
    ///
    /// On abort `fut` is dropped, so anything it holds (such as a pool
    /// permit) is released.
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<SessionError>,
    {
        self.check()?;
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SessionError::Cancelled.into()),
            _ = deadline => Err(SessionError::DeadlineExceeded.into()),
            result = fut => result,
        }
    }
}
