//! Cancellable retry
//!
//! Both phases retry a failing remote operation forever with a fixed backoff.
//! Cancellation is cooperative and observed only while waiting: an attempt
//! that has started always runs to completion or failure.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{Error, Result};

/// Backoff policy between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    delay: Duration,
}

impl Backoff {
    /// Wait the same `delay` before every retry
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// Delay before the retry that follows the given number of failures
    pub fn delay(&self, _failures: u32) -> Duration {
        self.delay
    }
}

/// Successful result plus the number of failed attempts before it
#[derive(Debug)]
pub struct Retried<T> {
    pub value: T,
    pub failures: u32,
}

/// Sleep for `duration`; returns `false` if cancelled first
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Run `op` until it succeeds or `cancel` fires during a backoff wait
///
/// Every failure is logged at warn level under `task`. Returns
/// [`Error::Interrupted`] when cancelled.
pub async fn retry_until_cancelled<T, E, F, Fut>(
    task: &str,
    backoff: &Backoff,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<Retried<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    let mut failures = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(Retried { value, failures }),
            Err(e) => {
                failures += 1;
                let delay = backoff.delay(failures);
                warn!(
                    task,
                    error = %e,
                    failures,
                    retry_in = ?delay,
                    "Attempt failed, retrying"
                );
                if !pause(delay, cancel).await {
                    warn!(task, "Cancelled while waiting to retry");
                    return Err(Error::Interrupted);
                }
            }
        }
    }
}

/// Child token that is also cancelled once `deadline` elapses
///
/// The timer stops when the guard is dropped.
pub fn with_deadline(parent: &CancellationToken, deadline: Duration) -> (CancellationToken, DeadlineGuard) {
    let token = parent.child_token();
    let timer_token = token.clone();
    let timer = tokio::spawn(async move {
        tokio::select! {
            _ = timer_token.cancelled() => {}
            _ = tokio::time::sleep(deadline) => {
                warn!(deadline = ?deadline, "Phase deadline reached, stopping at next pause");
                timer_token.cancel();
            }
        }
    });
    (token, DeadlineGuard { timer })
}

/// Stops a deadline timer on drop
#[derive(Debug)]
pub struct DeadlineGuard {
    timer: JoinHandle<()>,
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let cancel = CancellationToken::new();

        let result = retry_until_cancelled(
            "flaky",
            &Backoff::fixed(Duration::from_secs(300)),
            &cancel,
            move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("boom")
                } else {
                    Ok(7)
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(result.value, 7);
        assert_eq!(result.failures, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<Retried<()>> = retry_until_cancelled(
            "always-fails",
            &Backoff::fixed(Duration::from_secs(300)),
            &cancel,
            || async { Err::<(), _>("down") },
        )
        .await;

        assert!(result.unwrap_err().is_interrupted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_runs_even_if_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = retry_until_cancelled(
            "ok",
            &Backoff::fixed(Duration::from_secs(1)),
            &cancel,
            || async { Ok::<_, &str>("done") },
        )
        .await
        .unwrap();
        assert_eq!(result.value, "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_completes() {
        let cancel = CancellationToken::new();
        assert!(pause(Duration::from_secs(1), &cancel).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels_child_only() {
        let parent = CancellationToken::new();
        let (token, _guard) = with_deadline(&parent, Duration::from_secs(10));

        assert!(!pause(Duration::from_secs(60), &token).await);
        assert!(token.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancel_reaches_child() {
        let parent = CancellationToken::new();
        let (token, _guard) = with_deadline(&parent, Duration::from_secs(3600));

        parent.cancel();
        assert!(token.is_cancelled());
    }
}
