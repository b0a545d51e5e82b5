//! Bounded retry loop for poll-until-ready operations
//!
//! Grading is asynchronous on the backend: a submitted job's report
//! only exists once a grader has finished. Consumers poll for it with
//! a fixed-step, bounded retry over race dispatch, with an optional
//! progress hook fired before each retry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::error::DispatchError;

/// Progress hook invoked with the attempt number before each retry.
pub type ProgressFn = dyn Fn(u32) + Send + Sync;

/// How a poll-until-ready operation is paced and bounded.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Delay between consecutive attempts.
    pub step_delay: Duration,

    /// Total attempt budget, the first one included. At least one
    /// attempt is always made.
    pub max_attempts: u32,

    on_attempt: Option<Arc<ProgressFn>>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_secs(3),
            max_attempts: 30,
            on_attempt: None,
        }
    }
}

impl RetryPolicy {
    /// Policy with a custom attempt budget and default pacing.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Set the delay between attempts.
    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    /// Set the progress hook fired before each retry.
    pub fn with_progress<F>(mut self, on_attempt: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.on_attempt = Some(Arc::new(on_attempt));
        self
    }

    /// Fire the progress hook, if any.
    pub fn notify(&self, attempt: u32) {
        if let Some(on_attempt) = &self.on_attempt {
            on_attempt(attempt);
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("step_delay", &self.step_delay)
            .field("max_attempts", &self.max_attempts)
            .field("on_attempt", &self.on_attempt.is_some())
            .finish()
    }
}

/// Run `operation` until it succeeds or the policy's budget is spent.
///
/// The first attempt fires immediately. Each retry waits
/// `step_delay`, then fires the progress hook with the upcoming
/// attempt number. Success returns at once, whatever the remaining
/// budget; exhaustion collapses the transient failures into one
/// [`DispatchError::RetryExhausted`] preserving the last reason.
///
/// # Errors
///
/// The last `DispatchError` wrapped in `RetryExhausted`.
pub async fn poll_until_ready<T, F, Fut>(
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, DispatchError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, DispatchError>>,
{
    let mut attempt: u32 = 1;
    let mut last = match operation(attempt).await {
        Ok(value) => return Ok(value),
        Err(error) => error,
    };

    while attempt < policy.max_attempts {
        attempt += 1;
        tokio::time::sleep(policy.step_delay).await;
        policy.notify(attempt);

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                warn!(attempt, max_attempts = policy.max_attempts, error = %error, "poll attempt failed");
                last = error;
            }
        }
    }

    Err(DispatchError::RetryExhausted {
        attempts: attempt,
        last: Box::new(last),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ServerKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> DispatchError {
        DispatchError::NoAvailableServer {
            kind: ServerKind::Storage,
        }
    }

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts).with_step_delay(Duration::from_millis(5))
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.step_delay, Duration::from_secs(3));
        assert_eq!(policy.max_attempts, 30);
        // No-op without a hook.
        policy.notify(2);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let result = poll_until_ready(&fast(3), |_| async { Ok::<_, DispatchError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_success_after_failures_stops_early() {
        let calls = AtomicU32::new(0);
        let result = poll_until_ready(&fast(10), |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_counts_and_progress_hook() {
        let progressed = Arc::new(AtomicU32::new(0));
        let hook = Arc::clone(&progressed);
        let policy = fast(3).with_progress(move |_| {
            hook.fetch_add(1, Ordering::SeqCst);
        });

        let calls = AtomicU32::new(0);
        let result: Result<(), _> = poll_until_ready(&policy, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;

        // 1 initial + 2 retries; the hook fires before attempts 2 and 3.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(progressed.load(Ordering::SeqCst), 2);
        match result {
            Err(DispatchError::RetryExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, DispatchError::NoAvailableServer { .. }));
            }
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_budget_still_attempts_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = poll_until_ready(&fast(0), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }
}
