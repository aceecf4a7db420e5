//! Retry policy for webhook delivery
//!
//! The automation engine answers 404 while a workflow is inactive and 5xx
//! while it is restarting, so deliveries retry on a fixed delay schedule
//! rather than giving up on the first bad response.

use std::future::Future;
use std::time::Duration;

/// A fixed schedule of delays between attempts. An empty schedule means a
/// single attempt with no retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(vec![
            Duration::from_secs(5),
            Duration::from_secs(10),
            Duration::from_secs(15),
        ])
    }
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Total attempts the policy allows (initial try plus retries).
    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// Run `f` until `should_retry` declines the outcome or attempts run
    /// out. `f` receives the zero-based attempt index so callers can do
    /// extra recovery work before a retry (like activating a workflow).
    /// The last outcome is returned as-is.
    pub async fn run<T, F, Fut, P>(&self, mut f: F, should_retry: P) -> T
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = T>,
        P: Fn(&T) -> bool,
    {
        let mut attempt = 0;
        loop {
            let outcome = f(attempt).await;
            let Some(delay) = self.delays.get(attempt) else {
                return outcome;
            };
            if !should_retry(&outcome) {
                return outcome;
            }
            tracing::debug!(
                attempt = attempt + 1,
                delay_secs = delay.as_secs(),
                "Retrying after delay"
            );
            tokio::time::sleep(*delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn short_policy() -> RetryPolicy {
        RetryPolicy::new(vec![Duration::from_millis(5), Duration::from_millis(5)])
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_first_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let result: Result<u32, &str> = short_policy()
            .run(
                move |_| {
                    let calls = calls2.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(7)
                    }
                },
                |outcome| outcome.is_err(),
            )
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_schedule_then_returns_last_outcome() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let result: Result<u32, &str> = short_policy()
            .run(
                move |_| {
                    let calls = calls2.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err("engine down")
                    }
                },
                |outcome| outcome.is_err(),
            )
            .await;
        assert_eq!(result, Err("engine down"));
        // Initial attempt plus one retry per delay
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_mid_schedule() {
        let policy = short_policy();
        let result: Result<usize, &str> = policy
            .run(
                |attempt| async move {
                    if attempt < 1 {
                        Err("not yet")
                    } else {
                        Ok(attempt)
                    }
                },
                |outcome| outcome.is_err(),
            )
            .await;
        assert_eq!(result, Ok(1));
    }

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 4);
    }
}
