//! Bounded retry with backoff against an explicit predicate.
//!
//! Replaces silent poll loops: when the deadline is exhausted the caller
//! gets a timeout error, never a quiet give-up.

use std::future::Future;
use std::time::Duration;

use formpilot_protocols::BrowserError;

/// Backoff schedule for a bounded wait.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(800),
            max_attempts: 10,
        }
    }
}

impl RetryPolicy {
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }

    /// Delay before attempt `n` (0-based): doubling, capped at `max_delay`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let doubled = self
            .initial_delay
            .saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
        doubled.min(self.max_delay)
    }
}

/// Run `predicate` until it yields `Some(T)`, sleeping per the policy
/// between attempts. Exhaustion raises `BrowserError::Timeout` naming the
/// waited-for condition.
pub async fn retry_until<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut predicate: F,
) -> Result<T, BrowserError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, BrowserError>>,
{
    for attempt in 0..policy.max_attempts {
        if let Some(value) = predicate().await? {
            return Ok(value);
        }
        if attempt + 1 < policy.max_attempts {
            tokio::time::sleep(policy.delay_for(attempt)).await;
        }
    }
    Err(BrowserError::Timeout(what.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(1), Duration::from_millis(2), 5)
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::new(Duration::from_millis(100), Duration::from_millis(300), 10);
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(300));
        assert_eq!(policy.delay_for(8), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let result = retry_until(&fast_policy(), "thing", || async { Ok(Some(42)) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_eventual_success() {
        let calls = AtomicU32::new(0);
        let result = retry_until(&fast_policy(), "menu", || async {
            if calls.fetch_add(1, Ordering::SeqCst) >= 2 {
                Ok(Some("open"))
            } else {
                Ok(None)
            }
        })
        .await;
        assert_eq!(result.unwrap(), "open");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_is_timeout() {
        let result: Result<(), _> =
            retry_until(&fast_policy(), "dropdown menu", || async { Ok(None) }).await;
        match result {
            Err(BrowserError::Timeout(what)) => assert_eq!(what, "dropdown menu"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_until(&fast_policy(), "x", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(BrowserError::SessionClosed)
        })
        .await;
        assert!(matches!(result, Err(BrowserError::SessionClosed)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
