// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bounded fixed-interval retry and polling primitives.

use crate::error::{BootError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

/// Run `operation` up to `retries` times, sleeping `interval` between attempts.
///
/// Returns the first success, or the last error once attempts are exhausted.
pub async fn retry_on_error<F, Fut, T, E>(
    retries: u32,
    interval: Duration,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= retries.max(1) => return Err(e),
            Err(e) => {
                debug!(attempt, error = %e, "Attempt failed, retrying in {:?}", interval);
                sleep(interval).await;
            }
        }
    }
}

/// Poll `check` until it reports `Ok(true)`, with an immediate first attempt.
///
/// `Ok(false)` keeps polling every `interval`; an `Err` aborts immediately.
/// Fails with [`BootError::Timeout`] once `timeout` has elapsed, after a
/// final check at the deadline.
pub async fn poll_immediate<F, Fut>(
    interval: Duration,
    timeout: Duration,
    timeout_msg: impl Into<String>,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + timeout;
    let timeout_msg = timeout_msg.into();

    loop {
        if check().await? {
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(BootError::Timeout {
                message: timeout_msg,
                timeout,
            });
        }

        // last attempt lands on the deadline
        let wait = interval.min(deadline - now);
        trace!("Condition not met, polling again in {:?}", wait);
        sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: std::result::Result<u32, String> = retry_on_error(5, Duration::from_millis(1), || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("attempt {}", n))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: std::result::Result<(), String> = retry_on_error(4, Duration::from_millis(1), || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("attempt {}", n))
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), "attempt 4");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_poll_checks_immediately() {
        let result = poll_immediate(Duration::from_secs(60), Duration::from_secs(1), "never", || async {
            Ok(true)
        })
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_poll_times_out() {
        let result = poll_immediate(Duration::from_millis(5), Duration::from_millis(20), "still waiting", || async {
            Ok(false)
        })
        .await;

        match result {
            Err(BootError::Timeout { message, .. }) => assert_eq!(message, "still waiting"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_poll_aborts_on_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = poll_immediate(Duration::from_millis(1), Duration::from_secs(5), "unused", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(BootError::CrdVersion("widgets.example.com".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(BootError::CrdVersion(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_poll_checks_again_at_deadline() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let started = Instant::now();

        let result = poll_immediate(Duration::from_secs(60), Duration::from_millis(30), "slow", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            }
        })
        .await;

        assert!(matches!(result, Err(BootError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_poll_succeeds_on_final_check() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = poll_immediate(Duration::from_secs(5), Duration::from_millis(20), "slow", || {
            let counter = counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst) >= 1) }
        })
        .await;

        assert!(result.is_ok());
    }
}
