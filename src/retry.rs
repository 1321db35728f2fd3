use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::HarvestError;

/// Bounded retry with a fixed pause between attempts.
///
/// Every transport, status or timeout failure is retried the same way. There
/// is no backoff and no jitter. Anything else (a malformed body, a
/// cancellation) ends the operation at once.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            attempt_timeout: None,
        }
    }

    /// A single attempt, no retry.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Caps the wall-clock time of each attempt.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `operation` until it succeeds, fails in a non-retryable way, or
    /// the attempt budget is spent. The last case yields
    /// [`HarvestError::ExhaustedRetries`], which callers treat as "no data for
    /// this unit of work".
    pub async fn attempt<T, F, Fut>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, HarvestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HarvestError>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(HarvestError::Cancelled),
                res = self.run_once(operation()) => res,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => {
                    log::warn!("{label}: attempt {attempt} failed, not retrying: {e}");
                    return Err(e);
                }
                Err(e) => {
                    log::warn!(
                        "{label}: attempt {attempt}/{} failed: {e}",
                        self.max_attempts
                    );
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Err(HarvestError::Cancelled),
                            _ = tokio::time::sleep(self.delay) => {}
                        }
                    }
                }
            }
        }

        let last = last_error
            .unwrap_or_else(|| HarvestError::Config("retry policy allows no attempts".into()));
        Err(HarvestError::ExhaustedRetries {
            attempts: self.max_attempts,
            last: Box::new(last),
        })
    }

    async fn run_once<T, Fut>(&self, fut: Fut) -> Result<T, HarvestError>
    where
        Fut: Future<Output = Result<T, HarvestError>>,
    {
        match self.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(res) => res,
                Err(_) => Err(HarvestError::Timeout(limit)),
            },
            None => fut.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn status(code: u16) -> HarvestError {
        HarvestError::Status {
            status: code,
            url: "http://test".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt_calls_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();
        let c = calls.clone();
        let res = policy
            .attempt("op", &CancellationToken::new(), || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, HarvestError>(7)
                }
            })
            .await;
        assert_eq!(res.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let c = calls.clone();
        let start = tokio::time::Instant::now();
        let res = policy
            .attempt("op", &CancellationToken::new(), || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 { Err(status(500)) } else { Ok("done") }
                }
            })
            .await;
        assert_eq!(res.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_max_attempts_without_trailing_sleep() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let c = calls.clone();
        let start = tokio::time::Instant::now();
        let res: Result<(), _> = policy
            .attempt("op", &CancellationToken::new(), || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(status(404))
                }
            })
            .await;
        match res {
            Err(HarvestError::ExhaustedRetries { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, HarvestError::Status { status: 404, .. }));
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parse_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let res: Result<(), _> = RetryPolicy::default()
            .attempt("op", &CancellationToken::new(), || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(HarvestError::Parse("unexpected eof".into()))
                }
            })
            .await;
        assert!(matches!(res, Err(HarvestError::Parse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempt_times_out_and_is_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let policy = RetryPolicy::new(2, Duration::from_secs(1))
            .with_attempt_timeout(Duration::from_secs(5));
        let res: Result<(), _> = policy
            .attempt("op", &CancellationToken::new(), || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    futures::future::pending::<Result<(), HarvestError>>().await
                }
            })
            .await;
        match res {
            Err(HarvestError::ExhaustedRetries { last, .. }) => {
                assert!(matches!(*last, HarvestError::Timeout(_)));
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_retry_sleep() {
        let cancel = CancellationToken::new();
        let policy = RetryPolicy::new(5, Duration::from_secs(60));
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            trigger.cancel();
        });
        let res: Result<(), _> = policy
            .attempt("op", &cancel, || async { Err(status(503)) })
            .await;
        assert!(matches!(res, Err(HarvestError::Cancelled)));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }
}
