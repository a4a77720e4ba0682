//! The Retry Envelope (spec §4.6, §7).
//!
//! Wraps a single provider method invocation with classified error
//! handling, bounded retries, exponential backoff, and cache-bypass on
//! retry. Never raises through the envelope: callers always get back one
//! of [`Outcome::Success`], [`Outcome::Skipped`], or [`Outcome::Failure`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use altimetry_core::error::ProviderError;
use tracing::{error, warn};

/// The result of running a provider call through the envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The provider returned data. On the first attempt this may have been
    /// served from an HTTP cache; on any retry it was not (§4.6.2).
    Success(T),
    /// The item had no alias this provider considers relevant, or the
    /// provider does not implement this phase (`NotImplemented`).
    Skipped,
    /// Every attempt failed, either permanently on the first try or after
    /// exhausting retries.
    Failure(ProviderError),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn into_success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The sleep hook, injectable so tests can substitute a virtual clock
/// (spec §9 design notes) instead of waiting out real exponential backoff.
pub type SleepFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

fn tokio_sleep() -> SleepFn {
    Arc::new(|duration| Box::pin(tokio::time::sleep(duration)))
}

/// Wraps a single provider method invocation per the contract in §4.6.
pub struct RetryEnvelope {
    sleep: SleepFn,
}

impl Default for RetryEnvelope {
    fn default() -> Self {
        Self {
            sleep: tokio_sleep(),
        }
    }
}

impl RetryEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an envelope with a substitute sleep hook, e.g. a no-op for
    /// fast tests or one that records requested durations.
    pub fn with_sleep(sleep: SleepFn) -> Self {
        Self { sleep }
    }

    /// Runs `call` under the retry contract.
    ///
    /// - `relevant` mirrors step 1: if the item carries no alias this
    ///   provider considers relevant, the call is never attempted.
    /// - `max_retries` is `-1` for unbounded retries, otherwise the cap on
    ///   transient-failure retries (step 5).
    /// - `sleep_time` computes the backoff for the `error_count`-th retry.
    /// - `call` receives `use_cache`: `true` only on the first attempt
    ///   (step 2).
    pub async fn call<T, F, Fut>(
        &self,
        relevant: bool,
        max_retries: i64,
        sleep_time: impl Fn(u32) -> Duration,
        mut call: F,
    ) -> Outcome<T>
    where
        F: FnMut(bool) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        if !relevant {
            return Outcome::Skipped;
        }

        let mut error_count: u32 = 0;
        loop {
            let use_cache = error_count == 0;
            match call(use_cache).await {
                Ok(payload) => return Outcome::Success(payload),
                Err(ProviderError::NotImplemented) => return Outcome::Skipped,
                Err(err) if err.is_transient() => {
                    error_count += 1;
                    if max_retries >= 0 && i64::from(error_count) > max_retries {
                        error!(error = %err, attempts = error_count, "provider call exhausted retries");
                        return Outcome::Failure(err);
                    }
                    let delay = sleep_time(error_count);
                    warn!(
                        error = %err,
                        attempt = error_count,
                        delay_ms = delay.as_millis() as u64,
                        "transient provider error, retrying"
                    );
                    (self.sleep)(delay).await;
                }
                Err(err) => {
                    error!(error = %err, "permanent provider error");
                    return Outcome::Failure(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast_envelope() -> RetryEnvelope {
        RetryEnvelope::with_sleep(Arc::new(|_| Box::pin(async {})))
    }

    #[tokio::test]
    async fn skipped_when_no_relevant_alias() {
        let envelope = fast_envelope();
        let attempts = AtomicU32::new(0);
        let outcome = envelope
            .call(false, 3, |_| Duration::from_millis(1), |_use_cache| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, ProviderError>(()) }
            })
            .await;
        assert_eq!(outcome, Outcome::Skipped);
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn not_implemented_is_skipped_not_failed() {
        let envelope = fast_envelope();
        let outcome: Outcome<()> = envelope
            .call(true, 3, |_| Duration::from_millis(1), |_| async {
                Err(ProviderError::NotImplemented)
            })
            .await;
        assert_eq!(outcome, Outcome::Skipped);
    }

    #[tokio::test]
    async fn client_error_fails_immediately_without_retry() {
        let envelope = fast_envelope();
        let attempts = AtomicU32::new(0);
        let outcome = envelope
            .call(true, 5, |_| Duration::from_millis(1), |_use_cache| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ProviderError::ClientError("404".into())) }
            })
            .await;
        assert_eq!(
            outcome,
            Outcome::Failure(ProviderError::ClientError("404".into()))
        );
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn server_error_retries_then_succeeds() {
        let envelope = fast_envelope();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let outcome = envelope
            .call(true, 5, |_| Duration::from_millis(1), move |use_cache| {
                let attempts = attempts_clone.clone();
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(use_cache, count == 0, "only the first attempt may use the cache");
                    if count < 3 {
                        Err(ProviderError::ServerError("500".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(outcome, Outcome::Success(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn exhausting_max_retries_fails() {
        let envelope = fast_envelope();
        let outcome = envelope
            .call(true, 2, |_| Duration::from_millis(1), |_use_cache| async {
                Err::<(), _>(ProviderError::Timeout)
            })
            .await;
        assert_eq!(outcome, Outcome::Failure(ProviderError::Timeout));
    }

    #[tokio::test]
    async fn unbounded_retries_eventually_succeed() {
        let envelope = fast_envelope();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let outcome = envelope
            .call(true, -1, |_| Duration::from_millis(1), move |_use_cache| {
                let attempts = attempts_clone.clone();
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst);
                    if count < 10 {
                        Err(ProviderError::RateLimit)
                    } else {
                        Ok(())
                    }
                }
            })
            .await;
        assert_eq!(outcome, Outcome::Success(()));
    }

    #[tokio::test]
    async fn retry_elapsed_time_respects_sleep_schedule() {
        let envelope = RetryEnvelope::new();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let sleep_time = |count: u32| Duration::from_millis(10 * count as u64);
        let started = Instant::now();
        let outcome = envelope
            .call(true, 5, sleep_time, move |_use_cache| {
                let attempts = attempts_clone.clone();
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        Err(ProviderError::Timeout)
                    } else {
                        Ok(())
                    }
                }
            })
            .await;
        assert_eq!(outcome, Outcome::Success(()));
        let elapsed = started.elapsed();
        assert!(elapsed >= sleep_time(1) + sleep_time(2));
    }
}
