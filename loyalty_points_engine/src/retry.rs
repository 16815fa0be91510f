//! Retry an action until it succeeds or stops being worth retrying.
//!
//! The wait schedule grows on the first few attempts and then stabilizes: with the default
//! 500 ms starting interval the waits before attempts 2..6 are 0.5 s, 2 s, 5 s, 11 s and 23 s,
//! and every later attempt waits 23 s again.
use std::{fmt::Display, future::Future, time::Duration};

use log::{debug, info};

/// Errors that can tell the retrier whether another attempt may help.
pub trait MaybeRetriable {
    fn is_retriable(&self) -> bool;
}

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

const PROGRESSION_LIMIT: u32 = 5;

#[derive(Debug, Clone)]
pub struct RetrierOptions {
    /// Wait before the first retry. Later waits grow from it.
    pub interval: Duration,
    /// Number of retries after the initial attempt. Ignored when `infinite` is set.
    pub retries: u32,
    /// Retry on any error instead of retriable-tagged ones only.
    pub retry_any: bool,
    /// Keep retrying until the action succeeds.
    pub infinite: bool,
}

impl Default for RetrierOptions {
    fn default() -> Self {
        Self { interval: DEFAULT_RETRY_INTERVAL, retries: 0, retry_any: false, infinite: false }
    }
}

pub struct Retrier {
    interval: Duration,
    retries: u32,
    retry_any: bool,
    infinite: bool,
}

impl Retrier {
    pub fn new(options: RetrierOptions) -> Self {
        let interval = if options.interval.is_zero() { DEFAULT_RETRY_INTERVAL } else { options.interval };
        Self {
            interval,
            retries: options.retries,
            retry_any: options.retry_any,
            infinite: options.infinite,
        }
    }

    /// Interval growth, applied after each wait. The interval is increased at most 5 times so
    /// that an infinite retrier never ends up waiting unboundedly long.
    fn advance(&mut self, attempt: u32) {
        if attempt >= PROGRESSION_LIMIT {
            return;
        }
        self.interval = (self.interval + Duration::from_millis(500)) * 2;
    }

    /// Runs `f`, retrying per the configured policy. Returns the first success, or the last error
    /// once the policy gives up.
    pub async fn run<T, E, F, Fut>(&mut self, action: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: MaybeRetriable + Display,
    {
        let mut attempt: u32 = 0;
        loop {
            if attempt > 0 {
                tokio::time::sleep(self.interval).await;
                self.advance(attempt);
                info!("⏳️ Retrying [{action}], attempt {}", attempt + 1);
            }
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !self.retry_any && !e.is_retriable() {
                        return Err(e);
                    }
                    if !self.infinite && attempt >= self.retries {
                        return Err(e);
                    }
                    debug!("⏳️ [{action}] attempt {} failed: {e}", attempt + 1);
                    attempt = attempt.saturating_add(1);
                },
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use thiserror::Error;

    use super::*;

    #[derive(Debug, Clone, Error)]
    enum TestError {
        #[error("retriable")]
        Retriable,
        #[error("permanent")]
        Permanent,
    }

    impl MaybeRetriable for TestError {
        fn is_retriable(&self) -> bool {
            matches!(self, TestError::Retriable)
        }
    }

    fn secs(d: Duration) -> f64 {
        d.as_secs_f64()
    }

    #[test]
    fn interval_progression_is_capped() {
        let mut retrier = Retrier::new(RetrierOptions::default());
        // waits before attempts 2..=8
        let mut waits = vec![secs(retrier.interval)];
        for attempt in 1..=6 {
            retrier.advance(attempt);
            waits.push(secs(retrier.interval));
        }
        assert_eq!(waits, vec![0.5, 2.0, 5.0, 11.0, 23.0, 23.0, 23.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_follow_the_documented_schedule() {
        let start = tokio::time::Instant::now();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut retrier = Retrier::new(RetrierOptions { retry_any: true, infinite: true, ..Default::default() });
        retrier
            .run("schedule", move || {
                let calls = Arc::clone(&counter);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 5 {
                        Err(TestError::Retriable)
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        // 0.5 + 2 + 5 + 11 + 23
        assert_eq!(start.elapsed(), Duration::from_millis(41_500));
    }

    #[tokio::test]
    async fn non_retriable_errors_return_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut retrier = Retrier::new(RetrierOptions {
            interval: Duration::from_millis(1),
            retries: 10,
            ..Default::default()
        });
        let result: Result<(), TestError> = retrier
            .run("permanent", move || {
                let calls = Arc::clone(&counter);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Permanent)
                }
            })
            .await;
        assert!(matches!(result, Err(TestError::Permanent)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bounded_retries_stop_after_the_configured_count() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut retrier = Retrier::new(RetrierOptions {
            interval: Duration::from_millis(1),
            retries: 2,
            ..Default::default()
        });
        let result: Result<(), TestError> = retrier
            .run("bounded", move || {
                let calls = Arc::clone(&counter);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Retriable)
                }
            })
            .await;
        assert!(result.is_err());
        // initial attempt + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_any_retries_non_retriable_errors_too() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut retrier = Retrier::new(RetrierOptions {
            interval: Duration::from_millis(1),
            retries: 3,
            retry_any: true,
            ..Default::default()
        });
        let result = retrier
            .run("any", move || {
                let calls = Arc::clone(&counter);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError::Permanent)
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
