//! Retry with backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::warn;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// `base * (attempt + 1)`
    Linear,
    /// `base * multiplier^attempt`
    Exponential { multiplier: f64 },
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub base_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    pub backoff: Backoff,
    /// Add up to 10% jitter to delays.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Exponential { multiplier: 2.0 },
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Linear backoff without jitter.
    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Linear,
            jitter: false,
        }
    }

    /// Exponential backoff without jitter.
    pub fn exponential(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Exponential { multiplier },
            jitter: false,
        }
    }

    /// Delay after the failed attempt `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as f64;
        let delay = match self.backoff {
            Backoff::Linear => base * f64::from(attempt + 1),
            Backoff::Exponential { multiplier } => base * multiplier.powi(attempt as i32),
        };
        let delay = delay.min(self.max_delay.as_millis() as f64);

        let delay_ms = if self.jitter {
            let spread = delay * 0.1;
            (delay + rand::thread_rng().gen_range(-spread..=spread)).max(0.0)
        } else {
            delay
        };

        Duration::from_millis(delay_ms as u64)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or attempts run out. The last error is returned.
    ///
    /// `operation` receives the 0-based attempt number.
    pub async fn run<T, E, F, Fut, P>(&self, label: &str, mut operation: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !is_retryable(&e) || attempt + 1 >= attempts {
                        return Err(e);
                    }

                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {:?}",
                        label,
                        attempt + 1,
                        attempts,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::linear(3, Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2000));
    }

    #[test]
    fn test_exponential_delays_capped() {
        let mut policy = RetryPolicy::exponential(10, Duration::from_millis(500), 2.0);
        policy.max_delay = Duration::from_millis(3000);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(3000));
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let policy = RetryPolicy {
            jitter: true,
            ..RetryPolicy::linear(3, Duration::from_millis(1000))
        };
        for _ in 0..50 {
            let delay = policy.delay_for_attempt(0).as_millis();
            assert!((900..=1100).contains(&delay));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_transient_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::linear(3, Duration::from_millis(1000));
        let start = Instant::now();

        let result: Result<&str, String> = policy
            .run(
                "relay",
                |attempt| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        if attempt < 2 {
                            Err("no receiver".to_string())
                        } else {
                            Ok("done")
                        }
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_permanent_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::linear(3, Duration::from_millis(1000));

        let result: Result<(), String> = policy
            .run(
                "relay",
                |_| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err("unsupported page".to_string())
                    }
                },
                |e: &String| e.contains("receiver"),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_last_error_when_exhausted() {
        let policy = RetryPolicy::linear(3, Duration::from_millis(10));
        let result: Result<(), String> = policy
            .run("ping", |attempt| async move { Err(format!("fail {}", attempt)) }, |_| true)
            .await;
        assert_eq!(result.unwrap_err(), "fail 2");
    }
}
