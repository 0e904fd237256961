//! Bounded polling.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::trace;

/// Polling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Pause before the first probe.
    pub initial_delay: Duration,
    /// Pause between probes.
    pub interval: Duration,
    /// Probes made before giving up.
    pub max_attempts: u32,
    /// Overall deadline, including the initial delay.
    pub timeout: Option<Duration>,
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            interval,
            max_attempts,
            timeout: None,
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Polling failure.
#[derive(Debug, Error)]
pub enum PollError<E> {
    /// The condition never held within the attempt or time budget.
    #[error("Timed out after {attempts} attempts")]
    TimedOut { attempts: u32 },

    /// A probe failed; polling stops immediately.
    #[error("{0}")]
    Probe(E),
}

/// Probe until it yields a value.
///
/// `probe` receives the 1-based attempt number and returns `Ok(Some(v))` when
/// the condition holds, `Ok(None)` to keep polling, or `Err` to abort.
pub async fn poll_until<T, E, F, Fut>(config: &PollConfig, mut probe: F) -> Result<T, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let attempts = AtomicU32::new(0);

    let run = async {
        if !config.initial_delay.is_zero() {
            sleep(config.initial_delay).await;
        }
        for attempt in 1..=config.max_attempts {
            attempts.store(attempt, Ordering::SeqCst);
            if let Some(value) = probe(attempt).await.map_err(PollError::Probe)? {
                trace!("Poll condition met on attempt {}", attempt);
                return Ok(value);
            }
            if attempt < config.max_attempts {
                sleep(config.interval).await;
            }
        }
        Err(PollError::TimedOut {
            attempts: config.max_attempts,
        })
    };

    let result = match config.timeout {
        Some(limit) => tokio::time::timeout(limit, run).await,
        None => Ok(run.await),
    };

    match result {
        Ok(outcome) => outcome,
        Err(_) => Err(PollError::TimedOut {
            attempts: attempts.load(Ordering::SeqCst),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_poll_succeeds_on_third_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let config = PollConfig::new(Duration::from_millis(500), 15);
        let start = Instant::now();

        let result: Result<u32, PollError<()>> = poll_until(&config, |attempt| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok((attempt == 3).then_some(attempt))
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_exhausts_attempts() {
        let config = PollConfig::new(Duration::from_millis(100), 4)
            .with_initial_delay(Duration::from_millis(50));
        let start = Instant::now();

        let result: Result<(), PollError<()>> = poll_until(&config, |_| async { Ok(None) }).await;

        assert!(matches!(result, Err(PollError::TimedOut { attempts: 4 })));
        assert_eq!(start.elapsed(), Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_overall_timeout() {
        let config = PollConfig::new(Duration::from_millis(300), 40)
            .with_timeout(Duration::from_millis(1000));

        let result: Result<(), PollError<()>> = poll_until(&config, |_| async { Ok(None) }).await;

        match result {
            Err(PollError::TimedOut { attempts }) => assert_eq!(attempts, 4),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_poll_probe_error_aborts() {
        let config = PollConfig::new(Duration::from_millis(1), 10);
        let result: Result<(), PollError<&str>> =
            poll_until(&config, |_| async { Err("page closed") }).await;
        assert!(matches!(result, Err(PollError::Probe("page closed"))));
    }
}
