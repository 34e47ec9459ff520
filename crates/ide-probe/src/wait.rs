//! Bounded polling primitives.
//!
//! Every wait in the crate bottoms out in [`wait_for`]: evaluate a probe,
//! sleep the polling interval, repeat until the probe yields a value or the
//! timeout elapses. Timing uses `tokio::time`, so nothing blocks a thread and
//! paused-clock tests run instantly.
//!
//! Timing contract for a wait with timeout `T` and polling `P`:
//!
//! - checks happen at `0, P, 2P, ...` (plus probe latency);
//! - the last sleep is clamped so the final check lands on the deadline;
//! - each probe evaluation is bounded by the remaining budget plus `P`,
//!   so a hung probe still fails no later than `T + P`.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::result::{ProbeError, ProbeResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (20 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 20_000;

/// Default polling interval (1 second)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default number of attempts for attempt-bounded polling and recovery
pub const DEFAULT_ATTEMPTS: u32 = 5;

/// Polling intervals below this are raised to it
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

// =============================================================================
// WAIT CONFIG
// =============================================================================

/// Timeout and polling interval of a bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Total budget
    pub timeout: Duration,
    /// Delay between checks
    pub polling: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            polling: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitConfig {
    /// Create a config without validation
    #[must_use]
    pub const fn new(timeout: Duration, polling: Duration) -> Self {
        Self { timeout, polling }
    }

    /// Create a config, rejecting zero durations.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidConfig`] if either duration is zero.
    pub fn try_new(timeout: Duration, polling: Duration) -> ProbeResult<Self> {
        if timeout.is_zero() {
            return Err(ProbeError::InvalidConfig {
                message: "wait timeout must be positive".to_string(),
            });
        }
        if polling.is_zero() {
            return Err(ProbeError::InvalidConfig {
                message: "polling interval must be positive".to_string(),
            });
        }
        Ok(Self { timeout, polling })
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_polling(mut self, polling: Duration) -> Self {
        self.polling = polling;
        self
    }

    /// Timeout in milliseconds
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Count-bounded polling: `attempts` checks separated by `polling`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptConfig {
    /// Number of checks
    pub attempts: u32,
    /// Delay between checks
    pub polling: Duration,
}

impl Default for AttemptConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            polling: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl AttemptConfig {
    /// Create without validation
    #[must_use]
    pub const fn new(attempts: u32, polling: Duration) -> Self {
        Self { attempts, polling }
    }

    /// Create, rejecting zero attempts.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidConfig`] if `attempts` is zero.
    pub fn try_new(attempts: u32, polling: Duration) -> ProbeResult<Self> {
        if attempts == 0 {
            return Err(ProbeError::InvalidConfig {
                message: "attempts must be positive".to_string(),
            });
        }
        Ok(Self { attempts, polling })
    }

    /// Set number of attempts
    #[must_use]
    pub const fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_polling(mut self, polling: Duration) -> Self {
        self.polling = polling;
        self
    }
}

// =============================================================================
// WAIT OUTCOME
// =============================================================================

/// How a successful wait went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    /// Time from start to the satisfying check
    pub elapsed: Duration,
    /// Number of probe evaluations
    pub checks: u32,
}

// =============================================================================
// POLLING
// =============================================================================

/// Poll `probe` until it yields a value.
///
/// `Ok(None)` and [`ProbeError::NotReady`] mean "not yet". Any other error
/// is returned immediately.
///
/// # Errors
///
/// [`ProbeError::Timeout`] naming `what` once the budget is exhausted, or the
/// first fatal error from `probe`.
pub async fn wait_for<T, F, Fut>(config: WaitConfig, what: &str, probe: F) -> ProbeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Option<T>>>,
{
    poll(config, what, probe).await.map(|(value, _)| value)
}

/// Poll a boolean predicate until it returns `true`.
///
/// # Errors
///
/// Same as [`wait_for`].
pub async fn wait_until<F, Fut>(
    config: WaitConfig,
    what: &str,
    mut predicate: F,
) -> ProbeResult<WaitOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<bool>>,
{
    let probe = || {
        let check = predicate();
        async move { check.await.map(|ok| ok.then_some(())) }
    };
    poll(config, what, probe).await.map(|((), outcome)| outcome)
}

async fn poll<T, F, Fut>(config: WaitConfig, what: &str, mut probe: F) -> ProbeResult<(T, WaitOutcome)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Option<T>>>,
{
    let start = Instant::now();
    let deadline = start + config.timeout;
    let polling = config.polling.max(MIN_POLL_INTERVAL);
    let mut checks = 0u32;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        checks += 1;
        match tokio::time::timeout(remaining + polling, probe()).await {
            Ok(Ok(Some(value))) => {
                let outcome = WaitOutcome {
                    elapsed: start.elapsed(),
                    checks,
                };
                trace!(what, checks, elapsed_ms = outcome.elapsed.as_millis() as u64, "wait satisfied");
                return Ok((value, outcome));
            }
            Ok(Ok(None)) => trace!(what, checks, "not yet"),
            Ok(Err(e)) if e.is_not_ready() => trace!(what, checks, reason = %e, "not yet"),
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                debug!(what, checks, "probe did not answer within budget");
                return Err(ProbeError::timeout(what, config.timeout));
            }
        }

        let now = Instant::now();
        if now >= deadline {
            debug!(what, checks, timeout_ms = config.timeout_ms(), "wait timed out");
            return Err(ProbeError::timeout(what, config.timeout));
        }
        tokio::time::sleep(polling.min(deadline - now)).await;
    }
}

/// Check `predicate` up to `config.attempts` times.
///
/// Returns `Ok(false)` instead of failing once attempts are exhausted.
/// [`ProbeError::NotReady`] counts as a failed check.
///
/// # Errors
///
/// The first error from `predicate` other than `NotReady`.
pub async fn poll_attempts<F, Fut>(config: AttemptConfig, mut predicate: F) -> ProbeResult<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<bool>>,
{
    let attempts = config.attempts.max(1);
    for attempt in 1..=attempts {
        match predicate().await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) if e.is_not_ready() => {}
            Err(e) => return Err(e),
        }
        trace!(attempt, attempts, "attempt failed");
        if attempt < attempts {
            tokio::time::sleep(config.polling).await;
        }
    }
    Ok(false)
}

/// Fixed delay.
///
/// Prefer a condition wait; this exists for the few flows that have nothing
/// observable to wait on.
pub async fn sleep(duration: Duration) {
    debug!(ms = duration.as_millis() as u64, "sleep");
    tokio::time::sleep(duration).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_wait_config_default() {
            let config = WaitConfig::default();
            assert_eq!(config.timeout, ms(20_000));
            assert_eq!(config.polling, ms(1_000));
            assert_eq!(config.timeout_ms(), 20_000);
        }

        #[test]
        fn test_wait_config_chained() {
            let config = WaitConfig::default()
                .with_timeout(ms(3_000))
                .with_polling(ms(250));
            assert_eq!(config, WaitConfig::new(ms(3_000), ms(250)));
        }

        #[test]
        fn test_wait_config_rejects_zero() {
            assert!(WaitConfig::try_new(Duration::ZERO, ms(10)).is_err());
            assert!(WaitConfig::try_new(ms(10), Duration::ZERO).is_err());
            assert!(WaitConfig::try_new(ms(10), ms(10)).is_ok());
        }

        #[test]
        fn test_attempt_config() {
            let config = AttemptConfig::default();
            assert_eq!(config.attempts, 5);
            assert!(AttemptConfig::try_new(0, ms(10)).is_err());
            assert_eq!(config.with_attempts(2).attempts, 2);
        }

        #[test]
        fn test_wait_config_serde() {
            let config = WaitConfig::new(ms(1500), ms(100));
            let json = serde_json::to_string(&config).unwrap();
            let back: WaitConfig = serde_json::from_str(&json).unwrap();
            assert_eq!(back, config);
        }
    }

    mod wait_until_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_immediate_success() {
            let outcome = wait_until(WaitConfig::default(), "ready", || async { Ok(true) })
                .await
                .unwrap();
            assert_eq!(outcome.checks, 1);
            assert_eq!(outcome.elapsed, Duration::ZERO);
        }

        #[tokio::test(start_paused = true)]
        async fn test_condition_flipping_mid_wait() {
            let start = Instant::now();
            let config = WaitConfig::new(ms(5_000), ms(1_000));
            let outcome = wait_until(config, "flip", move || async move {
                Ok(start.elapsed() >= ms(2_500))
            })
            .await
            .unwrap();
            assert!(outcome.elapsed >= ms(2_500));
            assert_eq!(outcome.elapsed, ms(3_000));
            assert_eq!(outcome.checks, 4);
        }

        #[tokio::test(start_paused = true)]
        async fn test_never_true_fails_at_deadline() {
            let start = Instant::now();
            let config = WaitConfig::new(ms(3_000), ms(1_000));
            let err = wait_until(config, "never", || async { Ok(false) })
                .await
                .unwrap_err();
            let elapsed = start.elapsed();
            assert!(err.is_timeout());
            assert!(elapsed >= ms(3_000) && elapsed <= ms(4_000));
            assert!(err.to_string().contains("never"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_last_sleep_clamped_to_deadline() {
            let start = Instant::now();
            let checks = Cell::new(0);
            let config = WaitConfig::new(ms(2_500), ms(1_000));
            let err = wait_until(config, "clamped", || {
                checks.set(checks.get() + 1);
                async { Ok(false) }
            })
            .await
            .unwrap_err();
            assert!(err.is_timeout());
            assert_eq!(start.elapsed(), ms(2_500));
            assert_eq!(checks.get(), 4);
        }

        #[tokio::test(start_paused = true)]
        async fn test_fatal_error_propagates_immediately() {
            let start = Instant::now();
            let checks = Cell::new(0);
            let err = wait_until(WaitConfig::default(), "fatal", || {
                checks.set(checks.get() + 1);
                async { Err::<bool, _>(ProbeError::SessionClosed) }
            })
            .await
            .unwrap_err();
            assert!(matches!(err, ProbeError::SessionClosed));
            assert_eq!(checks.get(), 1);
            assert_eq!(start.elapsed(), Duration::ZERO);
        }

        #[tokio::test(start_paused = true)]
        async fn test_not_ready_is_retried() {
            let checks = Cell::new(0);
            let outcome = wait_until(WaitConfig::new(ms(5_000), ms(100)), "retry", || {
                checks.set(checks.get() + 1);
                let n = checks.get();
                async move {
                    if n < 3 {
                        Err(ProbeError::not_ready("loading"))
                    } else {
                        Ok(true)
                    }
                }
            })
            .await
            .unwrap();
            assert_eq!(outcome.checks, 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_hung_probe_bounded() {
            let start = Instant::now();
            let config = WaitConfig::new(ms(1_000), ms(500));
            let err = wait_until(config, "hung", std::future::pending::<ProbeResult<bool>>)
                .await
                .unwrap_err();
            assert!(err.is_timeout());
            assert_eq!(start.elapsed(), ms(1_500));
        }
    }

    mod wait_for_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_returns_value() {
            let start = Instant::now();
            let value = wait_for(WaitConfig::new(ms(5_000), ms(500)), "value", move || async move {
                Ok((start.elapsed() >= ms(1_000)).then(|| "ready".to_string()))
            })
            .await
            .unwrap();
            assert_eq!(value, "ready");
        }
    }

    mod attempts_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_exhausted_attempts_return_false() {
            let start = Instant::now();
            let checks = Cell::new(0);
            let ok = poll_attempts(AttemptConfig::new(3, ms(200)), || {
                checks.set(checks.get() + 1);
                async { Ok(false) }
            })
            .await
            .unwrap();
            assert!(!ok);
            assert_eq!(checks.get(), 3);
            // no sleep after the last attempt
            assert_eq!(start.elapsed(), ms(400));
        }

        #[tokio::test(start_paused = true)]
        async fn test_success_on_second_attempt() {
            let checks = Cell::new(0);
            let ok = poll_attempts(AttemptConfig::default(), || {
                checks.set(checks.get() + 1);
                let n = checks.get();
                async move { Ok(n == 2) }
            })
            .await
            .unwrap();
            assert!(ok);
            assert_eq!(checks.get(), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_fatal_error_stops_attempts() {
            let err = poll_attempts(AttemptConfig::default(), || async {
                Err::<bool, _>(ProbeError::driver("gone"))
            })
            .await
            .unwrap_err();
            assert!(matches!(err, ProbeError::Driver { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_sleep_advances_clock() {
            let start = Instant::now();
            sleep(ms(750)).await;
            assert_eq!(start.elapsed(), ms(750));
        }
    }
}
