//! Assert-and-recover: wait for a condition in N sub-intervals, running a
//! recovery action between failed attempts.
//!
//! ```text
//!            Satisfied                       ok
//!   Probing ──────────► Succeeded   Recovering ──► Probing{attempt+1}
//!     │  │                             ▲    │
//!     │  └─ TimedOut (attempt < N) ────┘    └─ err ──► Aborted
//!     ├──── TimedOut (attempt == N) ──► Failed
//!     └──── Fatal ────────────────────► Aborted
//! ```
//!
//! The transitions live in [`RecoveryMachine`], which knows nothing about
//! time or drivers; [`assert_and_recover`] feeds it real probe results.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::result::{ProbeError, ProbeResult};
use crate::wait::DEFAULT_ATTEMPTS;

/// Position in the recovery protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    /// Attempt `attempt` (1-based) is waiting for the condition
    Probing {
        /// Current attempt
        attempt: u32,
    },
    /// Attempt `attempt` timed out; the recovery action runs next
    Recovering {
        /// Attempt that just failed
        attempt: u32,
    },
    /// The condition held during attempt `attempt`
    Succeeded {
        /// Satisfying attempt
        attempt: u32,
    },
    /// Every attempt timed out
    Failed,
    /// A non-timeout error ended the protocol
    Aborted,
}

impl RecoveryState {
    /// Whether no further transitions happen
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed | Self::Aborted)
    }
}

/// Classified result of one sub-wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Condition held
    Satisfied,
    /// Sub-wait ran out of time
    TimedOut,
    /// Any other error
    Fatal,
}

impl ProbeOutcome {
    /// Classify a probe result
    #[must_use]
    pub fn classify<T>(result: &ProbeResult<T>) -> Self {
        match result {
            Ok(_) => Self::Satisfied,
            Err(e) if e.is_timeout() => Self::TimedOut,
            Err(_) => Self::Fatal,
        }
    }
}

/// Pure transition function of the protocol
#[derive(Debug, Clone)]
pub struct RecoveryMachine {
    attempts: u32,
    state: RecoveryState,
    recoveries: u32,
}

impl RecoveryMachine {
    /// Start at attempt 1 of `attempts` (at least one)
    #[must_use]
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
            state: RecoveryState::Probing { attempt: 1 },
            recoveries: 0,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> RecoveryState {
        self.state
    }

    /// Total attempts
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Recovery actions run so far
    #[must_use]
    pub const fn recoveries(&self) -> u32 {
        self.recoveries
    }

    /// Feed the outcome of the current probe. Ignored outside `Probing`.
    pub fn on_probe(&mut self, outcome: ProbeOutcome) -> RecoveryState {
        if let RecoveryState::Probing { attempt } = self.state {
            self.state = match outcome {
                ProbeOutcome::Satisfied => RecoveryState::Succeeded { attempt },
                ProbeOutcome::Fatal => RecoveryState::Aborted,
                ProbeOutcome::TimedOut if attempt >= self.attempts => RecoveryState::Failed,
                ProbeOutcome::TimedOut => RecoveryState::Recovering { attempt },
            };
        }
        self.state
    }

    /// Feed the result of the recovery action. Ignored outside `Recovering`.
    pub fn on_recovered(&mut self, ok: bool) -> RecoveryState {
        if let RecoveryState::Recovering { attempt } = self.state {
            self.recoveries += 1;
            self.state = if ok {
                RecoveryState::Probing {
                    attempt: attempt + 1,
                }
            } else {
                RecoveryState::Aborted
            };
        }
        self.state
    }
}

/// Total budget and number of sub-intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// Overall timeout, split evenly across attempts
    pub timeout: Duration,
    /// Number of attempts
    pub attempts: u32,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(crate::wait::DEFAULT_WAIT_TIMEOUT_MS),
            attempts: DEFAULT_ATTEMPTS,
        }
    }
}

impl RecoveryPolicy {
    /// Create without validation
    #[must_use]
    pub const fn new(timeout: Duration, attempts: u32) -> Self {
        Self { timeout, attempts }
    }

    /// Create, rejecting a zero timeout or zero attempts.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidConfig`] for zero values.
    pub fn try_new(timeout: Duration, attempts: u32) -> ProbeResult<Self> {
        if timeout.is_zero() || attempts == 0 {
            return Err(ProbeError::InvalidConfig {
                message: format!(
                    "recovery needs a positive timeout and attempts (got {}ms, {attempts})",
                    timeout.as_millis()
                ),
            });
        }
        Ok(Self { timeout, attempts })
    }

    /// Budget of one attempt
    #[must_use]
    pub fn sub_timeout(&self) -> Duration {
        self.timeout / self.attempts.max(1)
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Attempt on which the condition held
    pub attempts: u32,
    /// Recovery actions run
    pub recoveries: u32,
    /// Wall time spent
    pub elapsed: Duration,
}

/// Wait for `what`, recovering between timed-out attempts.
///
/// `probe` receives the per-attempt budget and returns `Ok(())` once the
/// condition holds or a [`ProbeError::Timeout`] when its sub-wait ran out.
///
/// # Errors
///
/// - [`ProbeError::Timeout`] naming `what` after all attempts timed out
/// - the probe's error if it failed with anything but a timeout
/// - the recovery action's error if recovery failed
pub async fn assert_and_recover<P, PF, R, RF>(
    policy: RecoveryPolicy,
    what: &str,
    mut probe: P,
    mut recover: R,
) -> ProbeResult<RecoveryReport>
where
    P: FnMut(Duration) -> PF,
    PF: Future<Output = ProbeResult<()>>,
    R: FnMut() -> RF,
    RF: Future<Output = ProbeResult<()>>,
{
    let start = Instant::now();
    let sub_timeout = policy.sub_timeout();
    let mut machine = RecoveryMachine::new(policy.attempts);
    let mut last_error: Option<ProbeError> = None;

    loop {
        match machine.state() {
            RecoveryState::Probing { attempt } => {
                debug!(what, attempt, attempts = machine.attempts(), "probing");
                let result = probe(sub_timeout).await;
                machine.on_probe(ProbeOutcome::classify(&result));
                last_error = result.err();
            }
            RecoveryState::Recovering { attempt } => {
                warn!(what, attempt, "condition not met, running recovery");
                match recover().await {
                    Ok(()) => {
                        machine.on_recovered(true);
                    }
                    Err(e) => {
                        warn!(what, attempt, error = %e, "recovery failed");
                        last_error = Some(e);
                        machine.on_recovered(false);
                    }
                }
            }
            RecoveryState::Succeeded { attempt } => {
                return Ok(RecoveryReport {
                    attempts: attempt,
                    recoveries: machine.recoveries(),
                    elapsed: start.elapsed(),
                });
            }
            RecoveryState::Failed => return Err(ProbeError::timeout(what, policy.timeout)),
            RecoveryState::Aborted => {
                return Err(last_error
                    .unwrap_or_else(|| ProbeError::driver(format!("recovery of {what} aborted"))));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    mod machine_tests {
        use super::*;

        #[test]
        fn test_first_attempt_success() {
            let mut m = RecoveryMachine::new(5);
            assert_eq!(
                m.on_probe(ProbeOutcome::Satisfied),
                RecoveryState::Succeeded { attempt: 1 }
            );
            assert_eq!(m.recoveries(), 0);
            assert!(m.state().is_terminal());
        }

        #[test]
        fn test_timeout_then_recover_then_succeed() {
            let mut m = RecoveryMachine::new(3);
            assert_eq!(
                m.on_probe(ProbeOutcome::TimedOut),
                RecoveryState::Recovering { attempt: 1 }
            );
            assert_eq!(m.on_recovered(true), RecoveryState::Probing { attempt: 2 });
            assert_eq!(
                m.on_probe(ProbeOutcome::Satisfied),
                RecoveryState::Succeeded { attempt: 2 }
            );
            assert_eq!(m.recoveries(), 1);
        }

        #[test]
        fn test_no_recovery_after_last_attempt() {
            let mut m = RecoveryMachine::new(2);
            m.on_probe(ProbeOutcome::TimedOut);
            m.on_recovered(true);
            assert_eq!(m.on_probe(ProbeOutcome::TimedOut), RecoveryState::Failed);
            assert_eq!(m.recoveries(), 1);
        }

        #[test]
        fn test_fatal_aborts_without_recovery() {
            let mut m = RecoveryMachine::new(5);
            assert_eq!(m.on_probe(ProbeOutcome::Fatal), RecoveryState::Aborted);
            assert_eq!(m.recoveries(), 0);
        }

        #[test]
        fn test_failed_recovery_aborts() {
            let mut m = RecoveryMachine::new(5);
            m.on_probe(ProbeOutcome::TimedOut);
            assert_eq!(m.on_recovered(false), RecoveryState::Aborted);
        }

        #[test]
        fn test_terminal_states_absorb() {
            let mut m = RecoveryMachine::new(1);
            assert_eq!(m.on_probe(ProbeOutcome::TimedOut), RecoveryState::Failed);
            assert_eq!(m.on_probe(ProbeOutcome::Satisfied), RecoveryState::Failed);
            assert_eq!(m.on_recovered(true), RecoveryState::Failed);
        }

        #[test]
        fn test_zero_attempts_treated_as_one() {
            assert_eq!(RecoveryMachine::new(0).attempts(), 1);
        }

        #[test]
        fn test_classify() {
            assert_eq!(ProbeOutcome::classify(&Ok(())), ProbeOutcome::Satisfied);
            assert_eq!(
                ProbeOutcome::classify::<()>(&Err(ProbeError::timeout("x", ms(1)))),
                ProbeOutcome::TimedOut
            );
            assert_eq!(
                ProbeOutcome::classify::<()>(&Err(ProbeError::SessionClosed)),
                ProbeOutcome::Fatal
            );
        }
    }

    mod policy_tests {
        use super::*;

        #[test]
        fn test_sub_timeout() {
            assert_eq!(RecoveryPolicy::new(ms(10_000), 5).sub_timeout(), ms(2_000));
            assert_eq!(RecoveryPolicy::default().sub_timeout(), ms(4_000));
        }

        #[test]
        fn test_try_new_rejects_zero() {
            assert!(RecoveryPolicy::try_new(Duration::ZERO, 5).is_err());
            assert!(RecoveryPolicy::try_new(ms(100), 0).is_err());
            assert!(RecoveryPolicy::try_new(ms(100), 1).is_ok());
        }
    }

    mod protocol_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_success_on_third_attempt() {
            let probes = Cell::new(0u32);
            let recoveries = Cell::new(0u32);
            let report = assert_and_recover(
                RecoveryPolicy::new(ms(5_000), 5),
                "app opened",
                |budget| {
                    probes.set(probes.get() + 1);
                    let n = probes.get();
                    async move {
                        if n < 3 {
                            tokio::time::sleep(budget).await;
                            Err(ProbeError::timeout("app opened", budget))
                        } else {
                            Ok(())
                        }
                    }
                },
                || {
                    recoveries.set(recoveries.get() + 1);
                    async { Ok(()) }
                },
            )
            .await
            .unwrap();
            assert_eq!(report.attempts, 3);
            assert_eq!(report.recoveries, 2);
            assert_eq!(recoveries.get(), 2);
            assert_eq!(report.elapsed, ms(2_000));
        }

        #[tokio::test(start_paused = true)]
        async fn test_exhaustion_names_condition() {
            let recoveries = Cell::new(0u32);
            let err = assert_and_recover(
                RecoveryPolicy::new(ms(1_000), 4),
                "content of preview",
                |budget| async move { Err(ProbeError::timeout("sub", budget)) },
                || {
                    recoveries.set(recoveries.get() + 1);
                    async { Ok(()) }
                },
            )
            .await
            .unwrap_err();
            assert!(err.is_timeout());
            assert!(err.to_string().contains("content of preview"));
            assert!(err.to_string().contains("1000ms"));
            assert_eq!(recoveries.get(), 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_fatal_probe_error_skips_recovery() {
            let recoveries = Cell::new(0u32);
            let err = assert_and_recover(
                RecoveryPolicy::default(),
                "bad locator",
                |_| async {
                    Err(ProbeError::InvalidLocator {
                        locator: "css=".into(),
                        message: "selector is empty".into(),
                    })
                },
                || {
                    recoveries.set(recoveries.get() + 1);
                    async { Ok(()) }
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ProbeError::InvalidLocator { .. }));
            assert_eq!(recoveries.get(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_recovery_error_propagates() {
            let err = assert_and_recover(
                RecoveryPolicy::new(ms(1_000), 3),
                "x",
                |budget| async move { Err(ProbeError::timeout("x", budget)) },
                || async { Err(ProbeError::driver("refresh failed")) },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ProbeError::Driver { .. }));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn outcome() -> impl Strategy<Value = ProbeOutcome> {
            prop_oneof![
                Just(ProbeOutcome::Satisfied),
                Just(ProbeOutcome::TimedOut),
                Just(ProbeOutcome::Fatal),
            ]
        }

        fn run(attempts: u32, outcomes: &[ProbeOutcome]) -> RecoveryMachine {
            let mut m = RecoveryMachine::new(attempts);
            let mut feed = outcomes.iter().copied();
            while !m.state().is_terminal() {
                match m.state() {
                    RecoveryState::Probing { .. } => {
                        m.on_probe(feed.next().unwrap_or(ProbeOutcome::TimedOut));
                    }
                    RecoveryState::Recovering { .. } => {
                        m.on_recovered(true);
                    }
                    _ => unreachable!(),
                }
            }
            m
        }

        proptest! {
            #[test]
            fn prop_recoveries_bounded(
                attempts in 1u32..8,
                outcomes in prop::collection::vec(outcome(), 0..10)
            ) {
                let m = run(attempts, &outcomes);
                prop_assert!(m.recoveries() <= attempts - 1);
                if let RecoveryState::Succeeded { attempt } = m.state() {
                    prop_assert_eq!(m.recoveries(), attempt - 1);
                }
            }

            #[test]
            fn prop_first_success_means_no_recovery(
                attempts in 1u32..8,
                rest in prop::collection::vec(outcome(), 0..10)
            ) {
                let mut outcomes = vec![ProbeOutcome::Satisfied];
                outcomes.extend(rest);
                let m = run(attempts, &outcomes);
                prop_assert_eq!(m.state(), RecoveryState::Succeeded { attempt: 1 });
                prop_assert_eq!(m.recoveries(), 0);
            }

            #[test]
            fn prop_all_timeouts_fail_after_n_minus_one_recoveries(attempts in 1u32..8) {
                let m = run(attempts, &[]);
                prop_assert_eq!(m.state(), RecoveryState::Failed);
                prop_assert_eq!(m.recoveries(), attempts - 1);
            }
        }
    }
}
