//! Condition Poller
//!
//! Predicate-driven waiting with an explicit timeout and poll interval. This
//! is the only place Holdfast blocks; locator resolution, the state oracle
//! and the readiness gate all wait through [`Poller`].
//!
//! A predicate answers one of three ways: satisfied, not yet, or failed.
//! Failures classified as drift ([`HoldfastError::is_drift`]) count as "not
//! yet" and are retried. Any other failure aborts the wait.

use crate::clock::{SharedClock, SystemClock};
use crate::result::{HoldfastError, HoldfastResult};
use std::time::Duration;
use tracing::{debug, warn};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default polling interval (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default settle buffer after page readiness (500ms)
pub const DEFAULT_SETTLE_BUFFER_MS: u64 = 500;

// =============================================================================
// WAIT CONFIG
// =============================================================================

/// Timing for a single wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Upper bound on the wait
    pub timeout: Duration,
    /// Delay between predicate evaluations
    pub poll_interval: Duration,
    /// Extra delay after a readiness predicate is satisfied; zero disables it
    pub settle_buffer: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            settle_buffer: Duration::from_millis(DEFAULT_SETTLE_BUFFER_MS),
        }
    }
}

impl WaitConfig {
    /// Create a wait config with the given timeout and poll interval and no
    /// settle buffer
    #[must_use]
    pub const fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
            settle_buffer: Duration::ZERO,
        }
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the settle buffer
    #[must_use]
    pub const fn with_settle_buffer(mut self, settle_buffer: Duration) -> Self {
        self.settle_buffer = settle_buffer;
        self
    }

    /// The longest a wait with this config can block
    #[must_use]
    pub fn max_blocking(&self) -> Duration {
        self.timeout + self.poll_interval
    }
}

// =============================================================================
// POLL RESULT
// =============================================================================

/// Outcome of a wait. Never partially satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult<T> {
    /// The predicate produced a value
    Satisfied {
        /// Value produced by the predicate
        value: T,
        /// Time spent waiting
        elapsed: Duration,
        /// Number of predicate evaluations
        attempts: u32,
    },
    /// The timeout elapsed first
    TimedOut {
        /// Time spent waiting
        elapsed: Duration,
        /// Number of predicate evaluations
        attempts: u32,
    },
}

impl<T> PollResult<T> {
    /// Whether the predicate was satisfied
    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }

    /// Whether the wait timed out
    #[must_use]
    pub const fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Number of predicate evaluations
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Satisfied { attempts, .. } | Self::TimedOut { attempts, .. } => *attempts,
        }
    }

    /// Time spent waiting
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Satisfied { elapsed, .. } | Self::TimedOut { elapsed, .. } => *elapsed,
        }
    }

    /// Borrow the satisfied value
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Satisfied { value, .. } => Some(value),
            Self::TimedOut { .. } => None,
        }
    }

    /// Take the satisfied value
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Satisfied { value, .. } => Some(value),
            Self::TimedOut { .. } => None,
        }
    }

    /// Convert a timeout into [`HoldfastError::Timeout`]
    pub fn into_result(self, waited_for: impl Into<String>) -> HoldfastResult<T> {
        match self {
            Self::Satisfied { value, .. } => Ok(value),
            Self::TimedOut { elapsed, .. } => Err(HoldfastError::Timeout {
                ms: elapsed.as_millis() as u64,
                waited_for: waited_for.into(),
            }),
        }
    }
}

// =============================================================================
// POLLER
// =============================================================================

/// Blocking poller bound to a wait config and a clock
#[derive(Debug, Clone)]
pub struct Poller {
    config: WaitConfig,
    clock: SharedClock,
}

impl Poller {
    /// Create a poller over the given clock
    #[must_use]
    pub fn new(config: WaitConfig, clock: SharedClock) -> Self {
        Self { config, clock }
    }

    /// Create a poller over wall time
    #[must_use]
    pub fn system(config: WaitConfig) -> Self {
        Self::new(config, SystemClock::shared())
    }

    /// Get the wait config
    #[must_use]
    pub const fn config(&self) -> &WaitConfig {
        &self.config
    }

    /// Get the clock
    #[must_use]
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Same clock, different timing
    #[must_use]
    pub fn with_config(&self, config: WaitConfig) -> Self {
        Self {
            config,
            clock: self.clock.clone(),
        }
    }

    /// Poll `probe` until it yields a value or the timeout elapses.
    ///
    /// The probe is evaluated at least once, and once more after the sleep
    /// that reaches the deadline. Between evaluations the poller sleeps one
    /// poll interval, so it never spins faster than the interval and never
    /// blocks longer than `timeout + poll_interval`.
    ///
    /// # Errors
    ///
    /// Returns the probe's error when it is not drift.
    pub fn poll_until<T, F>(&self, waited_for: &str, mut probe: F) -> HoldfastResult<PollResult<T>>
    where
        F: FnMut() -> HoldfastResult<Option<T>>,
    {
        let start = self.clock.now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match probe() {
                Ok(Some(value)) => {
                    return Ok(PollResult::Satisfied {
                        value,
                        elapsed: self.clock.now().saturating_sub(start),
                        attempts,
                    });
                }
                Ok(None) => {}
                Err(e) if e.is_drift() => {
                    debug!(waited_for, attempt = attempts, error = %e, "drift while polling");
                }
                Err(e) => return Err(e),
            }

            if self.clock.now().saturating_sub(start) >= self.config.timeout {
                break;
            }
            self.clock.sleep(self.config.poll_interval);
        }

        let elapsed = self.clock.now().saturating_sub(start);
        warn!(
            waited_for,
            attempts,
            elapsed_ms = elapsed.as_millis() as u64,
            "wait timed out"
        );
        Ok(PollResult::TimedOut { elapsed, attempts })
    }

    /// Poll a boolean predicate until it returns true or the timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns the predicate's error when it is not drift.
    pub fn await_condition<F>(
        &self,
        waited_for: &str,
        mut predicate: F,
    ) -> HoldfastResult<PollResult<()>>
    where
        F: FnMut() -> HoldfastResult<bool>,
    {
        self.poll_until(waited_for, || Ok(predicate()?.then_some(())))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use std::cell::Cell;

    fn fake_poller(timeout_ms: u64, interval_ms: u64) -> (Poller, FakeClock) {
        let clock = FakeClock::new();
        let config = WaitConfig::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
        );
        (Poller::new(config, clock.shared()), clock)
    }

    mod wait_config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = WaitConfig::default();
            assert_eq!(config.timeout, Duration::from_secs(10));
            assert_eq!(config.poll_interval, Duration::from_millis(500));
            assert_eq!(config.settle_buffer, Duration::from_millis(500));
        }

        #[test]
        fn test_new_has_no_settle_buffer() {
            let config = WaitConfig::new(Duration::from_secs(1), Duration::from_millis(100));
            assert_eq!(config.settle_buffer, Duration::ZERO);
        }

        #[test]
        fn test_builders() {
            let config = WaitConfig::default()
                .with_timeout(Duration::from_secs(3))
                .with_poll_interval(Duration::from_millis(50))
                .with_settle_buffer(Duration::from_millis(20));
            assert_eq!(config.timeout, Duration::from_secs(3));
            assert_eq!(config.poll_interval, Duration::from_millis(50));
            assert_eq!(config.settle_buffer, Duration::from_millis(20));
            assert_eq!(config.max_blocking(), Duration::from_millis(3050));
        }
    }

    mod poll_result_tests {
        use super::*;

        #[test]
        fn test_satisfied_accessors() {
            let result = PollResult::Satisfied {
                value: 7,
                elapsed: Duration::from_millis(30),
                attempts: 2,
            };
            assert!(result.is_satisfied());
            assert!(!result.is_timed_out());
            assert_eq!(result.value(), Some(&7));
            assert_eq!(result.attempts(), 2);
            assert_eq!(result.into_value(), Some(7));
        }

        #[test]
        fn test_timed_out_into_result() {
            let result: PollResult<()> = PollResult::TimedOut {
                elapsed: Duration::from_millis(2000),
                attempts: 4,
            };
            let err = result.into_result("dialog").unwrap_err();
            assert!(matches!(err, HoldfastError::Timeout { ms: 2000, .. }));
        }
    }

    mod poller_tests {
        use super::*;

        #[test]
        fn test_immediately_true_is_satisfied_without_sleeping() {
            let (poller, clock) = fake_poller(2000, 500);
            let result = poller.await_condition("always", || Ok(true)).unwrap();
            assert!(result.is_satisfied());
            assert_eq!(result.attempts(), 1);
            assert_eq!(clock.sleep_count(), 0);
        }

        #[test]
        fn test_always_false_times_out_after_timeout() {
            let (poller, clock) = fake_poller(2000, 500);
            let result = poller.await_condition("never", || Ok(false)).unwrap();
            assert!(result.is_timed_out());
            assert_eq!(result.attempts(), 5);
            assert_eq!(clock.now_ms(), 2000);
        }

        #[test]
        fn test_condition_true_at_deadline_is_satisfied() {
            let (poller, clock) = fake_poller(2000, 500);
            let result = poller
                .await_condition("deadline", || Ok(clock.now_ms() >= 2000))
                .unwrap();
            assert!(result.is_satisfied());
            assert_eq!(result.attempts(), 5);
            assert_eq!(result.elapsed(), Duration::from_millis(2000));
        }

        #[test]
        fn test_no_sleep_after_deadline() {
            let (poller, clock) = fake_poller(2000, 500);
            let _ = poller.await_condition("never", || Ok(false)).unwrap();
            assert_eq!(clock.sleep_count(), 4);
        }

        #[test]
        fn test_never_exceeds_timeout_plus_interval() {
            let (poller, clock) = fake_poller(1100, 500);
            let _ = poller.await_condition("never", || Ok(false)).unwrap();
            assert!(clock.now_ms() <= 1600);
        }

        #[test]
        fn test_satisfied_on_first_true() {
            let (poller, _clock) = fake_poller(5000, 100);
            let calls = Cell::new(0);
            let result = poller
                .poll_until("third call", || {
                    calls.set(calls.get() + 1);
                    Ok((calls.get() == 3).then_some("ready"))
                })
                .unwrap();
            assert_eq!(result.value(), Some(&"ready"));
            assert_eq!(result.attempts(), 3);
            assert_eq!(result.elapsed(), Duration::from_millis(200));
            assert_eq!(calls.get(), 3);
        }

        #[test]
        fn test_drift_is_retried() {
            let (poller, _clock) = fake_poller(1000, 100);
            let calls = Cell::new(0);
            let result = poller
                .await_condition("detached node", || {
                    calls.set(calls.get() + 1);
                    if calls.get() < 3 {
                        Err(HoldfastError::StaleElement {
                            handle: "h".into(),
                        })
                    } else {
                        Ok(true)
                    }
                })
                .unwrap();
            assert!(result.is_satisfied());
            assert_eq!(result.attempts(), 3);
        }

        #[test]
        fn test_drift_until_timeout_is_timed_out() {
            let (poller, _clock) = fake_poller(300, 100);
            let result = poller
                .await_condition("always stale", || {
                    Err(HoldfastError::ScriptFailed {
                        message: "node detached".into(),
                    })
                })
                .unwrap();
            assert!(result.is_timed_out());
        }

        #[test]
        fn test_fatal_error_aborts_immediately() {
            let (poller, clock) = fake_poller(5000, 100);
            let err = poller
                .await_condition("session", || Err(HoldfastError::session("disconnected")))
                .unwrap_err();
            assert!(matches!(err, HoldfastError::Session { .. }));
            assert_eq!(clock.sleep_count(), 0);
        }

        #[test]
        fn test_zero_timeout_evaluates_once() {
            let (poller, _clock) = fake_poller(0, 100);
            let result = poller.await_condition("once", || Ok(false)).unwrap();
            assert_eq!(result.attempts(), 1);
        }

        #[test]
        fn test_with_config_shares_clock() {
            let (poller, clock) = fake_poller(1000, 100);
            let fast = poller.with_config(WaitConfig::new(
                Duration::from_millis(200),
                Duration::from_millis(50),
            ));
            let _ = fast.await_condition("never", || Ok(false)).unwrap();
            assert_eq!(clock.now_ms(), 200);
        }

        #[test]
        fn test_system_poller_times_out_in_real_time() {
            let poller = Poller::system(WaitConfig::new(
                Duration::from_millis(30),
                Duration::from_millis(10),
            ));
            let result = poller.await_condition("never", || Ok(false)).unwrap();
            assert!(result.is_timed_out());
            assert!(result.elapsed() >= Duration::from_millis(30));
        }
    }
}
