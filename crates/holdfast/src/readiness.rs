//! Page Readiness Gate
//!
//! Waits for `document.readyState === "complete"`, then sleeps a settle
//! buffer so late scripts can attach handlers. The buffer is a heuristic.

use crate::driver::BrowserControl;
use crate::result::HoldfastResult;
use crate::wait::{PollResult, Poller};
use tracing::{debug, info};

/// Script whose value is the document's ready state
pub const READY_STATE_SCRIPT: &str = "document.readyState";

/// Blocks until the page reports complete
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    poller: Poller,
}

impl ReadinessGate {
    /// Create a gate; timing and settle buffer come from the poller's config
    #[must_use]
    pub fn new(poller: Poller) -> Self {
        Self { poller }
    }

    /// Wait for the page to report complete, then settle.
    ///
    /// A timed-out wait returns without settling. Script failures while the
    /// page is swapping documents are treated as "not yet".
    ///
    /// # Errors
    ///
    /// Propagates non-drift collaborator errors.
    pub fn await_ready<B>(&self, browser: &B) -> HoldfastResult<PollResult<()>>
    where
        B: BrowserControl + ?Sized,
    {
        let result = self.poller.await_condition("document ready", || {
            let state = browser.evaluate_script(READY_STATE_SCRIPT)?;
            debug!(%state, "ready state");
            Ok(state.as_str() == Some("complete"))
        })?;

        if result.is_satisfied() {
            let settle = self.poller.config().settle_buffer;
            if !settle.is_zero() {
                self.poller.clock().sleep(settle);
            }
            info!(
                attempts = result.attempts(),
                elapsed_ms = result.elapsed().as_millis() as u64,
                "page ready"
            );
        }
        Ok(result)
    }

    /// Navigate to `url` and wait for it to be ready
    ///
    /// # Errors
    ///
    /// Propagates navigation errors and non-drift errors from the wait.
    pub fn navigate<B>(&self, browser: &B, url: &str) -> HoldfastResult<PollResult<()>>
    where
        B: BrowserControl + ?Sized,
    {
        browser.navigate(url)?;
        self.await_ready(browser)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::mock::MockBrowser;
    use crate::result::HoldfastError;
    use crate::wait::WaitConfig;
    use std::time::Duration;

    fn gate(clock: &FakeClock, settle_ms: u64) -> ReadinessGate {
        let config = WaitConfig::new(Duration::from_secs(2), Duration::from_millis(500))
            .with_settle_buffer(Duration::from_millis(settle_ms));
        ReadinessGate::new(Poller::new(config, clock.shared()))
    }

    #[test]
    fn test_complete_page_settles() {
        let clock = FakeClock::new();
        let browser = MockBrowser::with_clock(clock.clone());
        let result = gate(&clock, 500).await_ready(&browser).unwrap();
        assert!(result.is_satisfied());
        assert_eq!(clock.now_ms(), 500);
        assert_eq!(clock.sleep_count(), 1);
    }

    #[test]
    fn test_waits_for_loading_page() {
        let clock = FakeClock::new();
        let browser = MockBrowser::with_clock(clock.clone());
        browser.ready_after(Duration::from_millis(800));
        let result = gate(&clock, 500).await_ready(&browser).unwrap();
        assert_eq!(result.attempts(), 3);
        assert_eq!(clock.now_ms(), 1500);
    }

    #[test]
    fn test_timeout_skips_settle() {
        let clock = FakeClock::new();
        let browser = MockBrowser::with_clock(clock.clone());
        browser.ready_after(Duration::from_secs(60));
        let result = gate(&clock, 500).await_ready(&browser).unwrap();
        assert!(result.is_timed_out());
        assert_eq!(clock.now_ms(), 2000);
    }

    #[test]
    fn test_script_failures_are_retried() {
        let clock = FakeClock::new();
        let browser = MockBrowser::with_clock(clock.clone());
        browser.fail_ready_checks(2);
        let result = gate(&clock, 0).await_ready(&browser).unwrap();
        assert!(result.is_satisfied());
        assert_eq!(result.attempts(), 3);
    }

    #[test]
    fn test_disconnected_session_aborts() {
        let clock = FakeClock::new();
        let browser = MockBrowser::with_clock(clock.clone());
        browser.disconnect();
        let err = gate(&clock, 0).await_ready(&browser).unwrap_err();
        assert!(matches!(err, HoldfastError::Session { .. }));
        assert_eq!(clock.sleep_count(), 0);
    }

    #[test]
    fn test_navigate_invalidates_handles_and_waits() {
        let clock = FakeClock::new();
        let browser = MockBrowser::with_clock(clock.clone());
        let result = gate(&clock, 0)
            .navigate(&browser, "https://perigon.test/login")
            .unwrap();
        assert!(result.is_satisfied());
        assert_eq!(browser.current_url().unwrap(), "https://perigon.test/login");
    }
}
