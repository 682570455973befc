//! Interaction Guard
//!
//! Attempts a click without letting a rejected click fail the caller. A
//! control that refuses the click is exactly what a disabled-control check
//! wants to see, so the fault becomes data.

use crate::clock::SharedClock;
use crate::driver::{BrowserControl, ElementHandle};
use crate::locator::LocatorChain;
use crate::observe::{Observation, Observer};
use crate::result::HoldfastResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Result of a guarded click
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum ProbeOutcome {
    /// The click was delivered
    Clicked,
    /// The click raised a fault
    Blocked {
        /// The fault's message
        reason: String,
    },
}

impl ProbeOutcome {
    /// Whether the click was delivered
    #[must_use]
    pub const fn is_clicked(&self) -> bool {
        matches!(self, Self::Clicked)
    }

    /// Whether the click raised a fault
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// Observations around a guarded click
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    /// What the click did
    pub outcome: ProbeOutcome,
    /// Page state before the click
    pub before: Observation,
    /// Page state after the settle buffer
    pub after: Observation,
}

impl ProbeReport {
    /// Whether URL, dialog count and status are all unchanged
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.before == self.after
    }
}

/// Attempt a click and report the outcome. Never fails.
pub fn probe<B>(browser: &B, handle: &ElementHandle) -> ProbeOutcome
where
    B: BrowserControl + ?Sized,
{
    match browser.click(handle) {
        Ok(()) => ProbeOutcome::Clicked,
        Err(e) => {
            debug!(%handle, error = %e, "click blocked");
            ProbeOutcome::Blocked {
                reason: e.to_string(),
            }
        }
    }
}

/// Guarded click with before/after observation
#[derive(Debug, Clone)]
pub struct InteractionGuard {
    clock: SharedClock,
    settle_buffer: Duration,
    observer: Observer,
}

impl InteractionGuard {
    /// Create a guard that waits `settle_buffer` on `clock` before the second
    /// observation
    #[must_use]
    pub fn new(clock: SharedClock, settle_buffer: Duration, observer: Observer) -> Self {
        Self {
            clock,
            settle_buffer,
            observer,
        }
    }

    /// The observer used around probes
    #[must_use]
    pub const fn observer(&self) -> &Observer {
        &self.observer
    }

    /// See [`probe`]
    pub fn probe<B>(&self, browser: &B, handle: &ElementHandle) -> ProbeOutcome
    where
        B: BrowserControl + ?Sized,
    {
        probe(browser, handle)
    }

    /// Observe, probe, wait the settle buffer, observe again.
    ///
    /// # Errors
    ///
    /// Propagates errors from either observation. The click itself never
    /// fails.
    pub fn probe_and_observe<B>(
        &self,
        browser: &B,
        handle: &ElementHandle,
        status: Option<&LocatorChain>,
    ) -> HoldfastResult<ProbeReport>
    where
        B: BrowserControl + ?Sized,
    {
        let before = self.observer.observe(browser, status)?;
        let outcome = probe(browser, handle);
        if !self.settle_buffer.is_zero() {
            self.clock.sleep(self.settle_buffer);
        }
        let after = self.observer.observe(browser, status)?;
        Ok(ProbeReport {
            outcome,
            before,
            after,
        })
    }
}
