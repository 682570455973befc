//! Engine facade
//!
//! [`Engine`] binds one browser session to one configuration and exposes
//! resolution, classification, probing, readiness and observation as
//! methods, all sharing the same clock.

use crate::clock::{SharedClock, SystemClock};
use crate::config::HoldfastConfig;
use crate::driver::{BrowserControl, ElementHandle, Scope};
use crate::interaction::{InteractionGuard, ProbeOutcome, ProbeReport};
use crate::locator::{self, Locator, LocatorChain, Resolution};
use crate::observe::{self, Observation, Observer};
use crate::oracle::{StateOracle, StateVerdict};
use crate::readiness::ReadinessGate;
use crate::result::HoldfastResult;
use crate::wait::{PollResult, Poller, WaitConfig};

/// Resolution, classification and interaction over one session
#[derive(Debug)]
pub struct Engine<B> {
    browser: B,
    poller: Poller,
    oracle: StateOracle,
    gate: ReadinessGate,
    guard: InteractionGuard,
}

impl<B: BrowserControl> Engine<B> {
    /// Create an engine reading time from `clock`
    #[must_use]
    pub fn new(browser: B, config: &HoldfastConfig, clock: SharedClock) -> Self {
        let poller = Poller::new(config.wait_config(), clock.clone());
        let observer = Observer::new(LocatorChain::from(Locator::css(
            config.dialog_selector.clone(),
        )));
        Self {
            oracle: StateOracle::new(poller.clone())
                .with_disabled_classes(config.disabled_classes.iter().cloned()),
            gate: ReadinessGate::new(poller.clone()),
            guard: InteractionGuard::new(clock, poller.config().settle_buffer, observer),
            poller,
            browser,
        }
    }

    /// Create an engine over wall time
    #[must_use]
    pub fn system(browser: B, config: &HoldfastConfig) -> Self {
        Self::new(browser, config, SystemClock::shared())
    }

    /// The session
    pub const fn browser(&self) -> &B {
        &self.browser
    }

    /// Give the session back
    pub fn into_browser(self) -> B {
        self.browser
    }

    /// Timing shared by every wait
    pub const fn wait_config(&self) -> &WaitConfig {
        self.poller.config()
    }

    /// The poller, for custom conditions
    pub const fn poller(&self) -> &Poller {
        &self.poller
    }

    /// See [`locator::resolve`]
    ///
    /// # Errors
    ///
    /// Propagates collaborator faults.
    pub fn resolve(&self, chain: &LocatorChain, scope: &Scope) -> HoldfastResult<Resolution> {
        locator::resolve(&self.browser, chain, scope)
    }

    /// See [`locator::resolve_all`]
    ///
    /// # Errors
    ///
    /// Propagates collaborator faults.
    pub fn resolve_all(
        &self,
        chain: &LocatorChain,
        scope: &Scope,
    ) -> HoldfastResult<Vec<ElementHandle>> {
        locator::resolve_all(&self.browser, chain, scope)
    }

    /// See [`locator::resolve_waiting`]
    ///
    /// # Errors
    ///
    /// Propagates non-drift collaborator faults.
    pub fn resolve_waiting(
        &self,
        chain: &LocatorChain,
        scope: &Scope,
    ) -> HoldfastResult<Resolution> {
        locator::resolve_waiting(&self.browser, chain, scope, &self.poller)
    }

    /// Wait for `chain` and return its handle
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the wait times out.
    pub fn resolve_required(
        &self,
        chain: &LocatorChain,
        scope: &Scope,
    ) -> HoldfastResult<ElementHandle> {
        self.resolve_waiting(chain, scope)?.into_handle()
    }

    /// See [`StateOracle::classify`]
    ///
    /// # Errors
    ///
    /// Propagates collaborator faults.
    pub fn classify(&self, handle: &ElementHandle) -> HoldfastResult<StateVerdict> {
        self.oracle.classify(&self.browser, handle)
    }

    /// See [`crate::interaction::probe`]
    pub fn probe(&self, handle: &ElementHandle) -> ProbeOutcome {
        self.guard.probe(&self.browser, handle)
    }

    /// See [`InteractionGuard::probe_and_observe`]
    ///
    /// # Errors
    ///
    /// Propagates observation errors.
    pub fn probe_and_observe(
        &self,
        handle: &ElementHandle,
        status: Option<&LocatorChain>,
    ) -> HoldfastResult<ProbeReport> {
        self.guard.probe_and_observe(&self.browser, handle, status)
    }

    /// See [`ReadinessGate::await_ready`]
    ///
    /// # Errors
    ///
    /// Propagates non-drift collaborator faults.
    pub fn await_ready(&self) -> HoldfastResult<PollResult<()>> {
        self.gate.await_ready(&self.browser)
    }

    /// Navigate and wait for readiness
    ///
    /// # Errors
    ///
    /// Propagates navigation faults.
    pub fn navigate(&self, url: &str) -> HoldfastResult<PollResult<()>> {
        self.gate.navigate(&self.browser, url)
    }

    /// See [`Observer::observe`]
    ///
    /// # Errors
    ///
    /// Propagates non-drift collaborator faults.
    pub fn observe(&self, status: Option<&LocatorChain>) -> HoldfastResult<Observation> {
        self.guard.observer().observe(&self.browser, status)
    }

    /// Text of the first element of `chain` in `scope`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when nothing resolves or the element has no text.
    pub fn status_required(&self, chain: &LocatorChain, scope: &Scope) -> HoldfastResult<String> {
        observe::status_required(&self.browser, chain, scope)
    }

    /// Wait for an arbitrary condition with the engine's timing
    ///
    /// # Errors
    ///
    /// Propagates non-drift errors from `predicate`.
    pub fn await_condition<F>(
        &self,
        waited_for: &str,
        predicate: F,
    ) -> HoldfastResult<PollResult<()>>
    where
        F: FnMut() -> HoldfastResult<bool>,
    {
        self.poller.await_condition(waited_for, predicate)
    }
}
