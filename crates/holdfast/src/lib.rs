//! Holdfast: resilient element resolution and state verification
//!
//! Browser tests against a changing UI fail for two boring reasons: the
//! element moved, or the check for "is this disabled?" looked at the wrong
//! signal. Holdfast handles both on top of any [`BrowserControl`]:
//!
//! - [`LocatorChain`]: ordered fallbacks, first structural match wins
//! - [`StateOracle`]: prioritized disabled/visible/interactable verdict
//! - [`Poller`]: predicate-driven waiting instead of fixed sleeps
//! - [`probe`]: a click whose failure is data, not a crash
//! - [`scenario::ScenarioRunner`]: one session per test, always closed,
//!   screenshot on failure
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────────────┐   ┌────────────────┐
//! │ Scenario    │   │ Engine                       │   │ BrowserControl │
//! │ body        │──►│ resolve · classify · probe   │──►│ Chromium (CDP) │
//! │ (Rust test) │   │ await_ready · observe        │   │ or MockBrowser │
//! └─────────────┘   │ (Poller + Clock)             │   └────────────────┘
//!                   └──────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use holdfast::mock::{MockBrowser, MockElement};
//! use holdfast::{Engine, FakeClock, HoldfastConfig, Locator, LocatorChain, Scope};
//!
//! let clock = FakeClock::new();
//! let browser = MockBrowser::with_clock(clock.clone());
//! browser.add(
//!     MockElement::new("button")
//!         .attr("data-action", "edit")
//!         .attr("aria-disabled", "true")
//!         .matching(Locator::css("[data-action=edit]")),
//! );
//!
//! let engine = Engine::new(browser, &HoldfastConfig::default(), clock.shared());
//! let chain = LocatorChain::new()
//!     .or(Locator::id("editBtn"))
//!     .or(Locator::css("[data-action=edit]"));
//! let edit = engine.resolve_required(&chain, &Scope::Document).unwrap();
//! assert!(engine.classify(&edit).unwrap().is_disabled());
//! assert!(engine.probe_and_observe(&edit, None).unwrap().is_unchanged());
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod clock;
mod config;
mod driver;
mod engine;
mod interaction;
pub mod locator;
pub mod mock;
mod observe;
mod oracle;
mod readiness;
mod result;
pub mod scenario;
mod wait;

/// Chromium collaborator (requires the `browser` feature)
#[cfg(feature = "browser")]
pub mod cdp;

pub use clock::{Clock, FakeClock, SharedClock, SystemClock};
pub use config::{
    HoldfastConfig, DEFAULT_BROWSER, ENV_CHROME_PATH, ENV_POLL_INTERVAL_MILLIS,
    ENV_SETTLE_BUFFER_MILLIS, ENV_TEST_BROWSER, ENV_TIMEOUT_SECONDS, SUPPORTED_BROWSERS,
};
pub use driver::{BrowserControl, ElementHandle, Scope};
pub use engine::Engine;
pub use interaction::{probe, InteractionGuard, ProbeOutcome, ProbeReport};
pub use locator::{Locator, LocatorChain, Resolution, Strategy};
pub use observe::{status_required, Observation, Observer, DEFAULT_DIALOG_SELECTOR};
pub use oracle::{
    DisabledSignal, Enablement, Interactability, StateOracle, StateVerdict, Visibility,
    DEFAULT_DISABLED_CLASSES,
};
pub use readiness::{ReadinessGate, READY_STATE_SCRIPT};
pub use result::{HoldfastError, HoldfastResult};
pub use scenario::{ScenarioReport, ScenarioRunner, SessionFactory};
pub use wait::{
    PollResult, Poller, WaitConfig, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SETTLE_BUFFER_MS,
    DEFAULT_TIMEOUT_SECS,
};

#[cfg(feature = "browser")]
pub use cdp::{ChromiumBrowser, ChromiumSessionFactory};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::clock::*;
    pub use super::config::*;
    pub use super::driver::*;
    pub use super::engine::*;
    pub use super::interaction::*;
    pub use super::locator::{Locator, LocatorChain, Resolution, Strategy};
    pub use super::observe::*;
    pub use super::oracle::*;
    pub use super::readiness::*;
    pub use super::result::*;
    pub use super::scenario::{
        ScenarioContext, ScenarioOutcome, ScenarioReport, ScenarioRunner, SessionFactory,
    };
    pub use super::wait::*;
}
