//! Scenario harness
//!
//! Runs one test body against one browser session and always cleans up.
//!
//! ## Lifecycle
//!
//! 1. Open a session from the [`SessionFactory`]
//! 2. Run the body with a [`ScenarioContext`] that records every resolution
//!    and verdict
//! 3. On an `Err` or a panic, capture `<name>_<yyyyMMdd_HHmmss>.png` into the
//!    artifact directory (best-effort)
//! 4. Close the session, on every path
//!
//! ```rust
//! use holdfast::mock::{MockElement, MockSessionFactory};
//! use holdfast::scenario::ScenarioRunner;
//! use holdfast::{FakeClock, HoldfastConfig, Locator, LocatorChain, Scope};
//!
//! let clock = FakeClock::new();
//! let factory = MockSessionFactory::new(clock.clone(), |browser| {
//!     browser.add(MockElement::new("button").attr("id", "editBtn").attr("disabled", "true"));
//! });
//! let runner = ScenarioRunner::new(factory, HoldfastConfig::default()).with_clock(clock.shared());
//!
//! let report = runner.run("edit_disabled_for_published", |ctx| {
//!     let edit = ctx.resolve_required(&LocatorChain::from(Locator::id("editBtn")), &Scope::Document)?;
//!     assert!(ctx.classify(&edit)?.is_disabled());
//!     Ok(())
//! });
//! assert!(report.is_passed());
//! ```

use crate::clock::{SharedClock, SystemClock};
use crate::config::HoldfastConfig;
use crate::driver::{BrowserControl, ElementHandle, Scope};
use crate::engine::Engine;
use crate::interaction::{ProbeOutcome, ProbeReport};
use crate::locator::{LocatorChain, Resolution};
use crate::oracle::StateVerdict;
use crate::result::{HoldfastError, HoldfastResult};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Opens and closes browser sessions, one per scenario
pub trait SessionFactory {
    /// Session type handed to the engine
    type Session: BrowserControl;

    /// Open a fresh session
    ///
    /// # Errors
    ///
    /// Returns an error if the browser cannot be launched or reached.
    fn open(&self) -> HoldfastResult<Self::Session>;

    /// Close a session opened by this factory
    ///
    /// # Errors
    ///
    /// Returns an error if shutdown fails.
    fn close(&self, session: Self::Session) -> HoldfastResult<()>;
}

/// How a scenario ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum ScenarioOutcome {
    /// Body returned `Ok`
    Passed,
    /// Body returned `Err`, panicked, or no session could be opened
    Failed {
        /// Error message or panic payload
        reason: String,
    },
}

/// One resolution attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRecord {
    /// Locators tried, in order
    pub attempted: Vec<String>,
    /// Locator that matched, if any
    pub matched: Option<String>,
}

/// One classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictRecord {
    /// Classified element
    pub handle: String,
    /// Verdict
    pub verdict: StateVerdict,
}

/// What happened inside a scenario body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDiagnostics {
    /// Every resolution, in call order
    pub resolutions: Vec<ResolutionRecord>,
    /// Every classification, in call order
    pub verdicts: Vec<VerdictRecord>,
    /// Free-form notes, including probe outcomes
    pub notes: Vec<String>,
}

/// Result of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Outcome
    pub outcome: ScenarioOutcome,
    /// Recorded resolutions, verdicts and notes
    pub diagnostics: ScenarioDiagnostics,
    /// Failure screenshot, when one was captured
    pub artifact: Option<PathBuf>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl ScenarioReport {
    /// Whether the scenario passed
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.outcome == ScenarioOutcome::Passed
    }

    /// Turn a failed report into an error, for use inside `#[test]`
    ///
    /// # Errors
    ///
    /// Returns `ScenarioFailed` when the outcome is `Failed`.
    pub fn into_result(self) -> HoldfastResult<Self> {
        match &self.outcome {
            ScenarioOutcome::Passed => Ok(self),
            ScenarioOutcome::Failed { reason } => Err(HoldfastError::ScenarioFailed {
                name: self.name.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

/// Engine access for a scenario body, recording as it goes
#[derive(Debug)]
pub struct ScenarioContext<'a, B> {
    engine: &'a Engine<B>,
    diagnostics: ScenarioDiagnostics,
}

impl<'a, B: BrowserControl> ScenarioContext<'a, B> {
    fn new(engine: &'a Engine<B>) -> Self {
        Self {
            engine,
            diagnostics: ScenarioDiagnostics::default(),
        }
    }

    /// The engine, for operations that are not recorded
    pub const fn engine(&self) -> &'a Engine<B> {
        self.engine
    }

    /// The session
    pub const fn browser(&self) -> &'a B {
        self.engine.browser()
    }

    /// Recorded so far
    pub const fn diagnostics(&self) -> &ScenarioDiagnostics {
        &self.diagnostics
    }

    fn record(&mut self, resolution: &Resolution) {
        self.diagnostics.resolutions.push(ResolutionRecord {
            attempted: resolution.attempted().iter().map(ToString::to_string).collect(),
            matched: resolution.matched().map(ToString::to_string),
        });
    }

    /// Resolve without waiting
    ///
    /// # Errors
    ///
    /// Propagates collaborator faults.
    pub fn resolve(&mut self, chain: &LocatorChain, scope: &Scope) -> HoldfastResult<Resolution> {
        let resolution = self.engine.resolve(chain, scope)?;
        self.record(&resolution);
        Ok(resolution)
    }

    /// Resolve, waiting up to the configured timeout
    ///
    /// # Errors
    ///
    /// Propagates non-drift collaborator faults.
    pub fn resolve_waiting(
        &mut self,
        chain: &LocatorChain,
        scope: &Scope,
    ) -> HoldfastResult<Resolution> {
        let resolution = self.engine.resolve_waiting(chain, scope)?;
        self.record(&resolution);
        Ok(resolution)
    }

    /// Resolve, waiting, and require a match
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the wait times out.
    pub fn resolve_required(
        &mut self,
        chain: &LocatorChain,
        scope: &Scope,
    ) -> HoldfastResult<ElementHandle> {
        self.resolve_waiting(chain, scope)?.into_handle()
    }

    /// Classify and record the verdict
    ///
    /// # Errors
    ///
    /// Propagates collaborator faults.
    pub fn classify(&mut self, handle: &ElementHandle) -> HoldfastResult<StateVerdict> {
        let verdict = self.engine.classify(handle)?;
        self.diagnostics.verdicts.push(VerdictRecord {
            handle: handle.to_string(),
            verdict: verdict.clone(),
        });
        Ok(verdict)
    }

    /// Guarded click, noted in the diagnostics
    pub fn probe(&mut self, handle: &ElementHandle) -> ProbeOutcome {
        let outcome = self.engine.probe(handle);
        self.note(format!("probe {handle}: {outcome:?}"));
        outcome
    }

    /// Guarded click with observations, noted in the diagnostics
    ///
    /// # Errors
    ///
    /// Propagates observation errors.
    pub fn probe_and_observe(
        &mut self,
        handle: &ElementHandle,
        status: Option<&LocatorChain>,
    ) -> HoldfastResult<ProbeReport> {
        let report = self.engine.probe_and_observe(handle, status)?;
        self.note(format!(
            "probe {handle}: {:?}, unchanged: {}",
            report.outcome,
            report.is_unchanged()
        ));
        Ok(report)
    }

    /// Add a note to the diagnostics
    pub fn note(&mut self, note: impl Into<String>) {
        self.diagnostics.notes.push(note.into());
    }

    fn into_diagnostics(self) -> ScenarioDiagnostics {
        self.diagnostics
    }
}

/// Runs scenarios against sessions from a factory
#[derive(Debug)]
pub struct ScenarioRunner<F> {
    factory: F,
    config: HoldfastConfig,
    clock: SharedClock,
}

impl<F: SessionFactory> ScenarioRunner<F> {
    /// Create a runner over wall time
    #[must_use]
    pub fn new(factory: F, config: HoldfastConfig) -> Self {
        Self {
            factory,
            config,
            clock: SystemClock::shared(),
        }
    }

    /// Read time from `clock` instead
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// The factory
    pub const fn factory(&self) -> &F {
        &self.factory
    }

    /// The configuration
    pub const fn config(&self) -> &HoldfastConfig {
        &self.config
    }

    /// Run `body` against a fresh session.
    ///
    /// Never panics on behalf of the body: errors and panics both become a
    /// failed outcome. The session is closed before returning.
    pub fn run<Body>(&self, name: &str, body: Body) -> ScenarioReport
    where
        Body: FnOnce(&mut ScenarioContext<'_, F::Session>) -> HoldfastResult<()>,
    {
        info!(scenario = name, "scenario started");
        let start = self.clock.now();

        let session = match self.factory.open() {
            Ok(session) => session,
            Err(e) => {
                warn!(scenario = name, error = %e, "could not open session");
                return self.finish(
                    name,
                    ScenarioOutcome::Failed {
                        reason: e.to_string(),
                    },
                    ScenarioDiagnostics::default(),
                    None,
                    start,
                );
            }
        };

        let engine = Engine::new(session, &self.config, self.clock.clone());
        let mut context = ScenarioContext::new(&engine);
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| body(&mut context))) {
            Ok(Ok(())) => ScenarioOutcome::Passed,
            Ok(Err(e)) => ScenarioOutcome::Failed {
                reason: e.to_string(),
            },
            Err(payload) => ScenarioOutcome::Failed {
                reason: format!("panicked: {}", panic_message(payload.as_ref())),
            },
        };
        let mut diagnostics = context.into_diagnostics();

        let artifact = match outcome {
            ScenarioOutcome::Passed => None,
            ScenarioOutcome::Failed { .. } => {
                capture_failure_screenshot(engine.browser(), name, &self.config.artifact_dir)
            }
        };

        if let Err(e) = self.factory.close(engine.into_browser()) {
            warn!(scenario = name, error = %e, "session close failed");
            diagnostics.notes.push(format!("session close failed: {e}"));
        }

        self.finish(name, outcome, diagnostics, artifact, start)
    }

    fn finish(
        &self,
        name: &str,
        outcome: ScenarioOutcome,
        diagnostics: ScenarioDiagnostics,
        artifact: Option<PathBuf>,
        start: Duration,
    ) -> ScenarioReport {
        let duration_ms = self.clock.now().saturating_sub(start).as_millis() as u64;
        match &outcome {
            ScenarioOutcome::Passed => info!(scenario = name, duration_ms, "scenario passed"),
            ScenarioOutcome::Failed { reason } => {
                info!(scenario = name, %reason, duration_ms, "scenario failed");
            }
        }
        ScenarioReport {
            name: name.to_string(),
            outcome,
            diagnostics,
            artifact,
            duration_ms,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// File name for a failure screenshot: `<name>_<yyyyMMdd_HHmmss>.png`, with
/// characters outside `[A-Za-z0-9_-]` in the name replaced by `_`
#[must_use]
pub fn screenshot_file_name(name: &str, at: chrono::NaiveDateTime) -> String {
    let safe: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{safe}_{}.png", at.format("%Y%m%d_%H%M%S"))
}

/// Save a screenshot into `dir`. Failures are logged and swallowed.
pub fn capture_failure_screenshot<B>(browser: &B, name: &str, dir: &Path) -> Option<PathBuf>
where
    B: BrowserControl + ?Sized,
{
    let attempt = || -> HoldfastResult<PathBuf> {
        let png = browser.screenshot()?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(screenshot_file_name(name, chrono::Local::now().naive_local()));
        std::fs::write(&path, png)?;
        Ok(path)
    };
    match attempt() {
        Ok(path) => {
            info!(scenario = name, path = %path.display(), "failure screenshot saved");
            Some(path)
        }
        Err(e) => {
            warn!(scenario = name, error = %e, "failure screenshot not captured");
            None
        }
    }
}
