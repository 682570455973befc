//! Inspect command handler
//!
//! Opens a page, resolves a fallback chain, classifies the match and
//! optionally probes it. Generic over the browser so tests drive it with
//! the in-memory one.

use crate::commands::InspectArgs;
use crate::error::{CliError, CliResult};
use holdfast::{BrowserControl, Engine, LocatorChain, ProbeReport, Scope, StateVerdict};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{info, warn};

/// What `holdfast inspect` found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectReport {
    /// Page that was opened
    pub url: String,
    /// Whether the page reported ready before the timeout
    pub ready: bool,
    /// The chain as given
    pub chain: String,
    /// Locator that matched, if any
    pub matched: Option<String>,
    /// Locators tried, in order
    pub attempted: Vec<String>,
    /// State of the matched control
    pub verdict: Option<StateVerdict>,
    /// Click probe, when requested
    pub probe: Option<ProbeReport>,
}

impl InspectReport {
    /// Whether a locator matched
    #[must_use]
    pub const fn is_found(&self) -> bool {
        self.matched.is_some()
    }

    /// Human-readable summary
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Page:     {}", self.url);
        if !self.ready {
            let _ = writeln!(out, "          (not ready before timeout)");
        }
        let _ = writeln!(out, "Chain:    {}", self.chain);
        match &self.matched {
            Some(locator) => {
                let _ = writeln!(
                    out,
                    "Matched:  {locator} (locator {} in chain)",
                    self.attempted.len()
                );
            }
            None => {
                let _ = writeln!(out, "Matched:  nothing");
            }
        }
        if let Some(verdict) = &self.verdict {
            let _ = writeln!(out, "State:    {verdict}");
        }
        if let Some(probe) = &self.probe {
            let outcome = match &probe.outcome {
                holdfast::ProbeOutcome::Clicked => "clicked".to_string(),
                holdfast::ProbeOutcome::Blocked { reason } => format!("blocked ({reason})"),
            };
            let _ = writeln!(out, "Probe:    {outcome}");
            if probe.is_unchanged() {
                let _ = writeln!(out, "Effect:   none");
            } else {
                let _ = writeln!(
                    out,
                    "Effect:   url {} -> {}, dialogs {} -> {}",
                    probe.before.url,
                    probe.after.url,
                    probe.before.open_dialogs,
                    probe.after.open_dialogs
                );
                if probe.before.status != probe.after.status {
                    let _ = writeln!(
                        out,
                        "          status {:?} -> {:?}",
                        probe.before.status, probe.after.status
                    );
                }
            }
        }
        out
    }
}

/// Parse `--locator` entries into a chain
pub fn parse_chain(entries: &[String]) -> CliResult<LocatorChain> {
    if entries.is_empty() {
        return Err(CliError::invalid_argument("at least one locator is required"));
    }
    LocatorChain::parse(entries).map_err(|e| CliError::invalid_argument(e.to_string()))
}

/// Run the inspection against `engine`
///
/// A miss is reported, not raised; callers decide the exit status from
/// [`InspectReport::is_found`].
pub fn inspect<B: BrowserControl>(
    engine: &Engine<B>,
    args: &InspectArgs,
) -> CliResult<InspectReport> {
    let chain = parse_chain(&args.locators)?;
    let status = if args.status.is_empty() {
        None
    } else {
        Some(parse_chain(&args.status)?)
    };

    let ready = engine.navigate(&args.url)?.is_satisfied();
    if !ready {
        warn!(url = %args.url, "page not ready before timeout, resolving anyway");
    }

    let resolution = engine.resolve_waiting(&chain, &Scope::Document)?;
    let attempted = resolution.attempted().iter().map(ToString::to_string).collect();
    let matched = resolution.matched().map(ToString::to_string);

    let (verdict, probe) = match resolution.handle() {
        Some(handle) => {
            let verdict = engine.classify(handle)?;
            info!(%chain, %verdict, "control classified");
            let probe = if args.probe {
                Some(engine.probe_and_observe(handle, status.as_ref())?)
            } else {
                None
            };
            (Some(verdict), probe)
        }
        None => (None, None),
    };

    Ok(InspectReport {
        url: args.url.clone(),
        ready,
        chain: chain.to_string(),
        matched,
        attempted,
        verdict,
        probe,
    })
}
