//! Side-effect observation
//!
//! A snapshot of what a click could have changed: the URL, how many dialogs
//! are open, and optionally the text of a status element. Comparing
//! snapshots taken before and after a probe shows whether a supposedly
//! disabled control did anything.

use crate::driver::{BrowserControl, ElementHandle, Scope};
use crate::locator::{self, Locator, LocatorChain};
use crate::result::{HoldfastError, HoldfastResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Selector matching open dialogs in the common UI kits
pub const DEFAULT_DIALOG_SELECTOR: &str =
    ".modal.show, .dialog.open, [role='dialog'][aria-hidden='false']";

/// Page state at one moment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Current URL
    pub url: String,
    /// Displayed dialogs
    pub open_dialogs: usize,
    /// Text of the status element, when one resolved
    pub status: Option<String>,
}

/// Takes [`Observation`]s
#[derive(Debug, Clone)]
pub struct Observer {
    dialog_chain: LocatorChain,
}

impl Default for Observer {
    fn default() -> Self {
        Self::new(LocatorChain::from(Locator::css(DEFAULT_DIALOG_SELECTOR)))
    }
}

impl Observer {
    /// Count dialogs with `dialog_chain`
    #[must_use]
    pub fn new(dialog_chain: LocatorChain) -> Self {
        Self { dialog_chain }
    }

    /// Chain used to count dialogs
    #[must_use]
    pub fn dialog_chain(&self) -> &LocatorChain {
        &self.dialog_chain
    }

    /// Snapshot the page.
    ///
    /// # Errors
    ///
    /// Propagates non-drift collaborator errors. A dialog or status element
    /// that vanishes mid-snapshot is skipped.
    pub fn observe<B>(
        &self,
        browser: &B,
        status: Option<&LocatorChain>,
    ) -> HoldfastResult<Observation>
    where
        B: BrowserControl + ?Sized,
    {
        let url = browser.current_url()?;

        let mut open_dialogs = 0;
        for handle in locator::resolve_all(browser, &self.dialog_chain, &Scope::Document)? {
            if drift_as_none(browser.is_displayed(&handle))?.unwrap_or(false) {
                open_dialogs += 1;
            }
        }

        let status = match status {
            Some(chain) => match locator::resolve(browser, chain, &Scope::Document)?.handle() {
                Some(handle) => status_text(browser, handle)?,
                None => None,
            },
            None => None,
        };

        let observation = Observation {
            url,
            open_dialogs,
            status,
        };
        debug!(?observation, "observed page");
        Ok(observation)
    }
}

fn status_text<B>(browser: &B, handle: &ElementHandle) -> HoldfastResult<Option<String>>
where
    B: BrowserControl + ?Sized,
{
    Ok(drift_as_none(browser.text(handle))?
        .flatten()
        .map(|text| text.trim().to_string()))
}

fn drift_as_none<T>(result: HoldfastResult<T>) -> HoldfastResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_drift() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Require a non-empty status, as a convenience for status-cell lookups
///
/// # Errors
///
/// Returns `NotFound` when the chain misses or the element has no text.
pub fn status_required<B>(
    browser: &B,
    chain: &LocatorChain,
    scope: &Scope,
) -> HoldfastResult<String>
where
    B: BrowserControl + ?Sized,
{
    let handle = locator::resolve(browser, chain, scope)?.into_handle()?;
    status_text(browser, &handle)?
        .filter(|text| !text.is_empty())
        .ok_or_else(|| HoldfastError::NotFound {
            attempted: format!("text of {chain}"),
        })
}
