//! Locator Chain Resolver
//!
//! A [`Locator`] is a strategy plus a selector. A [`LocatorChain`] is an
//! ordered list of locators, most specific and most stable first. Resolution
//! walks the chain and stops at the first locator with a live match.
//!
//! # Design Philosophy
//!
//! - **Drift is expected**: a locator that matches nothing is skipped silently
//! - **Faults are not drift**: a selector the browser cannot execute aborts the chain
//! - **First match wins**: a chain yields at most one element per resolution
//! - **Diagnosable**: a miss reports every locator that was tried

use crate::driver::{BrowserControl, ElementHandle, Scope};
use crate::result::{HoldfastError, HoldfastResult};
use crate::wait::Poller;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// How a locator finds candidate elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// `id` attribute equality
    Id,
    /// CSS selector (e.g., "button[data-action='edit']")
    Css,
    /// XPath expression
    XPath,
    /// Single class name token
    ClassName,
    /// `data-testid` attribute equality
    TestId,
    /// Innermost element whose text content contains the selector
    Text,
}

impl Strategy {
    /// Short tag used in the `strategy:selector` textual form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Css => "css",
            Self::XPath => "xpath",
            Self::ClassName => "class",
            Self::TestId => "test-id",
            Self::Text => "text",
        }
    }

    /// Parse a strategy tag (case-insensitive)
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "id" => Some(Self::Id),
            "css" => Some(Self::Css),
            "xpath" => Some(Self::XPath),
            "class" | "class-name" | "classname" => Some(Self::ClassName),
            "test-id" | "testid" => Some(Self::TestId),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strategy plus a selector
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    strategy: Strategy,
    selector: String,
}

impl Locator {
    /// Create a locator
    #[must_use]
    pub fn new(strategy: Strategy, selector: impl Into<String>) -> Self {
        Self {
            strategy,
            selector: selector.into(),
        }
    }

    /// Locate by `id` attribute
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::new(Strategy::Id, id)
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Css, selector)
    }

    /// Locate by XPath expression
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, expression)
    }

    /// Locate by class name
    #[must_use]
    pub fn class_name(class: impl Into<String>) -> Self {
        Self::new(Strategy::ClassName, class)
    }

    /// Locate by `data-testid`
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::new(Strategy::TestId, id)
    }

    /// Locate by contained text
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Strategy::Text, text)
    }

    /// Get the strategy
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Get the selector
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Equivalent CSS selector, for strategies CSS can express
    #[must_use]
    pub fn to_css(&self) -> Option<String> {
        let s = &self.selector;
        match self.strategy {
            Strategy::Css => Some(s.clone()),
            Strategy::Id => Some(format!("[id={s:?}]")),
            Strategy::ClassName => Some(format!("[class~={s:?}]")),
            Strategy::TestId => Some(format!("[data-testid={s:?}]")),
            Strategy::XPath | Strategy::Text => None,
        }
    }

    /// JavaScript expression evaluating to an array of matching elements
    /// under `root` (e.g. `document` or `this`)
    #[must_use]
    pub fn to_query_all(&self, root: &str) -> String {
        let s = &self.selector;
        match self.strategy {
            Strategy::XPath => format!(
                "(() => {{ const r = document.evaluate({s:?}, {root}, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
                 for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
                 return out; }})()"
            ),
            Strategy::Text => format!(
                "Array.from({root}.querySelectorAll('*')) \
                 .filter(el => el.textContent.includes({s:?}) \
                 && !Array.from(el.children).some(c => c.textContent.includes({s:?})))"
            ),
            _ => {
                let css = self.to_css().unwrap_or_default();
                format!("Array.from({root}.querySelectorAll({css:?}))")
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.strategy, self.selector)
    }
}

impl FromStr for Locator {
    type Err = HoldfastError;

    /// Parse `strategy:selector`, e.g. `id:editBtn` or `xpath://button`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, selector) = s.split_once(':').ok_or_else(|| {
            HoldfastError::config(format!("locator {s:?} is not in strategy:selector form"))
        })?;
        let strategy = Strategy::from_tag(tag.trim())
            .ok_or_else(|| HoldfastError::config(format!("unknown locator strategy {tag:?}")))?;
        if selector.is_empty() {
            return Err(HoldfastError::config(format!("locator {s:?} has an empty selector")));
        }
        Ok(Self::new(strategy, selector))
    }
}

/// Ordered locators tried until one matches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocatorChain {
    locators: Vec<Locator>,
}

impl LocatorChain {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fallback locator
    #[must_use]
    pub fn or(mut self, locator: Locator) -> Self {
        self.locators.push(locator);
        self
    }

    /// Parse each entry as `strategy:selector`
    ///
    /// # Errors
    ///
    /// Returns a config error for the first malformed entry
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> HoldfastResult<Self> {
        entries
            .iter()
            .map(|e| e.as_ref().parse::<Locator>())
            .collect::<HoldfastResult<Vec<_>>>()
            .map(|locators| Self { locators })
    }

    /// Number of locators
    #[must_use]
    pub fn len(&self) -> usize {
        self.locators.len()
    }

    /// Whether the chain has no locators
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    /// Iterate in preference order
    pub fn iter(&self) -> std::slice::Iter<'_, Locator> {
        self.locators.iter()
    }

    /// Borrow as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[Locator] {
        &self.locators
    }
}

impl From<Vec<Locator>> for LocatorChain {
    fn from(locators: Vec<Locator>) -> Self {
        Self { locators }
    }
}

impl From<Locator> for LocatorChain {
    fn from(locator: Locator) -> Self {
        Self {
            locators: vec![locator],
        }
    }
}

impl FromIterator<Locator> for LocatorChain {
    fn from_iter<I: IntoIterator<Item = Locator>>(iter: I) -> Self {
        Self {
            locators: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a LocatorChain {
    type Item = &'a Locator;
    type IntoIter = std::slice::Iter<'a, Locator>;

    fn into_iter(self) -> Self::IntoIter {
        self.locators.iter()
    }
}

impl fmt::Display for LocatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_locators(&self.locators, f)
    }
}

fn format_locators(locators: &[Locator], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if locators.is_empty() {
        return f.write_str("<empty chain>");
    }
    for (i, locator) in locators.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{locator}")?;
    }
    Ok(())
}

/// Outcome of resolving a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A locator matched
    Found {
        /// The matched element
        handle: ElementHandle,
        /// The locator that matched
        matched: Locator,
        /// Locators tried, ending with `matched`
        attempted: Vec<Locator>,
    },
    /// The chain was exhausted
    NotFound {
        /// Every locator tried, in chain order
        attempted: Vec<Locator>,
    },
}

impl Resolution {
    /// Whether a locator matched
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// The matched element
    #[must_use]
    pub const fn handle(&self) -> Option<&ElementHandle> {
        match self {
            Self::Found { handle, .. } => Some(handle),
            Self::NotFound { .. } => None,
        }
    }

    /// The locator that matched
    #[must_use]
    pub const fn matched(&self) -> Option<&Locator> {
        match self {
            Self::Found { matched, .. } => Some(matched),
            Self::NotFound { .. } => None,
        }
    }

    /// Locators tried, in order
    #[must_use]
    pub fn attempted(&self) -> &[Locator] {
        match self {
            Self::Found { attempted, .. } | Self::NotFound { attempted } => attempted,
        }
    }

    /// Take the matched element, turning a miss into [`HoldfastError::NotFound`]
    pub fn into_handle(self) -> HoldfastResult<ElementHandle> {
        match self {
            Self::Found { handle, .. } => Ok(handle),
            Self::NotFound { attempted } => Err(HoldfastError::NotFound {
                attempted: LocatorChain::from(attempted).to_string(),
            }),
        }
    }
}

/// Resolve `chain` to at most one element.
///
/// # Errors
///
/// Propagates any error from the collaborator's find; "no match" is not an
/// error and advances to the next locator.
pub fn resolve<B>(browser: &B, chain: &LocatorChain, scope: &Scope) -> HoldfastResult<Resolution>
where
    B: BrowserControl + ?Sized,
{
    let mut attempted = Vec::with_capacity(chain.len());
    for locator in chain {
        attempted.push(locator.clone());
        match browser.find_one(locator, scope)? {
            Some(handle) => {
                info!(%locator, position = attempted.len(), "locator matched");
                return Ok(Resolution::Found {
                    handle,
                    matched: locator.clone(),
                    attempted,
                });
            }
            None => debug!(%locator, "no match, trying next locator"),
        }
    }
    debug!(chain = %chain, "locator chain exhausted");
    Ok(Resolution::NotFound { attempted })
}

/// Resolve `chain` to the full match set of its first non-empty locator.
///
/// Used for existence and absence checks. An exhausted chain yields an
/// empty set.
///
/// # Errors
///
/// Propagates any error from the collaborator's find.
pub fn resolve_all<B>(
    browser: &B,
    chain: &LocatorChain,
    scope: &Scope,
) -> HoldfastResult<Vec<ElementHandle>>
where
    B: BrowserControl + ?Sized,
{
    for locator in chain {
        let handles = browser.find_all(locator, scope)?;
        if !handles.is_empty() {
            debug!(%locator, count = handles.len(), "locator matched set");
            return Ok(handles);
        }
        debug!(%locator, "empty match set, trying next locator");
    }
    Ok(Vec::new())
}

/// Re-run [`resolve`] through `poller` until the chain matches or the wait
/// times out. A timeout yields [`Resolution::NotFound`].
///
/// # Errors
///
/// Propagates non-drift errors from the collaborator.
pub fn resolve_waiting<B>(
    browser: &B,
    chain: &LocatorChain,
    scope: &Scope,
    poller: &Poller,
) -> HoldfastResult<Resolution>
where
    B: BrowserControl + ?Sized,
{
    let waited_for = chain.to_string();
    let result = poller.poll_until(&waited_for, || {
        let resolution = resolve(browser, chain, scope)?;
        Ok(resolution.is_found().then_some(resolution))
    })?;
    Ok(result.into_value().unwrap_or_else(|| Resolution::NotFound {
        attempted: chain.as_slice().to_vec(),
    }))
}
