//! Scripted document and session factory

use crate::clock::FakeClock;
use crate::driver::{BrowserControl, ElementHandle, Scope};
use crate::locator::{Locator, Strategy};
use crate::observe::DEFAULT_DIALOG_SELECTOR;
use crate::result::{HoldfastError, HoldfastResult};
use crate::scenario::SessionFactory;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// PNG signature returned as the mock screenshot
const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// What a successful click does to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickEffect {
    /// Open a dialog matching the default dialog selector
    OpenDialog,
    /// Navigate to a new URL, invalidating every handle
    Navigate(String),
    /// Replace the text of the element whose `id` is `target_id`
    SetText {
        /// `id` attribute of the element to update
        target_id: String,
        /// New text
        text: String,
    },
}

/// An element in the scripted document
#[derive(Debug, Clone)]
pub struct MockElement {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: Option<String>,
    displayed: bool,
    native_enabled: bool,
    matches: Vec<Locator>,
    click_block: Option<String>,
    effects: Vec<ClickEffect>,
    attached_after: Duration,
    displayed_after: Option<Duration>,
}

impl MockElement {
    /// Create a displayed, natively enabled element
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            text: None,
            displayed: true,
            native_enabled: true,
            matches: Vec::new(),
            click_block: None,
            effects: Vec::new(),
            attached_after: Duration::ZERO,
            displayed_after: None,
        }
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the visible text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Render the element hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Report the element as natively disabled
    #[must_use]
    pub const fn natively_disabled(mut self) -> Self {
        self.native_enabled = false;
        self
    }

    /// Match `locator` in addition to the built-in id, class, test-id and
    /// text matching. CSS and XPath locators only match through this.
    #[must_use]
    pub fn matching(mut self, locator: Locator) -> Self {
        self.matches.push(locator);
        self
    }

    /// Make every click fail with `message`, like an overlay intercepting it
    #[must_use]
    pub fn blocking_clicks(mut self, message: impl Into<String>) -> Self {
        self.click_block = Some(message.into());
        self
    }

    /// Run `effect` on each successful click
    #[must_use]
    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Keep the element out of the document until the clock reaches `after`
    #[must_use]
    pub const fn attached_after(mut self, after: Duration) -> Self {
        self.attached_after = after;
        self
    }

    /// Keep the element hidden until the clock reaches `after`
    #[must_use]
    pub const fn displayed_after(mut self, after: Duration) -> Self {
        self.displayed = true;
        self.displayed_after = Some(after);
        self
    }

    /// Tag name
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    fn matches(&self, locator: &Locator) -> bool {
        if self.matches.contains(locator) {
            return true;
        }
        let selector = locator.selector();
        match locator.strategy() {
            Strategy::Id => self.attribute("id") == Some(selector),
            Strategy::TestId => self.attribute("data-testid") == Some(selector),
            Strategy::ClassName => self
                .attribute("class")
                .is_some_and(|c| c.split_whitespace().any(|token| token == selector)),
            Strategy::Text => self.text.as_deref().is_some_and(|t| t.contains(selector)),
            Strategy::Css | Strategy::XPath => false,
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[derive(Debug)]
struct Node {
    element: MockElement,
    parent: Option<usize>,
    detached: bool,
}

#[derive(Debug)]
struct MockDocument {
    nodes: Vec<Node>,
    url: String,
    generation: u64,
    rejected: Vec<Locator>,
    connected: bool,
    ready_after: Duration,
    ready_failures: u32,
    queries: Vec<Locator>,
    clicks: Vec<ElementHandle>,
    screenshot_fails: bool,
    scripts: HashMap<String, serde_json::Value>,
}

impl MockDocument {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            url: "about:blank".to_string(),
            generation: 0,
            rejected: Vec::new(),
            connected: true,
            ready_after: Duration::ZERO,
            ready_failures: 0,
            queries: Vec::new(),
            clicks: Vec::new(),
            screenshot_fails: false,
            scripts: HashMap::new(),
        }
    }

    fn handle(&self, index: usize) -> ElementHandle {
        ElementHandle::new(format!("mock-{}-{index}", self.generation))
    }

    fn ensure_connected(&self) -> HoldfastResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(HoldfastError::session("mock session is disconnected"))
        }
    }

    /// Resolve a handle to a live node index
    fn index_of(&self, handle: &ElementHandle, now: Duration) -> HoldfastResult<usize> {
        self.ensure_connected()?;
        let stale = || HoldfastError::StaleElement {
            handle: handle.id().to_string(),
        };
        let rest = handle.id().strip_prefix("mock-").ok_or_else(stale)?;
        let (generation, index) = rest.split_once('-').ok_or_else(stale)?;
        let generation: u64 = generation.parse().map_err(|_| stale())?;
        let index: usize = index.parse().map_err(|_| stale())?;
        if generation != self.generation {
            return Err(stale());
        }
        match self.nodes.get(index) {
            Some(node) if self.is_attached(node, now) => Ok(index),
            _ => Err(stale()),
        }
    }

    fn is_attached(&self, node: &Node, now: Duration) -> bool {
        !node.detached && now >= node.element.attached_after
    }

    fn is_descendant(&self, mut index: usize, ancestor: usize) -> bool {
        while let Some(parent) = self.nodes[index].parent {
            if parent == ancestor {
                return true;
            }
            index = parent;
        }
        false
    }

    fn matching(
        &mut self,
        locator: &Locator,
        scope: &Scope,
        now: Duration,
    ) -> HoldfastResult<Vec<usize>> {
        self.ensure_connected()?;
        self.queries.push(locator.clone());
        if self.rejected.contains(locator) {
            return Err(HoldfastError::InvalidSelector {
                selector: locator.to_string(),
                message: "the query mechanism rejected the selector".to_string(),
            });
        }
        let root = match scope {
            Scope::Document => None,
            Scope::Within(handle) => Some(self.index_of(handle, now)?),
        };
        Ok((0..self.nodes.len())
            .filter(|&i| {
                let node = &self.nodes[i];
                self.is_attached(node, now)
                    && root.map_or(true, |r| self.is_descendant(i, r))
                    && node.element.matches(locator)
            })
            .collect())
    }

    fn apply(&mut self, effect: ClickEffect) {
        match effect {
            ClickEffect::OpenDialog => self.nodes.push(Node {
                element: MockElement::new("div")
                    .attr("role", "dialog")
                    .attr("aria-hidden", "false")
                    .matching(Locator::css(DEFAULT_DIALOG_SELECTOR)),
                parent: None,
                detached: false,
            }),
            ClickEffect::Navigate(url) => {
                self.url = url;
                self.generation += 1;
            }
            ClickEffect::SetText { target_id, text } => {
                if let Some(node) = self
                    .nodes
                    .iter_mut()
                    .find(|n| n.element.attribute("id") == Some(target_id.as_str()))
                {
                    node.element.text = Some(text);
                }
            }
        }
    }
}

/// In-memory [`BrowserControl`] implementation.
///
/// Clones share one document, so a test can keep a handle on the browser
/// that a [`MockSessionFactory`] handed to a scenario.
#[derive(Debug, Clone)]
pub struct MockBrowser {
    state: Arc<Mutex<MockDocument>>,
    clock: FakeClock,
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBrowser {
    /// Create an empty document on its own clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(FakeClock::new())
    }

    /// Create an empty document that reads time from `clock`
    #[must_use]
    pub fn with_clock(clock: FakeClock) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockDocument::new())),
            clock,
        }
    }

    fn doc(&self) -> MutexGuard<'_, MockDocument> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> Duration {
        crate::clock::Clock::now(&self.clock)
    }

    /// The clock this document reads
    #[must_use]
    pub fn clock(&self) -> &FakeClock {
        &self.clock
    }

    /// Add a top-level element
    pub fn add(&self, element: MockElement) -> ElementHandle {
        let mut doc = self.doc();
        doc.nodes.push(Node {
            element,
            parent: None,
            detached: false,
        });
        doc.handle(doc.nodes.len() - 1)
    }

    /// Add an element under `parent`
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not a live handle of this document.
    pub fn add_child(&self, parent: &ElementHandle, element: MockElement) -> ElementHandle {
        let now = self.now();
        let mut doc = self.doc();
        let parent = doc
            .index_of(parent, now)
            .expect("parent must be a live handle");
        doc.nodes.push(Node {
            element,
            parent: Some(parent),
            detached: false,
        });
        doc.handle(doc.nodes.len() - 1)
    }

    /// Set the current URL
    pub fn set_url(&self, url: impl Into<String>) {
        self.doc().url = url.into();
    }

    /// Change an attribute of a live element
    ///
    /// # Errors
    ///
    /// Returns `StaleElement` for a dead handle
    pub fn set_attribute(
        &self,
        handle: &ElementHandle,
        name: &str,
        value: Option<&str>,
    ) -> HoldfastResult<()> {
        let now = self.now();
        let mut doc = self.doc();
        let index = doc.index_of(handle, now)?;
        let attributes = &mut doc.nodes[index].element.attributes;
        match value {
            Some(v) => {
                let _ = attributes.insert(name.to_string(), v.to_string());
            }
            None => {
                let _ = attributes.remove(name);
            }
        }
        Ok(())
    }

    /// Remove an element from the document
    pub fn detach(&self, handle: &ElementHandle) {
        let now = self.now();
        let mut doc = self.doc();
        if let Ok(index) = doc.index_of(handle, now) {
            doc.nodes[index].detached = true;
        }
    }

    /// Simulate a page transition: every issued handle becomes stale
    pub fn transition(&self) {
        self.doc().generation += 1;
    }

    /// Drop the transport; every later call fails with a session error
    pub fn disconnect(&self) {
        self.doc().connected = false;
    }

    /// Make the query mechanism reject `locator` as malformed
    pub fn reject_selector(&self, locator: Locator) {
        self.doc().rejected.push(locator);
    }

    /// Report `document.readyState` as `loading` until the clock reaches `after`
    pub fn ready_after(&self, after: Duration) {
        self.doc().ready_after = after;
    }

    /// Fail the next `count` ready-state evaluations with a drift error
    pub fn fail_ready_checks(&self, count: u32) {
        self.doc().ready_failures = count;
    }

    /// Make screenshot capture fail
    pub fn fail_screenshots(&self) {
        self.doc().screenshot_fails = true;
    }

    /// Return `value` when `source` is evaluated
    pub fn script_result(&self, source: impl Into<String>, value: serde_json::Value) {
        let _ = self.doc().scripts.insert(source.into(), value);
    }

    /// Every locator queried so far, in order
    #[must_use]
    pub fn queries(&self) -> Vec<Locator> {
        self.doc().queries.clone()
    }

    /// Every click attempted so far, including rejected ones
    #[must_use]
    pub fn clicks(&self) -> Vec<ElementHandle> {
        self.doc().clicks.clone()
    }

    /// Whether the transport is still up
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.doc().connected
    }
}

impl BrowserControl for MockBrowser {
    fn find_one(&self, locator: &Locator, scope: &Scope) -> HoldfastResult<Option<ElementHandle>> {
        let now = self.now();
        let mut doc = self.doc();
        let found = doc.matching(locator, scope, now)?;
        Ok(found.first().map(|&i| doc.handle(i)))
    }

    fn find_all(&self, locator: &Locator, scope: &Scope) -> HoldfastResult<Vec<ElementHandle>> {
        let now = self.now();
        let mut doc = self.doc();
        let found = doc.matching(locator, scope, now)?;
        Ok(found.into_iter().map(|i| doc.handle(i)).collect())
    }

    fn attribute(&self, handle: &ElementHandle, name: &str) -> HoldfastResult<Option<String>> {
        let now = self.now();
        let doc = self.doc();
        let index = doc.index_of(handle, now)?;
        Ok(doc.nodes[index].element.attribute(name).map(str::to_string))
    }

    fn is_displayed(&self, handle: &ElementHandle) -> HoldfastResult<bool> {
        let now = self.now();
        let doc = self.doc();
        let element = &doc.nodes[doc.index_of(handle, now)?].element;
        Ok(element.displayed && element.displayed_after.map_or(true, |after| now >= after))
    }

    fn is_native_enabled(&self, handle: &ElementHandle) -> HoldfastResult<bool> {
        let now = self.now();
        let doc = self.doc();
        let index = doc.index_of(handle, now)?;
        Ok(doc.nodes[index].element.native_enabled)
    }

    fn click(&self, handle: &ElementHandle) -> HoldfastResult<()> {
        let now = self.now();
        let mut doc = self.doc();
        doc.clicks.push(handle.clone());
        let index = doc.index_of(handle, now)?;
        let element = &doc.nodes[index].element;

        if let Some(message) = &element.click_block {
            return Err(HoldfastError::click_blocked(message.clone()));
        }
        let displayed =
            element.displayed && element.displayed_after.map_or(true, |after| now >= after);
        if !displayed {
            return Err(HoldfastError::click_blocked("element not interactable"));
        }
        if !element.native_enabled {
            // Browsers swallow clicks on disabled controls
            return Ok(());
        }
        let effects = element.effects.clone();
        for effect in effects {
            doc.apply(effect);
        }
        Ok(())
    }

    fn text(&self, handle: &ElementHandle) -> HoldfastResult<Option<String>> {
        let now = self.now();
        let doc = self.doc();
        let index = doc.index_of(handle, now)?;
        Ok(doc.nodes[index].element.text.clone())
    }

    fn current_url(&self) -> HoldfastResult<String> {
        let doc = self.doc();
        doc.ensure_connected()?;
        Ok(doc.url.clone())
    }

    fn evaluate_script(&self, source: &str) -> HoldfastResult<serde_json::Value> {
        let now = self.now();
        let mut doc = self.doc();
        doc.ensure_connected()?;
        if let Some(value) = doc.scripts.get(source) {
            return Ok(value.clone());
        }
        if source.contains("document.readyState") {
            if doc.ready_failures > 0 {
                doc.ready_failures -= 1;
                return Err(HoldfastError::ScriptFailed {
                    message: "execution context was destroyed".to_string(),
                });
            }
            let state = if now >= doc.ready_after {
                "complete"
            } else {
                "loading"
            };
            return Ok(serde_json::Value::String(state.to_string()));
        }
        Err(HoldfastError::ScriptFailed {
            message: format!("no scripted result for {source:?}"),
        })
    }

    fn navigate(&self, url: &str) -> HoldfastResult<()> {
        let mut doc = self.doc();
        doc.ensure_connected()?;
        doc.url = url.to_string();
        doc.generation += 1;
        Ok(())
    }

    fn screenshot(&self) -> HoldfastResult<Vec<u8>> {
        let doc = self.doc();
        doc.ensure_connected()?;
        if doc.screenshot_fails {
            return Err(HoldfastError::session("screenshot capture failed"));
        }
        Ok(PNG_SIGNATURE.to_vec())
    }
}

type Setup = dyn Fn(&MockBrowser) + Send + Sync;

/// [`SessionFactory`] that hands out freshly scripted [`MockBrowser`]s and
/// counts opens and closes.
pub struct MockSessionFactory {
    clock: FakeClock,
    setup: Box<Setup>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    last: Mutex<Option<MockBrowser>>,
    fail_open: bool,
}

impl std::fmt::Debug for MockSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSessionFactory")
            .field("opened", &self.opened())
            .field("closed", &self.closed())
            .field("fail_open", &self.fail_open)
            .finish_non_exhaustive()
    }
}

impl MockSessionFactory {
    /// Create a factory that runs `setup` on every new session
    pub fn new<F>(clock: FakeClock, setup: F) -> Self
    where
        F: Fn(&MockBrowser) + Send + Sync + 'static,
    {
        Self {
            clock,
            setup: Box::new(setup),
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            last: Mutex::new(None),
            fail_open: false,
        }
    }

    /// Make `open` fail with a launch error
    #[must_use]
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Sessions opened so far
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed so far
    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// The most recently opened session
    #[must_use]
    pub fn last_session(&self) -> Option<MockBrowser> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionFactory for MockSessionFactory {
    type Session = MockBrowser;

    fn open(&self) -> HoldfastResult<MockBrowser> {
        if self.fail_open {
            return Err(HoldfastError::BrowserLaunch {
                message: "mock launch refused".to_string(),
            });
        }
        let browser = MockBrowser::with_clock(self.clock.clone());
        (self.setup)(&browser);
        let _ = self.opened.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(browser.clone());
        Ok(browser)
    }

    fn close(&self, session: MockBrowser) -> HoldfastResult<()> {
        session.disconnect();
        let _ = self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
