//! Browser-control collaborator
//!
//! Holdfast does not talk to a browser itself. Everything it knows about the
//! live document comes through [`BrowserControl`], a synchronous trait with
//! one implementation per transport:
//!
//! - `ChromiumBrowser` (feature `browser`) drives Chromium over CDP
//! - [`MockBrowser`](crate::mock::MockBrowser) serves an in-memory document for tests
//!
//! Errors returned by implementations must follow the crate taxonomy: a
//! selector the query mechanism cannot execute is
//! [`HoldfastError::InvalidSelector`](crate::HoldfastError::InvalidSelector),
//! a handle that outlived its page is
//! [`HoldfastError::StaleElement`](crate::HoldfastError::StaleElement), a
//! rejected click is
//! [`HoldfastError::ClickBlocked`](crate::HoldfastError::ClickBlocked), and a
//! broken transport is [`HoldfastError::Session`](crate::HoldfastError::Session).

use crate::locator::Locator;
use crate::result::HoldfastResult;
use serde::{Deserialize, Serialize};

/// Opaque reference to a live DOM node.
///
/// Carries no cached state. A page transition invalidates every handle
/// issued before it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    id: String,
}

impl ElementHandle {
    /// Wrap a collaborator-issued id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The collaborator-issued id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Where a find runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Scope {
    /// The whole document
    #[default]
    Document,
    /// Descendants of a previously resolved element
    Within(ElementHandle),
}

impl Scope {
    /// Scope a query to the subtree of `handle`
    #[must_use]
    pub fn within(handle: &ElementHandle) -> Self {
        Self::Within(handle.clone())
    }
}

/// Synchronous browser-control operations consumed by the engine
pub trait BrowserControl {
    /// First element matching `locator` in `scope`, or `None` when nothing matches
    fn find_one(&self, locator: &Locator, scope: &Scope) -> HoldfastResult<Option<ElementHandle>>;

    /// All elements matching `locator` in `scope`, in document order
    fn find_all(&self, locator: &Locator, scope: &Scope) -> HoldfastResult<Vec<ElementHandle>>;

    /// Attribute value, or `None` when the attribute is absent
    fn attribute(&self, handle: &ElementHandle, name: &str) -> HoldfastResult<Option<String>>;

    /// Whether the element is rendered and visible
    fn is_displayed(&self, handle: &ElementHandle) -> HoldfastResult<bool>;

    /// The browser's own notion of enabled
    fn is_native_enabled(&self, handle: &ElementHandle) -> HoldfastResult<bool>;

    /// Click the element
    fn click(&self, handle: &ElementHandle) -> HoldfastResult<()>;

    /// Visible text of the element
    fn text(&self, handle: &ElementHandle) -> HoldfastResult<Option<String>>;

    /// URL of the current document
    fn current_url(&self) -> HoldfastResult<String>;

    /// Evaluate a JavaScript expression in the page and return its JSON value
    fn evaluate_script(&self, source: &str) -> HoldfastResult<serde_json::Value>;

    /// Navigate to `url`
    fn navigate(&self, url: &str) -> HoldfastResult<()>;

    /// PNG screenshot of the viewport
    fn screenshot(&self) -> HoldfastResult<Vec<u8>>;
}

impl<B: BrowserControl + ?Sized> BrowserControl for &B {
    fn find_one(&self, locator: &Locator, scope: &Scope) -> HoldfastResult<Option<ElementHandle>> {
        (**self).find_one(locator, scope)
    }

    fn find_all(&self, locator: &Locator, scope: &Scope) -> HoldfastResult<Vec<ElementHandle>> {
        (**self).find_all(locator, scope)
    }

    fn attribute(&self, handle: &ElementHandle, name: &str) -> HoldfastResult<Option<String>> {
        (**self).attribute(handle, name)
    }

    fn is_displayed(&self, handle: &ElementHandle) -> HoldfastResult<bool> {
        (**self).is_displayed(handle)
    }

    fn is_native_enabled(&self, handle: &ElementHandle) -> HoldfastResult<bool> {
        (**self).is_native_enabled(handle)
    }

    fn click(&self, handle: &ElementHandle) -> HoldfastResult<()> {
        (**self).click(handle)
    }

    fn text(&self, handle: &ElementHandle) -> HoldfastResult<Option<String>> {
        (**self).text(handle)
    }

    fn current_url(&self) -> HoldfastResult<String> {
        (**self).current_url()
    }

    fn evaluate_script(&self, source: &str) -> HoldfastResult<serde_json::Value> {
        (**self).evaluate_script(source)
    }

    fn navigate(&self, url: &str) -> HoldfastResult<()> {
        (**self).navigate(url)
    }

    fn screenshot(&self) -> HoldfastResult<Vec<u8>> {
        (**self).screenshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_id_and_display() {
        let handle = ElementHandle::new("node-42");
        assert_eq!(handle.id(), "node-42");
        assert_eq!(handle.to_string(), "node-42");
    }

    #[test]
    fn test_scope_default_is_document() {
        assert_eq!(Scope::default(), Scope::Document);
    }

    #[test]
    fn test_scope_within() {
        let row = ElementHandle::new("row-1");
        assert_eq!(Scope::within(&row), Scope::Within(row));
    }
}
