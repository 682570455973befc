//! In-memory browser for testing
//!
//! [`MockBrowser`] implements [`BrowserControl`](crate::BrowserControl) over a
//! scripted document: elements with attributes, text, visibility, native
//! enabled state and click effects. It shares a [`FakeClock`](crate::FakeClock)
//! with the poller so late-attaching elements, transient visibility and slow
//! ready states are deterministic.
//!
//! ## Example
//!
//! ```rust
//! use holdfast::mock::{MockBrowser, MockElement};
//! use holdfast::{Locator, LocatorChain, Scope};
//!
//! let browser = MockBrowser::new();
//! let edit = browser.add(
//!     MockElement::new("button")
//!         .attr("disabled", "true")
//!         .matching(Locator::css("[data-action=edit]")),
//! );
//!
//! let chain = LocatorChain::new()
//!     .or(Locator::id("editBtn"))
//!     .or(Locator::css("[data-action=edit]"));
//! let resolution = holdfast::locator::resolve(&browser, &chain, &Scope::Document).unwrap();
//! assert_eq!(resolution.handle(), Some(&edit));
//! ```

mod browser;
pub mod strategies;

pub use browser::{ClickEffect, MockBrowser, MockElement, MockSessionFactory};
