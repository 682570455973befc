//! Proptest strategies for mock documents
//!
//! Generators for locator chains and for the combinations of disabling
//! signals a control can carry. Property tests should feed these into a
//! [`MockBrowser`] and exercise the real resolver and oracle, not a model of
//! them.
//!
//! ```rust,ignore
//! proptest! {
//!     #[test]
//!     fn prop_explicit_disabled_wins(signals in any_control_signals()) {
//!         let browser = MockBrowser::new();
//!         let handle = browser.add(signals.with_disabled("true").to_element());
//!         let verdict = oracle.classify(&browser, &handle).unwrap();
//!         prop_assert!(verdict.is_disabled());
//!     }
//! }
//! ```

use super::browser::MockElement;
#[cfg(feature = "proptest")]
use crate::locator::{Locator, LocatorChain};

#[cfg(feature = "proptest")]
use proptest::prelude::*;

/// The disabling signals carried by one generated control
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControlSignals {
    /// `disabled` attribute value, `None` when absent
    pub disabled: Option<String>,
    /// `aria-disabled` attribute value, `None` when absent
    pub aria_disabled: Option<String>,
    /// Class tokens
    pub classes: Vec<String>,
    /// Native enabled state reported by the browser
    pub native_enabled: bool,
    /// Whether the control is rendered
    pub displayed: bool,
}

impl ControlSignals {
    /// A plain visible, enabled button with no disabling signals
    #[must_use]
    pub fn plain() -> Self {
        Self {
            native_enabled: true,
            displayed: true,
            ..Self::default()
        }
    }

    /// Replace the `disabled` attribute
    #[must_use]
    pub fn with_disabled(mut self, value: impl Into<String>) -> Self {
        self.disabled = Some(value.into());
        self
    }

    /// Replace the `aria-disabled` attribute
    #[must_use]
    pub fn with_aria_disabled(mut self, value: impl Into<String>) -> Self {
        self.aria_disabled = Some(value.into());
        self
    }

    /// Build a button element carrying these signals
    #[must_use]
    pub fn to_element(&self) -> MockElement {
        let mut element = MockElement::new("button");
        if let Some(value) = &self.disabled {
            element = element.attr("disabled", value.clone());
        }
        if let Some(value) = &self.aria_disabled {
            element = element.attr("aria-disabled", value.clone());
        }
        if !self.classes.is_empty() {
            element = element.attr("class", self.classes.join(" "));
        }
        if !self.native_enabled {
            element = element.natively_disabled();
        }
        if !self.displayed {
            element = element.hidden();
        }
        element
    }
}

/// Attribute values worth generating: the recognised ones in several cases,
/// the empty string, and noise
#[cfg(feature = "proptest")]
fn attribute_value() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        2 => Just(None),
        1 => prop::sample::select(vec![
            "true", "TRUE", "True", "false", "False", "", "disabled", "0", "yes",
        ])
        .prop_map(|v| Some(v.to_string())),
        1 => "[a-z]{1,6}".prop_map(Some),
    ]
}

/// Class lists mixing disabling tokens with ordinary ones
#[cfg(feature = "proptest")]
fn class_tokens() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::sample::select(vec![
            "btn",
            "btn-primary",
            "disabled",
            "btn-disabled",
            "is-disabled",
            "disabled-look",
            "active",
        ])
        .prop_map(str::to_string),
        0..4,
    )
}

/// Generate any combination of disabling signals
#[cfg(feature = "proptest")]
pub fn any_control_signals() -> impl Strategy<Value = ControlSignals> {
    (
        attribute_value(),
        attribute_value(),
        class_tokens(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(disabled, aria_disabled, classes, native_enabled, displayed)| ControlSignals {
                disabled,
                aria_disabled,
                classes,
                native_enabled,
                displayed,
            },
        )
}

/// Generate a locator the mock matches without registration
#[cfg(feature = "proptest")]
pub fn any_builtin_locator() -> impl Strategy<Value = Locator> {
    ("[a-e]", 0..4u8).prop_map(|(name, kind)| match kind {
        0 => Locator::id(name),
        1 => Locator::class_name(name),
        2 => Locator::test_id(name),
        _ => Locator::text(name),
    })
}

/// Generate a non-empty locator chain
#[cfg(feature = "proptest")]
pub fn any_locator_chain() -> impl Strategy<Value = LocatorChain> {
    prop::collection::vec(any_builtin_locator(), 1..6).prop_map(LocatorChain::from)
}

// Non-proptest fixtures

/// Controls observed in real pages, one per disabling idiom
#[must_use]
pub fn standard_disabled_controls() -> Vec<ControlSignals> {
    vec![
        ControlSignals::plain().with_disabled("true"),
        ControlSignals::plain().with_disabled(""),
        ControlSignals::plain().with_disabled("disabled"),
        ControlSignals::plain().with_aria_disabled("true"),
        ControlSignals {
            classes: vec!["btn".into(), "btn-disabled".into()],
            ..ControlSignals::plain()
        },
        ControlSignals {
            native_enabled: false,
            ..ControlSignals::plain()
        },
    ]
}

/// Controls whose signals disagree
#[must_use]
pub fn conflicting_controls() -> Vec<ControlSignals> {
    vec![
        // application re-enabled a natively disabled control
        ControlSignals {
            native_enabled: false,
            ..ControlSignals::plain().with_disabled("false")
        },
        ControlSignals::plain()
            .with_disabled("true")
            .with_aria_disabled("false"),
        ControlSignals {
            classes: vec!["disabled".into()],
            ..ControlSignals::plain().with_aria_disabled("false")
        },
    ]
}
