//! Property-based tests for resolution, classification and probing.
//!
//! Uses proptest against the in-memory browser with a fake clock, so the
//! polling paths run without real sleeps. Locators and control signals come
//! from `holdfast::mock::strategies`.
//!
//! Run with `cargo test -p holdfast --features proptest`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use holdfast::locator::resolve;
use holdfast::mock::strategies::{
    any_control_signals, any_locator_chain, standard_disabled_controls, ControlSignals,
};
use holdfast::mock::{MockBrowser, MockElement};
use holdfast::{
    probe, BrowserControl, DisabledSignal, Enablement, FakeClock, Locator, LocatorChain, Poller,
    Scope, StateOracle, WaitConfig,
};
use proptest::prelude::*;
use std::time::Duration;

// ===== Strategy definitions =====

/// An element carrying a few of the attributes the locators look at
fn element() -> impl Strategy<Value = MockElement> {
    (
        proptest::option::of("[a-e]"),
        proptest::option::of("[a-e]"),
        proptest::option::of("[a-e]"),
        proptest::option::of("[a-e]"),
    )
        .prop_map(|(id, class, test_id, text)| {
            let mut element = MockElement::new("button");
            if let Some(id) = id {
                element = element.attr("id", id);
            }
            if let Some(class) = class {
                element = element.attr("class", class);
            }
            if let Some(test_id) = test_id {
                element = element.attr("data-testid", test_id);
            }
            if let Some(text) = text {
                element = element.text(text);
            }
            element
        })
}

/// "true" in any letter case
fn true_any_case() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<bool>(), 4).prop_map(|upper| {
        "true"
            .chars()
            .zip(upper)
            .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

fn oracle(clock: &FakeClock) -> StateOracle {
    StateOracle::new(Poller::new(
        WaitConfig::new(Duration::from_secs(2), Duration::from_millis(500)),
        clock.shared(),
    ))
}

// ===== Resolution properties =====

proptest! {
    /// The first locator in chain order with any match wins.
    #[test]
    fn prop_first_structural_match_wins(
        elements in prop::collection::vec(element(), 0..8),
        chain in any_locator_chain(),
    ) {
        let browser = MockBrowser::new();
        for element in elements {
            let _ = browser.add(element);
        }
        let locators = chain.as_slice().to_vec();

        let expected = locators.iter().position(|locator| {
            browser.find_one(locator, &Scope::Document).unwrap().is_some()
        });
        let resolution = resolve(&browser, &chain, &Scope::Document).unwrap();

        match expected {
            Some(index) => {
                prop_assert_eq!(resolution.matched(), Some(&locators[index]));
                prop_assert_eq!(resolution.attempted(), &locators[..=index]);
            }
            None => {
                prop_assert!(!resolution.is_found());
                prop_assert_eq!(resolution.attempted(), locators.as_slice());
            }
        }
    }

    /// Resolution never queries past the winning locator.
    #[test]
    fn prop_resolution_stops_at_first_match(chain in any_locator_chain()) {
        let browser = MockBrowser::new();
        let _ = browser.add(MockElement::new("button").attr("id", "hit"));
        let chain = chain.or(Locator::id("hit")).or(Locator::id("never-asked"));

        let resolution = resolve(&browser, &chain, &Scope::Document).unwrap();
        prop_assert!(resolution.is_found());
        prop_assert!(!browser.queries().contains(&Locator::id("never-asked")));
    }
}

#[test]
fn test_empty_chain_is_not_found_without_queries() {
    let browser = MockBrowser::new();
    let _ = browser.add(MockElement::new("button").attr("id", "a"));

    let resolution = resolve(&browser, &LocatorChain::new(), &Scope::Document).unwrap();

    assert!(!resolution.is_found());
    assert!(resolution.attempted().is_empty());
    assert!(browser.queries().is_empty());
}

// ===== Classification properties =====

proptest! {
    /// An explicit disabled="true", in any case, decides Disabled whatever
    /// the other signals say.
    #[test]
    fn prop_explicit_disabled_true_always_disabled(
        signals in any_control_signals(),
        disabled in true_any_case(),
    ) {
        let clock = FakeClock::new();
        let browser = MockBrowser::with_clock(clock.clone());
        let handle = browser.add(signals.with_disabled(disabled).to_element());

        let (enablement, signal) = oracle(&clock).enablement(&browser, &handle).unwrap();
        prop_assert_eq!(enablement, Enablement::Disabled);
        prop_assert_eq!(signal, DisabledSignal::DisabledAttribute);
    }

    /// Without a disabled attribute, aria-disabled="true" decides Disabled.
    #[test]
    fn prop_aria_disabled_true_disables(signals in any_control_signals()) {
        let clock = FakeClock::new();
        let browser = MockBrowser::with_clock(clock.clone());
        let signals = ControlSignals {
            disabled: None,
            ..signals.with_aria_disabled("TRUE")
        };
        let handle = browser.add(signals.to_element());

        let (enablement, signal) = oracle(&clock).enablement(&browser, &handle).unwrap();
        prop_assert_eq!(enablement, Enablement::Disabled);
        prop_assert_eq!(signal, DisabledSignal::AriaDisabled);
    }

    /// Classifying an unchanged element twice gives the same verdict.
    #[test]
    fn prop_classify_is_idempotent(signals in any_control_signals()) {
        let clock = FakeClock::new();
        let browser = MockBrowser::with_clock(clock.clone());
        let handle = browser.add(signals.to_element());
        let oracle = oracle(&clock);

        let first = oracle.classify(&browser, &handle).unwrap();
        let second = oracle.classify(&browser, &handle).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.is_interactable(), first.is_enabled() && first.is_visible());
    }
}

#[test]
fn test_every_standard_idiom_is_disabled() {
    for signals in standard_disabled_controls() {
        let clock = FakeClock::new();
        let browser = MockBrowser::with_clock(clock.clone());
        let handle = browser.add(signals.to_element());

        let verdict = oracle(&clock).classify(&browser, &handle).unwrap();
        assert!(verdict.is_disabled(), "{signals:?} classified {verdict}");
        assert!(!verdict.is_interactable());
    }
}

// ===== Probe properties =====

proptest! {
    /// A probe turns every fault into data and never panics.
    #[test]
    fn prop_probe_never_propagates(
        blocked in any::<bool>(),
        hidden in any::<bool>(),
        stale in any::<bool>(),
        disconnected in any::<bool>(),
    ) {
        let browser = MockBrowser::new();
        let mut element = MockElement::new("button");
        if blocked {
            element = element.blocking_clicks("other element would receive the click");
        }
        if hidden {
            element = element.hidden();
        }
        let handle = browser.add(element);
        if stale {
            browser.transition();
        }
        if disconnected {
            browser.disconnect();
        }

        let outcome = probe(&browser, &handle);
        let faulty = blocked || hidden || stale || disconnected;
        prop_assert_eq!(outcome.is_blocked(), faulty);
    }
}
