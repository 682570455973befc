//! Disabled Controls Demo
//!
//! Walks a release page in which the edit and delete controls are disabled
//! in four different ways, and shows what Holdfast reports for each.
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=holdfast=debug cargo run --example disabled_controls -p holdfast
//! ```

#![allow(clippy::unwrap_used)]

use holdfast::mock::{ClickEffect, MockBrowser, MockElement};
use holdfast::scenario::ScenarioRunner;
use holdfast::{Engine, FakeClock, HoldfastConfig, Locator, LocatorChain, Scope};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("holdfast=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    println!("=== Holdfast Disabled Controls Demo ===\n");

    demo_fallback_chain();
    demo_verdicts();
    demo_scenario();

    println!("\n=== Demo Complete ===");
}

fn release_page(clock: &FakeClock) -> MockBrowser {
    let browser = MockBrowser::with_clock(clock.clone());
    browser.set_url("https://perigon.test/releases/42");
    browser.add(MockElement::new("span").attr("id", "releaseStatus").text("Published"));
    browser.add(
        MockElement::new("button")
            .attr("data-action", "edit")
            .attr("disabled", "true")
            .natively_disabled()
            .matching(Locator::css("[data-action=edit]"))
            .on_click(ClickEffect::Navigate("https://perigon.test/releases/42/edit".into())),
    );
    browser.add(
        MockElement::new("a")
            .attr("id", "deleteLink")
            .attr("aria-disabled", "true")
            .on_click(ClickEffect::OpenDialog),
    );
    browser.add(
        MockElement::new("button")
            .attr("class", "btn btn-disabled")
            .text("Archive"),
    );
    browser.add(MockElement::new("button").natively_disabled().text("Duplicate"));
    browser
}

fn demo_fallback_chain() {
    println!("--- Demo 1: Fallback chain ---\n");

    let clock = FakeClock::new();
    let engine = Engine::new(release_page(&clock), &HoldfastConfig::default(), clock.shared());
    let chain =
        LocatorChain::parse(&["id:editBtn", "test-id:edit", "css:[data-action=edit]"]).unwrap();
    let resolution = engine.resolve(&chain, &Scope::Document).unwrap();

    println!("Chain:   {chain}");
    println!("Matched: {}", resolution.matched().unwrap());
    println!("Tried:   {} locators\n", resolution.attempted().len());
}

fn demo_verdicts() {
    println!("--- Demo 2: One oracle, four idioms ---\n");

    let clock = FakeClock::new();
    let engine = Engine::new(release_page(&clock), &HoldfastConfig::default(), clock.shared());
    let controls = [
        ("edit", Locator::css("[data-action=edit]")),
        ("delete", Locator::id("deleteLink")),
        ("archive", Locator::text("Archive")),
        ("duplicate", Locator::text("Duplicate")),
    ];

    for (name, locator) in controls {
        let handle = engine
            .resolve(&LocatorChain::from(locator), &Scope::Document)
            .unwrap()
            .into_handle()
            .unwrap();
        let verdict = engine.classify(&handle).unwrap();
        println!("{name:>10}: {verdict}");
    }
    println!();
}

fn demo_scenario() {
    println!("--- Demo 3: Scenario harness ---\n");

    let clock = FakeClock::new();
    let factory = holdfast::mock::MockSessionFactory::new(clock.clone(), |browser| {
        browser.add(
            MockElement::new("a")
                .attr("id", "deleteLink")
                .attr("aria-disabled", "true")
                .on_click(ClickEffect::OpenDialog),
        );
    });
    let config = HoldfastConfig {
        artifact_dir: std::env::temp_dir().join("holdfast-demo"),
        ..HoldfastConfig::default()
    };
    let runner = ScenarioRunner::new(factory, config).with_clock(clock.shared());

    let report = runner.run("delete_link_is_inert", |ctx| {
        let link =
            ctx.resolve_required(&LocatorChain::from(Locator::id("deleteLink")), &Scope::Document)?;
        let verdict = ctx.classify(&link)?;
        let probe = ctx.probe_and_observe(&link, None)?;
        ctx.note(format!("verdict {verdict}"));
        if probe.after.open_dialogs > probe.before.open_dialogs {
            ctx.note("aria-disabled link still opened a dialog");
        }
        Ok(())
    });

    println!("{}", serde_json::to_string_pretty(&report).unwrap());
}
