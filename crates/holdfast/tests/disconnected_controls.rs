//! End-to-end scenarios against the in-memory browser
//!
//! A shared production whose grid status is "Disconnected" must offer no
//! working edit, edit-members or activate control. Each scenario resolves
//! the control through a fallback chain, classifies it, clicks it anyway and
//! checks that nothing on the page moved.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use holdfast::mock::{ClickEffect, MockBrowser, MockElement, MockSessionFactory};
use holdfast::scenario::ScenarioOutcome;
use holdfast::{
    DisabledSignal, FakeClock, HoldfastConfig, Locator, LocatorChain, ScenarioRunner, Scope,
};
use tempfile::TempDir;

const DETAIL_URL: &str = "https://perigon.test/metering-point/shared-production/8280";

/// Detail page of a disconnected shared production
fn disconnected_page(browser: &MockBrowser) {
    browser.set_url(DETAIL_URL);
    let _ = browser.add(
        MockElement::new("span")
            .attr("id", "sharedProductionStatus")
            .text("Disconnected"),
    );
    let actions = browser.add(MockElement::new("div").attr("class", "action-buttons"));

    // Old markup: no id, only a data-action the CSS fallback knows about
    let _ = browser.add_child(
        &actions,
        MockElement::new("button")
            .attr("data-action", "edit")
            .attr("disabled", "disabled")
            .natively_disabled()
            .text("Edit Shared Production")
            .matching(Locator::css("button[data-action='edit']"))
            .on_click(ClickEffect::OpenDialog),
    );
    // Disabled through styling only; the app ignores the click
    let _ = browser.add_child(
        &actions,
        MockElement::new("button")
            .attr("id", "editMembersButton")
            .attr("class", "btn btn-secondary disabled")
            .text("Edit Members"),
    );
    let _ = browser.add_child(
        &actions,
        MockElement::new("button")
            .attr("id", "activateButton")
            .attr("aria-disabled", "true")
            .natively_disabled()
            .text("Activate")
            .on_click(ClickEffect::SetText {
                target_id: "sharedProductionStatus".to_string(),
                text: "Active".to_string(),
            }),
    );
}

/// Same page after a regression: activate is live again
fn regressed_page(browser: &MockBrowser) {
    browser.set_url(DETAIL_URL);
    let _ = browser.add(
        MockElement::new("span")
            .attr("id", "sharedProductionStatus")
            .text("Disconnected"),
    );
    let _ = browser.add(
        MockElement::new("button")
            .attr("id", "activateButton")
            .text("Activate")
            .on_click(ClickEffect::SetText {
                target_id: "sharedProductionStatus".to_string(),
                text: "Active".to_string(),
            }),
    );
}

fn runner(
    setup: fn(&MockBrowser),
    artifacts: &TempDir,
) -> (ScenarioRunner<MockSessionFactory>, FakeClock) {
    let clock = FakeClock::new();
    let factory = MockSessionFactory::new(clock.clone(), setup);
    let config = HoldfastConfig {
        artifact_dir: artifacts.path().to_path_buf(),
        ..HoldfastConfig::default()
    };
    (ScenarioRunner::new(factory, config).with_clock(clock.shared()), clock)
}

fn status_chain() -> LocatorChain {
    LocatorChain::new()
        .or(Locator::id("sharedProductionStatus"))
        .or(Locator::class_name("status-badge"))
}

fn edit_chain() -> LocatorChain {
    LocatorChain::new()
        .or(Locator::id("editSharedProductionButton"))
        .or(Locator::xpath("//button[contains(text(), 'Edit Shared Production')]"))
        .or(Locator::css("button[data-action='edit']"))
}

fn edit_members_chain() -> LocatorChain {
    LocatorChain::new()
        .or(Locator::id("editMembersButton"))
        .or(Locator::text("Edit Members"))
}

fn activate_chain() -> LocatorChain {
    LocatorChain::new()
        .or(Locator::id("activateButton"))
        .or(Locator::css("button[data-action='activate']"))
        .or(Locator::text("Activate"))
}

/// Resolve, classify and probe one control, asserting it is inert
fn assert_inert(
    runner: &ScenarioRunner<MockSessionFactory>,
    name: &str,
    chain: LocatorChain,
    expected: DisabledSignal,
) -> holdfast::ScenarioReport {
    runner.run(name, move |ctx| {
        assert!(ctx.engine().await_ready()?.is_satisfied());
        let status = ctx
            .engine()
            .status_required(&status_chain(), &Scope::Document)?;
        assert_eq!(status, "Disconnected");

        let control = ctx.resolve_required(&chain, &Scope::Document)?;
        let verdict = ctx.classify(&control)?;
        assert!(verdict.is_disabled(), "expected disabled, got {verdict}");
        assert!(!verdict.is_interactable());
        assert_eq!(verdict.decided_by, expected);

        let report = ctx.probe_and_observe(&control, Some(&status_chain()))?;
        assert!(report.is_unchanged(), "page changed: {report:?}");
        assert_eq!(report.after.status.as_deref(), Some("Disconnected"));
        Ok(())
    })
}

#[test]
fn test_edit_button_disabled_when_disconnected() {
    let artifacts = TempDir::new().unwrap();
    let (runner, _clock) = runner(disconnected_page, &artifacts);

    let report = assert_inert(
        &runner,
        "edit_button_disabled",
        edit_chain(),
        DisabledSignal::DisabledAttribute,
    );

    assert!(report.is_passed(), "{:?}", report.outcome);
    let resolution = &report.diagnostics.resolutions[0];
    assert_eq!(resolution.matched.as_deref(), Some("css:button[data-action='edit']"));
    assert_eq!(resolution.attempted.len(), 3);
    assert!(report.artifact.is_none());
}

#[test]
fn test_edit_members_button_disabled_when_disconnected() {
    let artifacts = TempDir::new().unwrap();
    let (runner, _clock) = runner(disconnected_page, &artifacts);

    let report = assert_inert(
        &runner,
        "edit_members_button_disabled",
        edit_members_chain(),
        DisabledSignal::DisablingClass("disabled".to_string()),
    );

    assert!(report.is_passed(), "{:?}", report.outcome);
    assert_eq!(report.diagnostics.verdicts.len(), 1);
}

#[test]
fn test_activate_button_disabled_when_disconnected() {
    let artifacts = TempDir::new().unwrap();
    let (runner, _clock) = runner(disconnected_page, &artifacts);

    let report = assert_inert(
        &runner,
        "activate_button_disabled",
        activate_chain(),
        DisabledSignal::AriaDisabled,
    );

    assert!(report.is_passed(), "{:?}", report.outcome);
    let session = runner.factory().last_session().unwrap();
    assert_eq!(session.clicks().len(), 1);
}

#[test]
fn test_each_scenario_gets_its_own_session() {
    let artifacts = TempDir::new().unwrap();
    let (runner, _clock) = runner(disconnected_page, &artifacts);

    for (name, chain) in [
        ("edit", edit_chain()),
        ("members", edit_members_chain()),
        ("activate", activate_chain()),
    ] {
        let report = runner.run(name, |ctx| {
            let _ = ctx.resolve_required(&chain, &Scope::Document)?;
            Ok(())
        });
        assert!(report.is_passed());
    }

    assert_eq!(runner.factory().opened(), 3);
    assert_eq!(runner.factory().closed(), 3);
    assert!(!runner.factory().last_session().unwrap().is_connected());
}

#[test]
fn test_regression_fails_with_screenshot() {
    let artifacts = TempDir::new().unwrap();
    let (runner, _clock) = runner(regressed_page, &artifacts);

    let report = assert_inert(
        &runner,
        "activate_button_disabled",
        activate_chain(),
        DisabledSignal::AriaDisabled,
    );

    let ScenarioOutcome::Failed { reason } = &report.outcome else {
        panic!("regression went unnoticed");
    };
    assert!(reason.contains("expected disabled"), "{reason}");

    let artifact = report.artifact.as_ref().expect("screenshot captured");
    assert!(artifact.starts_with(artifacts.path()));
    assert!(artifact
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("activate_button_disabled_"));
    assert_eq!(runner.factory().closed(), 1);
    assert!(report.into_result().is_err());
}

#[test]
fn test_missing_control_reports_every_locator_tried() {
    let artifacts = TempDir::new().unwrap();
    let (runner, clock) = runner(disconnected_page, &artifacts);

    let chain = LocatorChain::new()
        .or(Locator::id("deactivateButton"))
        .or(Locator::text("Deactivate"));
    let report = runner.run("deactivate_missing", |ctx| {
        let _ = ctx.resolve_required(&chain, &Scope::Document)?;
        Ok(())
    });

    let ScenarioOutcome::Failed { reason } = &report.outcome else {
        panic!("missing control passed");
    };
    assert!(reason.contains("id:deactivateButton"), "{reason}");
    assert!(reason.contains("text:Deactivate"), "{reason}");
    // resolve_required waits the full default timeout before giving up
    assert!(clock.now_ms() >= 10_000);
}
