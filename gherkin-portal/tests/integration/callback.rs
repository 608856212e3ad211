// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{OptionExt, Result};
use fixture_data::features::{LOGIN_URI, feature};
use gherkin_portal::{
    config::PortalConfig,
    events::{EngineEventKind, StepOutcome, StepResult},
    item_index::ItemKey,
};
use portal_model::{ItemStatus, LogLevel};
use pretty_assertions::assert_eq;
use std::thread;

fn callback_harness() -> Harness {
    let mut config = PortalConfig::default_config();
    config.reporter.callback_reporting = true;
    Harness::new(config)
}

#[test]
fn disabled_by_default() -> Result<()> {
    let harness = Harness::with_defaults();
    harness.start_run()?;
    assert!(harness.reporter.callback_reporter().is_none());
    Ok(())
}

#[test]
fn unavailable_before_the_run_starts() {
    let harness = callback_harness();
    assert!(harness.reporter.callback_reporter().is_none());
}

#[test]
fn lookups_follow_item_lifetimes() -> Result<()> {
    let harness = callback_harness();
    harness.start_run()?;
    let callback = harness
        .reporter
        .callback_reporter()
        .ok_or_eyre("callback reporting is enabled")?;

    let login = feature(LOGIN_URI);
    let scenario = login.scenario(8);
    let step = &scenario.steps[1];
    harness.start_scenario(login, scenario)?;
    harness.emit(EngineEventKind::StepStarted {
        step: pickle_step(step.line, step.text),
    })?;

    let backend = &harness.backend;
    let step_item = backend.item_named(step.expected_name).expect("step reported");
    let scenario_item = backend
        .item_named(scenario.expected_name)
        .expect("scenario reported");
    let feature_item = backend
        .item_named(login.expected_name)
        .expect("feature reported");

    let step_key = ItemKey::step(LOGIN_URI, 8, step.text);
    let scenario_key = ItemKey::scenario(LOGIN_URI, 8);
    let feature_key = ItemKey::feature(LOGIN_URI);

    // Lookups work from threads other than the one running the scenario.
    thread::scope(|scope| {
        scope.spawn(|| {
            assert_eq!(callback.lookup(&step_key), Some(step_item.item));
            assert_eq!(callback.lookup(&scenario_key), Some(scenario_item.item));
            assert_eq!(callback.lookup(&feature_key), Some(feature_item.item));
            assert!(callback.send_log_to(&step_key, LogLevel::Error, "late failure", base_time()));
        });
    });
    assert_eq!(backend.logs_of(step_item.item)[0].message, "late failure");

    harness.emit(EngineEventKind::StepFinished {
        step: pickle_step(step.line, step.text),
        result: StepResult::new(StepOutcome::Passed),
    })?;
    // Just-finished steps can still be annotated until their scenario finishes.
    assert_eq!(callback.lookup(&step_key), Some(step_item.item));

    harness.emit(EngineEventKind::ScenarioFinished { result: None })?;
    assert_eq!(callback.lookup(&step_key), None);
    assert!(!callback.send_log_to(&step_key, LogLevel::Info, "dropped", base_time()));
    assert_eq!(callback.lookup(&scenario_key), Some(scenario_item.item));

    // Override the status of the finished scenario.
    let override_time = harness.tick();
    callback.finish_item(scenario_item.item, ItemStatus::Failed, override_time);
    let finishes = backend.finishes_of(scenario_item.item);
    assert_eq!(finishes.len(), 2);
    assert_eq!(finishes[1].status, Some(ItemStatus::Failed));
    assert_eq!(finishes[1].end_time, override_time);

    harness.finish_run()?;
    assert_eq!(callback.lookup(&scenario_key), None);
    assert_eq!(callback.lookup(&feature_key), None);
    Ok(())
}
