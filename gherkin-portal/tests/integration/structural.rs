// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::Result;
use fixture_data::features::{LOGIN_URI, feature};
use gherkin_portal::{
    backend::BackendCall,
    errors::{LeafKind, ReporterError, StructuralError},
    events::{EngineEventKind, TestCase},
    gherkin::SourceUri,
};
use portal_model::ItemStatus;
use pretty_assertions::assert_eq;
use std::thread;

#[test]
fn overlapping_steps_poison_the_reporter() -> Result<()> {
    let harness = Harness::with_defaults();
    harness.start_run()?;
    let login = feature(LOGIN_URI);
    harness.start_scenario(login, login.scenario(8))?;
    harness.emit(EngineEventKind::StepStarted {
        step: pickle_step(5, "a registered user"),
    })?;

    let error = harness
        .emit(EngineEventKind::StepStarted {
            step: pickle_step(9, "the user logs in"),
        })
        .unwrap_err();
    assert!(
        matches!(
            error,
            ReporterError::Structural(StructuralError::LeafOverlap {
                line: 8,
                open: LeafKind::Step,
                started: LeafKind::Step,
                ..
            })
        ),
        "unexpected error: {error:?}"
    );
    assert!(harness.reporter.is_poisoned());

    let calls_before = harness.backend.calls().len();
    assert!(matches!(
        harness.emit(EngineEventKind::RunFinished),
        Err(ReporterError::Poisoned)
    ));
    assert_eq!(harness.backend.calls().len(), calls_before, "nothing sent once poisoned");
    Ok(())
}

#[test]
fn scenario_from_unparsed_source() -> Result<()> {
    let harness = Harness::with_defaults();
    harness.start_run()?;
    let error = harness
        .emit(EngineEventKind::ScenarioStarted {
            test_case: TestCase {
                uri: SourceUri::new("features/missing.feature"),
                line: 3,
                name: "ghost".to_owned(),
                tags: Vec::new(),
            },
        })
        .unwrap_err();
    assert!(
        matches!(
            &error,
            ReporterError::Structural(StructuralError::UnknownSource { uri, line: 3 })
                if uri.as_str() == "features/missing.feature"
        ),
        "unexpected error: {error:?}"
    );
    Ok(())
}

#[test]
fn scenario_at_undeclared_line() -> Result<()> {
    let harness = Harness::with_defaults();
    harness.start_run()?;
    let error = harness
        .emit(EngineEventKind::ScenarioStarted {
            test_case: TestCase {
                uri: SourceUri::new(LOGIN_URI),
                line: 9,
                name: "a step line".to_owned(),
                tags: Vec::new(),
            },
        })
        .unwrap_err();
    assert!(
        matches!(
            error,
            ReporterError::Structural(StructuralError::ScenarioNotFound { line: 9, .. })
        ),
        "unexpected error: {error:?}"
    );
    Ok(())
}

#[test]
fn step_from_another_scenario() -> Result<()> {
    let harness = Harness::with_defaults();
    harness.start_run()?;
    let login = feature(LOGIN_URI);
    harness.start_scenario(login, login.scenario(8))?;
    let error = harness
        .emit(EngineEventKind::StepStarted {
            step: pickle_step(13, "the user logs in with a wrong password"),
        })
        .unwrap_err();
    assert!(
        matches!(
            error,
            ReporterError::Structural(StructuralError::StepNotFound {
                scenario_line: 8,
                step_line: 13,
                ..
            })
        ),
        "unexpected error: {error:?}"
    );
    Ok(())
}

#[test]
fn second_scenario_on_a_busy_thread() -> Result<()> {
    let harness = Harness::with_defaults();
    harness.start_run()?;
    let login = feature(LOGIN_URI);
    harness.start_scenario(login, login.scenario(8))?;
    let error = harness
        .start_scenario(login, login.scenario(12))
        .unwrap_err();
    assert!(
        matches!(
            error,
            ReporterError::Structural(StructuralError::ThreadAlreadyBound {
                bound_line: 8,
                new_line: 12,
                ..
            })
        ),
        "unexpected error: {error:?}"
    );
    Ok(())
}

#[test]
fn same_scenario_on_two_threads() -> Result<()> {
    let harness = Harness::with_defaults();
    harness.start_run()?;
    let login = feature(LOGIN_URI);
    harness.start_scenario(login, login.scenario(8))?;

    let result = thread::scope(|scope| {
        scope
            .spawn(|| harness.start_scenario(login, login.scenario(8)))
            .join()
            .expect("engine thread panicked")
    });
    assert!(
        matches!(
            result,
            Err(ReporterError::Structural(
                StructuralError::HandleReassigned { .. }
            ))
        ),
        "unexpected result: {result:?}"
    );
    Ok(())
}

#[test]
fn events_outside_a_scenario_are_dropped() -> Result<()> {
    let harness = Harness::with_defaults();
    harness.start_run()?;
    let login = feature(LOGIN_URI);
    harness.run_scenario(login, login.scenario(8))?;

    // The scenario on this thread has finished, so these belong to nothing.
    harness.emit(EngineEventKind::TextLogged {
        text: "late output".to_owned(),
    })?;
    harness.emit(EngineEventKind::ScenarioFinished { result: None })?;
    harness.finish_run()?;

    assert!(!harness.reporter.is_poisoned());
    assert_eq!(harness.reporter.stats().dropped_events, 2);
    let late_logs = harness
        .backend
        .calls()
        .into_iter()
        .filter(|call| matches!(call, BackendCall::Log { .. }))
        .count();
    assert_eq!(late_logs, 0);
    Ok(())
}

#[test]
fn unfinished_scenarios_are_interrupted_at_run_end() -> Result<()> {
    let harness = Harness::with_defaults();
    harness.start_run()?;
    let login = feature(LOGIN_URI);
    let scenario = login.scenario(8);
    harness.start_scenario(login, scenario)?;
    harness.emit(EngineEventKind::StepStarted {
        step: pickle_step(5, "a registered user"),
    })?;
    let run_done = harness.finish_run()?;
    let backend = &harness.backend;

    let step = backend
        .item_named(scenario.steps[0].expected_name)
        .expect("step reported");
    assert_single_finish(backend, step.item, Some(ItemStatus::Interrupted));
    let scenario_item = backend
        .item_named(scenario.expected_name)
        .expect("scenario reported");
    let finish = assert_single_finish(backend, scenario_item.item, Some(ItemStatus::Interrupted));
    assert_eq!(finish.end_time, run_done);
    let feature_item = backend
        .item_named(login.expected_name)
        .expect("feature reported");
    assert_single_finish(backend, feature_item.item, None);

    let stats = harness.reporter.stats();
    assert_eq!(stats.orphans_closed, 2);
    assert!(!stats.is_complete());
    Ok(())
}

#[test]
fn events_after_the_run_finished() -> Result<()> {
    let harness = Harness::with_defaults();
    harness.start_run()?;
    harness.finish_run()?;
    let error = harness
        .emit(EngineEventKind::TextLogged {
            text: "too late".to_owned(),
        })
        .unwrap_err();
    assert!(
        matches!(
            error,
            ReporterError::Structural(StructuralError::RunAlreadyFinished {
                event: "text-logged"
            })
        ),
        "unexpected error: {error:?}"
    );
    Ok(())
}

#[test]
fn source_reparsed_with_different_content() -> Result<()> {
    let harness = Harness::with_defaults();
    harness.start_run()?;
    let login = feature(LOGIN_URI);
    harness.run_scenario(login, login.scenario(8))?;

    // Parsing the same content again is harmless.
    harness.parse_source(LOGIN_URI, parse_document(login)?)?;
    harness.run_scenario(login, login.scenario(12))?;

    let mut changed = parse_document(login)?;
    changed.name = "Sign-in".to_owned();
    harness.parse_source(LOGIN_URI, changed)?;
    let error = harness
        .start_scenario(login, login.scenario(8))
        .unwrap_err();
    assert!(
        matches!(
            &error,
            ReporterError::Structural(StructuralError::SourceMismatch { uri, line: 8 })
                if uri.as_str() == LOGIN_URI
        ),
        "unexpected error: {error:?}"
    );
    assert!(harness.reporter.is_poisoned());
    Ok(())
}
