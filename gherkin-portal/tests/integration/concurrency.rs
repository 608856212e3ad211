// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scenarios of the same feature running on many engine threads at once.

use crate::fixtures::*;
use color_eyre::eyre::{Result, bail, ensure};
use gherkin_portal::{
    backend::{BackendCall, RecordingBackend, ReportingBackend},
    errors::ReporterError,
    events::{EngineEventKind, StepOutcome, StepResult},
};
use portal_model::{
    Attachment, FinishItem, FinishLaunch, ItemStatus, ItemType, ItemUuid, LaunchUuid, LogEntry,
    StartItem, StartLaunch,
};
use pretty_assertions::assert_eq;
use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Barrier},
    thread,
    time::Duration,
};

const GENERATED_URI: &str = "features/generated.feature";

/// Runs the generated scenario at `line` on the calling thread, waiting on `barrier` after each
/// phase so that every thread is inside its scenario at the same time.
fn run_generated(harness: &Harness, line: u32, barrier: &Barrier) -> Result<(), ReporterError> {
    barrier.wait();
    harness.emit(EngineEventKind::ScenarioStarted {
        test_case: generated_test_case(GENERATED_URI, line),
    })?;
    let step = pickle_step(line + 1, &format!("step {line}"));
    harness.emit(EngineEventKind::StepStarted { step: step.clone() })?;
    barrier.wait();
    harness.emit(EngineEventKind::AttachmentEmitted {
        data: format!("payload {line}").into_bytes().into(),
        mime_type: Some("text/plain".to_owned()),
        name: Some(format!("from {line}")),
    })?;
    harness.emit(EngineEventKind::StepFinished {
        step,
        result: StepResult::new(StepOutcome::Passed),
    })?;
    barrier.wait();
    harness.emit(EngineEventKind::ScenarioFinished { result: None })
}

fn run_all_concurrently(harness: &Harness, lines: &[u32]) -> Result<()> {
    let barrier = &Barrier::new(lines.len());
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = lines
            .iter()
            .map(|&line| scope.spawn(move || run_generated(harness, line, barrier)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("engine thread panicked"))
            .collect()
    });
    for result in results {
        result?;
    }
    Ok(())
}

#[test]
fn concurrent_scenarios_share_one_feature() -> Result<()> {
    let harness = Harness::with_defaults();
    harness.start_run()?;
    let (document, lines) = generated_feature(0, 16);
    harness.parse_source(GENERATED_URI, document)?;

    run_all_concurrently(&harness, &lines)?;
    harness.finish_run()?;
    let backend = &harness.backend;

    let stories = backend.started_of_type(ItemType::Story);
    assert_eq!(stories.len(), 1, "feature created once by 16 racing threads");
    let feature_item = &stories[0];
    assert_eq!(feature_item.request.name, "Feature: Generated");

    let scenarios = backend.children_of(feature_item.item);
    assert_eq!(scenarios.len(), lines.len());
    for scenario in &scenarios {
        assert_single_finish(backend, scenario.item, Some(ItemStatus::Passed));
    }
    assert_single_finish(backend, feature_item.item, None);

    let stats = harness.reporter.stats();
    assert_eq!(stats.features, 1);
    assert_eq!(stats.scenarios_started, 16);
    assert_eq!(stats.dropped_events, 0);
    assert!(stats.is_complete());
    Ok(())
}

#[test]
fn output_follows_the_emitting_thread() -> Result<()> {
    let harness = Harness::with_defaults();
    harness.start_run()?;
    let (document, lines) = generated_feature(0, 6);
    harness.parse_source(GENERATED_URI, document)?;

    run_all_concurrently(&harness, &lines)?;
    harness.finish_run()?;

    for line in lines {
        let step = harness
            .backend
            .item_named(&format!("Given step {line}"))
            .expect("step reported");
        let names: Vec<_> = harness
            .backend
            .attachments_of(step.item)
            .into_iter()
            .map(|attachment| attachment.name)
            .collect();
        assert_eq!(names, vec![format!("from {line}")]);
    }
    Ok(())
}

#[test]
fn rules_never_overlap_under_concurrency() -> Result<()> {
    let harness = Harness::with_defaults();
    harness.start_run()?;
    let (document, lines) = generated_feature(2, 4);
    harness.parse_source(GENERATED_URI, document)?;

    run_all_concurrently(&harness, &lines)?;
    harness.finish_run()?;
    let backend = &harness.backend;

    let feature_item = backend
        .item_named("Feature: Generated")
        .expect("feature reported");
    let rules: HashSet<ItemUuid> = backend
        .children_of(feature_item.item)
        .into_iter()
        .filter(|item| item.request.item_type == ItemType::Suite)
        .map(|item| item.item)
        .collect();
    assert!(!rules.is_empty());

    // Walk the calls in order: a rule may only start once the previous one has finished.
    let mut open: Option<ItemUuid> = None;
    for call in backend.calls() {
        match call {
            BackendCall::StartItem { item, .. } if rules.contains(&item) => {
                if let Some(open) = open {
                    bail!("rule {item} started while rule {open} is still open");
                }
                open = Some(item);
            }
            BackendCall::FinishItem { item, .. } if rules.contains(&item) => {
                assert_eq!(open, Some(item), "only the open rule is finished");
                open = None;
            }
            _ => {}
        }
    }
    assert_eq!(open, None, "the last rule is finished with its feature");

    // Every scenario is filed under an item for its own rule.
    let names: BTreeMap<ItemUuid, String> = backend
        .started_items()
        .into_iter()
        .map(|item| (item.item, item.request.name))
        .collect();
    for (index, line) in lines.iter().enumerate() {
        let scenario = backend
            .item_named(&format!("Scenario: scenario at {line}"))
            .expect("scenario reported");
        let parent = scenario.parent.expect("scenario has a parent");
        assert_eq!(names[&parent], format!("Rule: rule {}", index / 4));
    }
    Ok(())
}

/// Holds up the create call of one item, so that other threads run while it is in flight.
#[derive(Debug)]
struct SlowStartBackend {
    inner: Arc<RecordingBackend>,
    slow_item: &'static str,
    entered: Arc<Barrier>,
}

impl ReportingBackend for SlowStartBackend {
    fn start_launch(&self, request: StartLaunch) -> LaunchUuid {
        self.inner.start_launch(request)
    }

    fn finish_launch(&self, launch: LaunchUuid, request: FinishLaunch) {
        self.inner.finish_launch(launch, request);
    }

    fn start_item(
        &self,
        launch: LaunchUuid,
        parent: Option<ItemUuid>,
        request: StartItem,
    ) -> ItemUuid {
        if request.name == self.slow_item {
            self.entered.wait();
            thread::sleep(Duration::from_millis(300));
        }
        self.inner.start_item(launch, parent, request)
    }

    fn finish_item(&self, item: ItemUuid, request: FinishItem) {
        self.inner.finish_item(item, request);
    }

    fn log(&self, item: ItemUuid, entry: LogEntry) {
        self.inner.log(item, entry);
    }

    fn attach(&self, item: ItemUuid, attachment: Attachment) {
        self.inner.attach(item, attachment);
    }
}

fn run_single_step(harness: &Harness, line: u32) -> Result<(), ReporterError> {
    harness.emit(EngineEventKind::ScenarioStarted {
        test_case: generated_test_case(GENERATED_URI, line),
    })?;
    let step = pickle_step(line + 1, &format!("step {line}"));
    harness.emit(EngineEventKind::StepStarted { step: step.clone() })?;
    harness.emit(EngineEventKind::StepFinished {
        step,
        result: StepResult::new(StepOutcome::Passed),
    })?;
    harness.emit(EngineEventKind::ScenarioFinished { result: None })
}

#[test]
fn slow_scenario_create_keeps_its_rule_open() -> Result<()> {
    let entered = Arc::new(Barrier::new(2));
    let harness = Harness::with_backend(|recording| {
        Arc::new(SlowStartBackend {
            inner: recording,
            slow_item: "Scenario: scenario at 10",
            entered: Arc::clone(&entered),
        })
    });
    harness.start_run()?;
    let (document, lines) = generated_feature(2, 1);
    assert_eq!(lines, vec![10, 20]);
    harness.parse_source(GENERATED_URI, document)?;

    // The second scenario belongs to the next rule and starts while the first one's create call
    // is still in flight.
    thread::scope(|scope| -> Result<()> {
        let first = scope.spawn(|| run_single_step(&harness, 10));
        let second = scope.spawn(|| {
            entered.wait();
            run_single_step(&harness, 20)
        });
        first.join().expect("engine thread panicked")?;
        second.join().expect("engine thread panicked")?;
        Ok(())
    })?;
    harness.finish_run()?;
    let backend = &harness.backend;

    let mut finished = HashSet::new();
    for call in backend.calls() {
        match call {
            BackendCall::StartItem {
                parent: Some(parent),
                request,
                ..
            } => ensure!(
                !finished.contains(&parent),
                "`{}` started under an item that was already finished",
                request.name
            ),
            BackendCall::FinishItem { item, .. } => {
                finished.insert(item);
            }
            _ => {}
        }
    }

    for (line, rule) in [(10, "Rule: rule 0"), (20, "Rule: rule 1")] {
        let scenario = backend
            .item_named(&format!("Scenario: scenario at {line}"))
            .expect("scenario reported");
        let parent = backend
            .started_items()
            .into_iter()
            .find(|item| Some(item.item) == scenario.parent)
            .expect("scenario has a reported parent");
        assert_eq!(parent.request.name, rule);
    }
    Ok(())
}
