// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use color_eyre::eyre::{Result, WrapErr};
use fixture_data::{
    features::EXPECTED_FEATURES,
    models::{FeatureFixture, ScenarioFixture, StepFixture},
};
use gherkin_portal::{
    backend::{BackendCall, RecordingBackend, ReportingBackend},
    config::PortalConfig,
    errors::ReporterError,
    events::{EngineEvent, EngineEventKind, PickleStep, StepOutcome, StepResult, TestCase},
    gherkin::{
        FeatureChild, FeatureDocument, GherkinStep, RuleChild, RuleDefinition,
        ScenarioDefinition, SourceUri,
    },
    reporter::{PortalReporter, PortalReporterBuilder},
};
use portal_model::{FinishItem, ItemStatus, ItemUuid};
use std::sync::{
    Arc, Once,
    atomic::{AtomicI64, Ordering},
};
use tracing_subscriber::filter::LevelFilter;

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        color_eyre::install().expect("color-eyre installed once");
        // Other test binaries may have installed a subscriber already.
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(LevelFilter::DEBUG)
            .try_init();
    });
}

/// A fixed point in time, with an offset so that offsets are known to be preserved.
pub(crate) fn base_time() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(2 * 3600)
        .expect("valid offset")
        .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .unwrap()
}

/// A reporter wired to a recording backend, with a clock that advances by a second per event.
pub(crate) struct Harness {
    pub(crate) backend: Arc<RecordingBackend>,
    pub(crate) reporter: PortalReporter,
    ticks: AtomicI64,
}

impl Harness {
    pub(crate) fn new(config: PortalConfig) -> Self {
        Self::from_builder(&PortalReporterBuilder::new(config))
    }

    pub(crate) fn from_builder(builder: &PortalReporterBuilder) -> Self {
        test_init();
        let backend = Arc::new(RecordingBackend::new());
        let reporter = builder.build(backend.clone());
        Self {
            backend,
            reporter,
            ticks: AtomicI64::new(0),
        }
    }

    /// Builds a reporter on the backend returned by `wrap`, which must forward to the recording
    /// backend it is given.
    pub(crate) fn with_backend(
        wrap: impl FnOnce(Arc<RecordingBackend>) -> Arc<dyn ReportingBackend>,
    ) -> Self {
        test_init();
        let backend = Arc::new(RecordingBackend::new());
        let reporter = PortalReporterBuilder::default().build(wrap(backend.clone()));
        Self {
            backend,
            reporter,
            ticks: AtomicI64::new(0),
        }
    }

    pub(crate) fn with_defaults() -> Self {
        Self::new(PortalConfig::default_config())
    }

    /// Returns the next timestamp. Timestamps are strictly increasing across all threads.
    pub(crate) fn tick(&self) -> DateTime<FixedOffset> {
        base_time() + Duration::seconds(self.ticks.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn emit(&self, kind: EngineEventKind) -> Result<(), ReporterError> {
        self.emit_at(self.tick(), kind)
    }

    pub(crate) fn emit_at(
        &self,
        timestamp: DateTime<FixedOffset>,
        kind: EngineEventKind,
    ) -> Result<(), ReporterError> {
        self.reporter.handle_event(EngineEvent::new(timestamp, kind))
    }

    /// Starts the run and parses every fixture feature.
    pub(crate) fn start_run(&self) -> Result<()> {
        self.emit(EngineEventKind::RunStarted)?;
        for feature in EXPECTED_FEATURES.iter() {
            self.emit(EngineEventKind::SourceParsed {
                uri: SourceUri::new(feature.uri),
                document: Arc::new(parse_document(feature)?),
            })?;
        }
        Ok(())
    }

    pub(crate) fn parse_source(&self, uri: &str, document: FeatureDocument) -> Result<()> {
        self.emit(EngineEventKind::SourceParsed {
            uri: SourceUri::new(uri),
            document: Arc::new(document),
        })?;
        Ok(())
    }

    pub(crate) fn start_scenario(
        &self,
        feature: &FeatureFixture,
        scenario: &ScenarioFixture,
    ) -> Result<(), ReporterError> {
        self.emit(EngineEventKind::ScenarioStarted {
            test_case: test_case(feature.uri, scenario),
        })
    }

    pub(crate) fn run_step(
        &self,
        step: &StepFixture,
        outcome: StepOutcome,
    ) -> Result<(), ReporterError> {
        self.emit(EngineEventKind::StepStarted {
            step: pickle_step(step.line, step.text),
        })?;
        self.emit(EngineEventKind::StepFinished {
            step: pickle_step(step.line, step.text),
            result: StepResult::new(outcome),
        })
    }

    /// Runs a scenario to completion on the calling thread with every step passing.
    ///
    /// Returns the timestamp the scenario finished at.
    pub(crate) fn run_scenario(
        &self,
        feature: &FeatureFixture,
        scenario: &ScenarioFixture,
    ) -> Result<DateTime<FixedOffset>> {
        self.start_scenario(feature, scenario)?;
        for step in &scenario.steps {
            self.run_step(step, StepOutcome::Passed)?;
        }
        let finished = self.tick();
        self.emit_at(finished, EngineEventKind::ScenarioFinished { result: None })?;
        Ok(finished)
    }

    pub(crate) fn finish_run(&self) -> Result<DateTime<FixedOffset>> {
        let finished = self.tick();
        self.emit_at(finished, EngineEventKind::RunFinished)?;
        Ok(finished)
    }
}

pub(crate) fn parse_document(feature: &FeatureFixture) -> Result<FeatureDocument> {
    serde_json::from_str(feature.document)
        .wrap_err_with(|| format!("fixture document for {} is invalid", feature.uri))
}

pub(crate) fn test_case(uri: &str, scenario: &ScenarioFixture) -> TestCase {
    TestCase {
        uri: SourceUri::new(uri),
        line: scenario.line,
        name: scenario.name.to_owned(),
        tags: scenario.tags.iter().map(|tag| (*tag).to_owned()).collect(),
    }
}

pub(crate) fn pickle_step(line: u32, text: &str) -> PickleStep {
    PickleStep {
        line,
        text: text.to_owned(),
        argument: None,
        definition_arguments: Vec::new(),
        code_location: None,
    }
}

/// A generated feature with `rules` rules of `scenarios_per_rule` single-step scenarios each.
///
/// With `rules` set to 0, the scenarios are declared directly under the feature instead. Each
/// scenario is declared at line `10 * n + 10` and its step at the line after.
pub(crate) fn generated_feature(
    rules: usize,
    scenarios_per_rule: usize,
) -> (FeatureDocument, Vec<u32>) {
    let mut next_line = 10;
    let mut lines = Vec::new();
    let mut scenario = |name: String| {
        let line = next_line;
        next_line += 10;
        lines.push(line);
        ScenarioDefinition {
            keyword: "Scenario".to_owned(),
            name,
            description: None,
            line,
            tags: Vec::new(),
            steps: vec![GherkinStep {
                keyword: "Given ".to_owned(),
                text: format!("step {line}"),
                line: line + 1,
            }],
            examples: Vec::new(),
        }
    };

    let children = if rules == 0 {
        (0..scenarios_per_rule)
            .map(|n| FeatureChild::Scenario(scenario(format!("scenario {n}"))))
            .collect()
    } else {
        (0..rules)
            .map(|r| {
                let children = (0..scenarios_per_rule)
                    .map(|n| RuleChild::Scenario(scenario(format!("rule {r} scenario {n}"))))
                    .collect();
                FeatureChild::Rule(RuleDefinition {
                    keyword: "Rule".to_owned(),
                    name: format!("rule {r}"),
                    description: None,
                    // Rules are declared before any scenario line.
                    line: 2 + r as u32,
                    tags: Vec::new(),
                    children,
                })
            })
            .collect()
    };

    let document = FeatureDocument {
        keyword: "Feature".to_owned(),
        name: "Generated".to_owned(),
        description: None,
        line: 1,
        tags: Vec::new(),
        children,
    };
    (document, lines)
}

/// The test case for the generated scenario at `line`.
pub(crate) fn generated_test_case(uri: &str, line: u32) -> TestCase {
    TestCase {
        uri: SourceUri::new(uri),
        line,
        name: format!("scenario at {line}"),
        tags: Vec::new(),
    }
}

/// Asserts that `item` was finished exactly once with `status`, and returns the finish request.
pub(crate) fn assert_single_finish(
    backend: &RecordingBackend,
    item: ItemUuid,
    status: Option<ItemStatus>,
) -> FinishItem {
    let mut finishes = backend.finishes_of(item);
    assert_eq!(finishes.len(), 1, "item {item} finished once");
    let finish = finishes.pop().expect("one finish");
    assert_eq!(finish.status, status, "status of item {item}");
    finish
}

pub(crate) fn call_index(
    backend: &RecordingBackend,
    predicate: impl Fn(&BackendCall) -> bool,
) -> usize {
    backend
        .calls()
        .iter()
        .position(predicate)
        .expect("matching backend call")
}
