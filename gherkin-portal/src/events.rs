// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle events produced by a Gherkin test engine.
//!
//! Events on a single thread arrive in a strict order. Events on different threads are only
//! ordered by scenario boundaries: one thread runs at most one scenario at a time.

use crate::gherkin::{FeatureDocument, SourceUri, StepArgument};
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// An engine event.
///
/// Events are produced by the engine and consumed by a
/// [`PortalReporter`](crate::reporter::PortalReporter).
#[derive(Clone, Debug)]
pub struct EngineEvent {
    /// The time at which the event was generated, including the offset from UTC.
    pub timestamp: DateTime<FixedOffset>,

    /// The kind of engine event this is.
    pub kind: EngineEventKind,
}

impl EngineEvent {
    /// Creates a new event with the given timestamp.
    pub fn new(timestamp: DateTime<FixedOffset>, kind: EngineEventKind) -> Self {
        Self { timestamp, kind }
    }
}

/// The kind of engine event this is.
///
/// Forms part of [`EngineEvent`].
#[derive(Clone, Debug)]
pub enum EngineEventKind {
    /// The test run started.
    RunStarted,

    /// A source unit was parsed.
    SourceParsed {
        /// The URI of the source unit.
        uri: SourceUri,

        /// The parsed document.
        document: Arc<FeatureDocument>,
    },

    /// A scenario, or one row of a scenario outline, started.
    ScenarioStarted {
        /// The test case being started.
        test_case: TestCase,
    },

    /// A step started.
    StepStarted {
        /// The step.
        step: PickleStep,
    },

    /// A step finished.
    StepFinished {
        /// The step.
        step: PickleStep,

        /// The result of the step.
        result: StepResult,
    },

    /// A hook started.
    HookStarted {
        /// The hook.
        hook: HookStep,
    },

    /// A hook finished.
    HookFinished {
        /// The hook.
        hook: HookStep,

        /// The result of the hook.
        result: StepResult,
    },

    /// The scenario running on this thread finished.
    ScenarioFinished {
        /// The overall result reported by the engine.
        ///
        /// If absent, the scenario's status is derived from its steps and hooks.
        result: Option<StepResult>,
    },

    /// The scenario running on this thread emitted an attachment.
    AttachmentEmitted {
        /// The attachment data.
        data: Bytes,

        /// The MIME type, if the producer supplied one.
        mime_type: Option<String>,

        /// The attachment name, if the producer supplied one.
        name: Option<String>,
    },

    /// The scenario running on this thread wrote text to the report.
    TextLogged {
        /// The text.
        text: String,
    },

    /// The test run finished.
    RunFinished,
}

impl EngineEventKind {
    /// Returns a short name for this event kind, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunStarted => "run-started",
            Self::SourceParsed { .. } => "source-parsed",
            Self::ScenarioStarted { .. } => "scenario-started",
            Self::StepStarted { .. } => "step-started",
            Self::StepFinished { .. } => "step-finished",
            Self::HookStarted { .. } => "hook-started",
            Self::HookFinished { .. } => "hook-finished",
            Self::ScenarioFinished { .. } => "scenario-finished",
            Self::AttachmentEmitted { .. } => "attachment-emitted",
            Self::TextLogged { .. } => "text-logged",
            Self::RunFinished => "run-finished",
        }
    }
}

/// A compiled scenario as scheduled by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    /// The source unit the scenario belongs to.
    pub uri: SourceUri,

    /// The line of the scenario, or of the example row for outline iterations.
    pub line: u32,

    /// The scenario name, with outline placeholders resolved.
    pub name: String,

    /// All tags in effect, including those inherited from the feature and rule.
    pub tags: Vec<String>,
}

/// A step as executed by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PickleStep {
    /// The line of the step declaration in the source unit.
    pub line: u32,

    /// The step text, with outline placeholders resolved.
    pub text: String,

    /// The multiline argument, if any.
    pub argument: Option<StepArgument>,

    /// Arguments captured by the matching step definition.
    pub definition_arguments: Vec<DefinitionArgument>,

    /// The location of the matching step definition, as reported by the engine.
    pub code_location: Option<String>,
}

/// An argument captured by a step definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefinitionArgument {
    /// The parameter type name, e.g. `int`.
    pub parameter_type: String,

    /// The captured value.
    pub value: Option<String>,
}

/// The type of a hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookType {
    /// Runs before a scenario.
    BeforeScenario,
    /// Runs after a scenario.
    AfterScenario,
    /// Runs before each step.
    BeforeStep,
    /// Runs after each step.
    AfterStep,
}

impl HookType {
    /// Returns true for hooks that run before their subject.
    pub fn is_before(self) -> bool {
        matches!(self, Self::BeforeScenario | Self::BeforeStep)
    }
}

/// A hook as executed by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HookStep {
    /// The type of the hook.
    pub hook_type: HookType,

    /// The location of the hook definition.
    pub code_location: String,
}

/// The outcome of a step, hook or scenario, as reported by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepOutcome {
    /// The step passed.
    Passed,
    /// The step was skipped, usually because an earlier step failed.
    Skipped,
    /// The step definition is marked as pending.
    Pending,
    /// No step definition matched.
    Undefined,
    /// More than one step definition matched.
    Ambiguous,
    /// The step failed.
    Failed,
    /// The step was never used.
    Unused,
}

impl StepOutcome {
    /// Returns the lowercase name used in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Skipped => "skipped",
            Self::Pending => "pending",
            Self::Undefined => "undefined",
            Self::Ambiguous => "ambiguous",
            Self::Failed => "failed",
            Self::Unused => "unused",
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of executing a step, hook or scenario.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepResult {
    /// The outcome.
    pub outcome: StepOutcome,

    /// The error message, if the step produced one.
    pub error: Option<String>,
}

impl StepResult {
    /// Creates a result with no error message.
    pub fn new(outcome: StepOutcome) -> Self {
        Self {
            outcome,
            error: None,
        }
    }

    /// Creates a result with an error message.
    pub fn with_error(outcome: StepOutcome, error: impl Into<String>) -> Self {
        Self {
            outcome,
            error: Some(error.into()),
        }
    }
}
