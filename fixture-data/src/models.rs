// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data models for fixture information.

use iddqd::{IdOrdItem, id_upcast};

/// A feature file and the scenarios the engine runs from it.
#[derive(Clone, Debug)]
pub struct FeatureFixture {
    /// The source URI.
    pub uri: &'static str,

    /// The parsed document, as JSON.
    pub document: &'static str,

    /// The expected feature item name.
    pub expected_name: &'static str,

    /// Scenarios in declaration order, one per outline row.
    pub scenarios: Vec<ScenarioFixture>,
}

impl FeatureFixture {
    /// Returns the scenario executed at `line`.
    pub fn scenario(&self, line: u32) -> &ScenarioFixture {
        self.scenarios
            .iter()
            .find(|scenario| scenario.line == line)
            .unwrap_or_else(|| panic!("{}: no scenario at line {line}", self.uri))
    }
}

impl IdOrdItem for FeatureFixture {
    type Key<'a> = &'a str;

    fn key(&self) -> Self::Key<'_> {
        self.uri
    }

    id_upcast!();
}

/// A scenario, or a single outline row, as the engine schedules it.
#[derive(Clone, Debug)]
pub struct ScenarioFixture {
    /// The scenario line, or the example row line.
    pub line: u32,

    /// The name the engine reports, with outline parameters substituted.
    pub name: &'static str,

    /// The expected scenario item name.
    pub expected_name: &'static str,

    /// The expected name of the enclosing rule item, if any.
    pub rule: Option<&'static str>,

    /// Tags on the test case, including inherited ones.
    pub tags: Vec<&'static str>,

    /// Steps in execution order, background steps first.
    pub steps: Vec<StepFixture>,
}

/// A step as the engine executes it.
#[derive(Clone, Debug)]
pub struct StepFixture {
    /// The line of the step in the source.
    pub line: u32,

    /// The step text, with outline parameters substituted.
    pub text: &'static str,

    /// The expected step item name.
    pub expected_name: &'static str,
}

impl StepFixture {
    /// Creates a new step fixture.
    pub const fn new(line: u32, text: &'static str, expected_name: &'static str) -> Self {
        Self {
            line,
            text,
            expected_name,
        }
    }
}
