// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The parsed structure of Gherkin source units, as handed over by the test engine.
//!
//! Parsing Gherkin is the engine's job. These types only describe the shape the reporter needs in
//! order to reconstruct the feature → rule → scenario hierarchy, and they deserialize from the
//! engine's JSON representation.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{borrow::Borrow, fmt};

/// Identifies a single source unit, typically a `.feature` file.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceUri(SmolStr);

impl SourceUri {
    /// Creates a new source URI.
    pub fn new(uri: impl AsRef<str>) -> Self {
        Self(SmolStr::new(uri))
    }

    /// Returns the URI as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the path portion of the URI, with any `file:` or `classpath:` scheme removed.
    pub fn path(&self) -> &str {
        let s = self.as_str();
        s.strip_prefix("file://")
            .or_else(|| s.strip_prefix("file:"))
            .or_else(|| s.strip_prefix("classpath:"))
            .unwrap_or(s)
    }
}

impl fmt::Display for SourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceUri {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl Borrow<str> for SourceUri {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A parsed feature file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FeatureDocument {
    /// The keyword, e.g. `Feature`.
    pub keyword: String,

    /// The feature name.
    pub name: String,

    /// The free-form description under the feature line.
    #[serde(default)]
    pub description: Option<String>,

    /// The line the feature is declared on.
    pub line: u32,

    /// Tags declared on the feature, including the leading `@`.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Backgrounds, scenarios and rules, in declaration order.
    #[serde(default)]
    pub children: Vec<FeatureChild>,
}

impl FeatureDocument {
    /// Returns the background declared directly under the feature, if any.
    pub fn background(&self) -> Option<&Background> {
        self.children.iter().find_map(|child| match child {
            FeatureChild::Background(background) => Some(background),
            _ => None,
        })
    }
}

/// A child of a [`FeatureDocument`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureChild {
    /// A background block.
    Background(Background),
    /// A scenario or scenario outline.
    Scenario(ScenarioDefinition),
    /// A rule block.
    Rule(RuleDefinition),
}

/// A `Rule:` block inside a feature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuleDefinition {
    /// The keyword, e.g. `Rule`.
    pub keyword: String,

    /// The rule name.
    pub name: String,

    /// The free-form description under the rule line.
    #[serde(default)]
    pub description: Option<String>,

    /// The line the rule is declared on.
    pub line: u32,

    /// Tags declared on the rule.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Backgrounds and scenarios inside the rule.
    #[serde(default)]
    pub children: Vec<RuleChild>,
}

impl RuleDefinition {
    /// Returns the background declared inside this rule, if any.
    pub fn background(&self) -> Option<&Background> {
        self.children.iter().find_map(|child| match child {
            RuleChild::Background(background) => Some(background),
            RuleChild::Scenario(_) => None,
        })
    }
}

/// A child of a [`RuleDefinition`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleChild {
    /// A background block.
    Background(Background),
    /// A scenario or scenario outline.
    Scenario(ScenarioDefinition),
}

/// A `Background:` block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Background {
    /// The keyword, e.g. `Background`.
    pub keyword: String,

    /// The optional background name.
    #[serde(default)]
    pub name: String,

    /// The line the background is declared on.
    pub line: u32,

    /// The steps run before every scenario in scope.
    #[serde(default)]
    pub steps: Vec<GherkinStep>,
}

/// A scenario or scenario outline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScenarioDefinition {
    /// The keyword, e.g. `Scenario` or `Scenario Outline`.
    pub keyword: String,

    /// The scenario name.
    pub name: String,

    /// The free-form description under the scenario line.
    #[serde(default)]
    pub description: Option<String>,

    /// The line the scenario is declared on.
    pub line: u32,

    /// Tags declared on the scenario.
    #[serde(default)]
    pub tags: Vec<String>,

    /// The steps of the scenario.
    #[serde(default)]
    pub steps: Vec<GherkinStep>,

    /// Example tables. Non-empty for scenario outlines.
    #[serde(default)]
    pub examples: Vec<Examples>,
}

impl ScenarioDefinition {
    /// Returns true if this is a scenario outline, i.e. it has example tables.
    pub fn is_outline(&self) -> bool {
        !self.examples.is_empty()
    }

    /// Returns the lines of every example row generated by this outline, in declaration order.
    pub fn example_row_lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.examples
            .iter()
            .flat_map(|examples| examples.rows.iter().map(|row| row.line))
    }
}

/// An `Examples:` table of a scenario outline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Examples {
    /// The keyword, e.g. `Examples`.
    pub keyword: String,

    /// The optional table name.
    #[serde(default)]
    pub name: String,

    /// The line the table is declared on.
    pub line: u32,

    /// Tags declared on the table.
    #[serde(default)]
    pub tags: Vec<String>,

    /// The header row.
    #[serde(default)]
    pub header: Option<TableRow>,

    /// The body rows. Each row becomes one scenario execution.
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

/// A single row of a data or example table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TableRow {
    /// The line the row is on.
    pub line: u32,

    /// The cell values.
    pub cells: Vec<String>,
}

/// A step as declared in the source unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GherkinStep {
    /// The keyword including its trailing space, e.g. `Given `.
    pub keyword: String,

    /// The step text, with outline placeholders unresolved.
    pub text: String,

    /// The line the step is declared on.
    pub line: u32,
}

/// A multiline argument attached to a step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepArgument {
    /// A data table.
    DataTable {
        /// The table rows, including the header.
        rows: Vec<Vec<String>>,
    },
    /// A docstring.
    DocString {
        /// The docstring content.
        content: String,

        /// The media type, if declared.
        #[serde(default)]
        media_type: Option<String>,
    },
}
