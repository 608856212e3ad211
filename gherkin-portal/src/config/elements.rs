// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, FixedOffset};
use portal_model::{AttributeParseError, ItemAttribute, LaunchMode, StartLaunch};
use serde::Deserialize;
use std::fmt;

/// The key of the system attribute identifying this crate as the reporting agent.
pub const AGENT_ATTRIBUTE: &str = "agent";

/// The key of the system attribute carrying the `skipped-issue` setting.
pub const SKIPPED_ISSUE_ATTRIBUTE: &str = "skippedIssue";

/// How the feature tree is mapped onto backend items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportingMode {
    /// Scenarios are tests, and steps and hooks are reported with statistics.
    #[default]
    Step,

    /// Features hang off a root suite, scenarios are the test cases, and steps and hooks are
    /// nested items without statistics.
    Scenario,
}

impl ReportingMode {
    /// Returns the name used in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Scenario => "scenario",
        }
    }
}

impl fmt::Display for ReportingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `[reporter]` section.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReporterSettings {
    /// How the feature tree is mapped onto backend items.
    pub mode: ReportingMode,

    /// Whether to record item handles for out-of-band reporting.
    #[serde(alias = "callback_reporting")]
    pub callback_reporting: bool,
}

/// The `[launch]` section, with attributes parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchConfig {
    /// The launch name.
    pub name: String,

    /// The launch description.
    pub description: Option<String>,

    /// Attributes attached to the launch.
    pub attributes: Vec<ItemAttribute>,

    /// The launch mode.
    pub mode: LaunchMode,

    /// Whether this launch is a rerun.
    pub rerun: bool,

    /// The launch being rerun.
    pub rerun_of: Option<String>,

    /// If set, reported as a `skippedIssue` system attribute.
    pub skipped_issue: Option<bool>,
}

impl LaunchConfig {
    /// Creates a launch config with the given name and no other settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            attributes: Vec::new(),
            mode: LaunchMode::Default,
            rerun: false,
            rerun_of: None,
            skipped_issue: None,
        }
    }

    /// Builds the request that starts the launch.
    ///
    /// Configured attributes come first, followed by system attributes.
    pub fn start_request(&self, start_time: DateTime<FixedOffset>) -> StartLaunch {
        let mut request = StartLaunch::new(&self.name, start_time);
        if let Some(description) = &self.description {
            request.set_description(description);
        }
        request
            .add_attributes(self.attributes.iter().cloned())
            .add_attributes(self.system_attributes())
            .set_mode(self.mode)
            .set_rerun(self.rerun, self.rerun.then(|| self.rerun_of.clone()).flatten());
        request
    }

    fn system_attributes(&self) -> Vec<ItemAttribute> {
        let mut attributes = vec![ItemAttribute::system(
            AGENT_ATTRIBUTE,
            concat!(env!("CARGO_PKG_NAME"), "|", env!("CARGO_PKG_VERSION")),
        )];
        if let Some(skipped_issue) = self.skipped_issue {
            attributes.push(ItemAttribute::system(
                SKIPPED_ISSUE_ATTRIBUTE,
                skipped_issue.to_string(),
            ));
        }
        attributes
    }
}

/// The `[launch]` section as written.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct DeserializedLaunchConfig {
    name: String,
    description: String,
    attributes: Vec<String>,
    mode: LaunchModeSetting,
    rerun: bool,
    #[serde(default, alias = "rerun_of")]
    rerun_of: Option<String>,
    #[serde(default, alias = "skipped_issue")]
    skipped_issue: Option<bool>,
}

impl DeserializedLaunchConfig {
    pub(super) fn compile(self) -> Result<LaunchConfig, AttributeParseError> {
        let attributes = self
            .attributes
            .iter()
            .map(|attribute| attribute.parse())
            .collect::<Result<Vec<ItemAttribute>, _>>()?;
        Ok(LaunchConfig {
            name: self.name,
            description: non_empty(self.description),
            attributes,
            mode: self.mode.into(),
            rerun: self.rerun,
            rerun_of: self.rerun_of.and_then(non_empty),
            skipped_issue: self.skipped_issue,
        })
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum LaunchModeSetting {
    Default,
    Debug,
}

impl From<LaunchModeSetting> for LaunchMode {
    fn from(setting: LaunchModeSetting) -> Self {
        match setting {
            LaunchModeSetting::Default => LaunchMode::Default,
            LaunchModeSetting::Debug => LaunchMode::Debug,
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_owned())
    }
}
