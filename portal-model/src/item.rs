// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::AttributeParseError;
use chrono::{DateTime, FixedOffset};
use newtype_uuid::{TypedUuid, TypedUuidKind, TypedUuidTag};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The kind marker for test item handles.
pub enum ItemKind {}

impl TypedUuidKind for ItemKind {
    #[inline]
    fn tag() -> TypedUuidTag {
        const TAG: TypedUuidTag = TypedUuidTag::new("item");
        TAG
    }
}

/// An opaque handle to an item created by a reporting backend.
///
/// Handles are returned immediately by the backend when an item is started, and are used for all
/// later finish, log and attachment calls against that item.
pub type ItemUuid = TypedUuid<ItemKind>;

/// The type of a test item, which determines how the backend displays it and whether it
/// contributes to statistics.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    /// A suite-like container. Used for rules and for the root suite.
    Suite,
    /// A story, usually a feature file.
    Story,
    /// A generic test container.
    Test,
    /// A scenario container.
    Scenario,
    /// A leaf step.
    Step,
    /// Hooks run before a scenario.
    BeforeTest,
    /// Hooks run after a scenario.
    AfterTest,
    /// Hooks run before a step.
    BeforeMethod,
    /// Hooks run after a step.
    AfterMethod,
}

impl ItemType {
    /// Returns the string representation used by backends.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Suite => "SUITE",
            Self::Story => "STORY",
            Self::Test => "TEST",
            Self::Scenario => "SCENARIO",
            Self::Step => "STEP",
            Self::BeforeTest => "BEFORE_TEST",
            Self::AfterTest => "AFTER_TEST",
            Self::BeforeMethod => "BEFORE_METHOD",
            Self::AfterMethod => "AFTER_METHOD",
        }
    }

    /// Returns true if this is a before or after hook type.
    pub fn is_hook(self) -> bool {
        matches!(
            self,
            Self::BeforeTest | Self::AfterTest | Self::BeforeMethod | Self::AfterMethod
        )
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The final status of a test item.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// The item passed.
    Passed,
    /// The item failed.
    Failed,
    /// The item was skipped.
    Skipped,
    /// The item was still running when the run ended.
    Interrupted,
}

impl ItemStatus {
    /// Returns the string representation used by backends.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
            Self::Interrupted => "INTERRUPTED",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key-value attribute attached to a launch or item.
///
/// Gherkin tags become attributes with no key, e.g. `@smoke` becomes `{ value: "@smoke" }`.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ItemAttribute {
    /// The attribute key, if any.
    pub key: Option<String>,

    /// The attribute value.
    pub value: String,

    /// True if this attribute is generated by the reporting agent rather than by the user.
    #[serde(default)]
    pub system: bool,
}

impl ItemAttribute {
    /// Creates a new attribute with the given key and value.
    pub fn new(key: Option<impl Into<String>>, value: impl Into<String>) -> Self {
        Self {
            key: key.map(Into::into),
            value: value.into(),
            system: false,
        }
    }

    /// Creates an attribute with only a value. This is how tags are represented.
    pub fn value_only(value: impl Into<String>) -> Self {
        Self {
            key: None,
            value: value.into(),
            system: false,
        }
    }

    /// Creates a system attribute.
    pub fn system(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
            system: true,
        }
    }
}

impl FromStr for ItemAttribute {
    type Err = AttributeParseError;

    /// Parses `"key:value"` or `"value"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AttributeParseError::Empty);
        }
        match s.split_once(':') {
            Some((_, "")) => Err(AttributeParseError::MissingValue {
                input: s.to_owned(),
            }),
            Some(("", value)) => Ok(Self::value_only(value)),
            Some((key, value)) => Ok(Self::new(Some(key), value)),
            None => Ok(Self::value_only(s)),
        }
    }
}

impl fmt::Display for ItemAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{key}:{}", self.value),
            None => f.write_str(&self.value),
        }
    }
}

/// A named parameter of a test item, e.g. an argument passed to a step definition.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// The parameter name or type.
    pub key: String,

    /// The parameter value, if known.
    pub value: Option<String>,
}

impl Parameter {
    /// Creates a new parameter.
    pub fn new(key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        Self {
            key: key.into(),
            value: value.map(Into::into),
        }
    }
}

/// A request to start a new test item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct StartItem {
    /// The display name of the item.
    pub name: String,

    /// The type of the item.
    #[serde(rename = "type")]
    pub item_type: ItemType,

    /// The time at which the item started.
    pub start_time: DateTime<FixedOffset>,

    /// A free-form description.
    pub description: Option<String>,

    /// A reference to the source code that defines the item.
    pub code_ref: Option<String>,

    /// A stable identifier for the test case, used to track history across launches.
    pub test_case_id: Option<String>,

    /// Attributes attached to this item.
    pub attributes: Vec<ItemAttribute>,

    /// Parameters of this item.
    pub parameters: Vec<Parameter>,

    /// Whether this item contributes to the parent's statistics.
    pub has_stats: bool,
}

impl StartItem {
    /// Creates a new request with the given name, type and start time.
    pub fn new(
        name: impl Into<String>,
        item_type: ItemType,
        start_time: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            name: name.into(),
            item_type,
            start_time,
            description: None,
            code_ref: None,
            test_case_id: None,
            attributes: Vec::new(),
            parameters: Vec::new(),
            has_stats: true,
        }
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the code reference.
    pub fn set_code_ref(&mut self, code_ref: impl Into<String>) -> &mut Self {
        self.code_ref = Some(code_ref.into());
        self
    }

    /// Sets the test case ID.
    pub fn set_test_case_id(&mut self, test_case_id: impl Into<String>) -> &mut Self {
        self.test_case_id = Some(test_case_id.into());
        self
    }

    /// Adds several attributes.
    pub fn add_attributes(
        &mut self,
        attributes: impl IntoIterator<Item = ItemAttribute>,
    ) -> &mut Self {
        self.attributes.extend(attributes);
        self
    }

    /// Adds several parameters.
    pub fn add_parameters(&mut self, parameters: impl IntoIterator<Item = Parameter>) -> &mut Self {
        self.parameters.extend(parameters);
        self
    }

    /// Sets whether this item contributes to statistics.
    pub fn set_has_stats(&mut self, has_stats: bool) -> &mut Self {
        self.has_stats = has_stats;
        self
    }
}

/// A request to finish a test item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct FinishItem {
    /// The time at which the item ended.
    pub end_time: DateTime<FixedOffset>,

    /// The final status.
    ///
    /// Container items (rules, features) are finished without a status and let the backend
    /// compute it from their children.
    pub status: Option<ItemStatus>,

    /// An optional description that replaces the one sent on start.
    pub description: Option<String>,
}

impl FinishItem {
    /// Creates a request that finishes an item with the given status.
    pub fn new(end_time: DateTime<FixedOffset>, status: Option<ItemStatus>) -> Self {
        Self {
            end_time,
            status,
            description: None,
        }
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }
}
