// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::ItemAttribute;
use chrono::{DateTime, FixedOffset};
use newtype_uuid::{TypedUuid, TypedUuidKind, TypedUuidTag};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind marker for launch handles.
pub enum LaunchKind {}

impl TypedUuidKind for LaunchKind {
    #[inline]
    fn tag() -> TypedUuidTag {
        const TAG: TypedUuidTag = TypedUuidTag::new("launch");
        TAG
    }
}

/// An opaque handle to a launch created by a reporting backend.
pub type LaunchUuid = TypedUuid<LaunchKind>;

/// The mode a launch is reported in.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchMode {
    /// A regular launch, visible to everyone.
    #[default]
    Default,
    /// A debug launch, only visible to its owner.
    Debug,
}

impl LaunchMode {
    /// Returns the string representation used by backends.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to start a launch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct StartLaunch {
    /// The launch name.
    pub name: String,

    /// The time at which the launch started.
    pub start_time: DateTime<FixedOffset>,

    /// A free-form description.
    pub description: Option<String>,

    /// User-provided and system attributes.
    pub attributes: Vec<ItemAttribute>,

    /// The launch mode.
    pub mode: LaunchMode,

    /// Whether this launch is a rerun of an earlier one.
    pub rerun: bool,

    /// The identifier of the launch being rerun, if known.
    pub rerun_of: Option<String>,
}

impl StartLaunch {
    /// Creates a new request with the given name and start time.
    pub fn new(name: impl Into<String>, start_time: DateTime<FixedOffset>) -> Self {
        Self {
            name: name.into(),
            start_time,
            description: None,
            attributes: Vec::new(),
            mode: LaunchMode::Default,
            rerun: false,
            rerun_of: None,
        }
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
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

    /// Sets the launch mode.
    pub fn set_mode(&mut self, mode: LaunchMode) -> &mut Self {
        self.mode = mode;
        self
    }

    /// Marks this launch as a rerun, optionally of a specific earlier launch.
    pub fn set_rerun(&mut self, rerun: bool, rerun_of: Option<String>) -> &mut Self {
        self.rerun = rerun;
        self.rerun_of = rerun_of;
        self
    }
}

/// A request to finish a launch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishLaunch {
    /// The time at which the launch ended.
    pub end_time: DateTime<FixedOffset>,
}

impl FinishLaunch {
    /// Creates a new request.
    pub fn new(end_time: DateTime<FixedOffset>) -> Self {
        Self { end_time }
    }
}
