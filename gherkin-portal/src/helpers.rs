// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Naming and formatting of reported items.

use crate::{
    events::{DefinitionArgument, HookStep, HookType},
    gherkin::{SourceUri, StepArgument},
};
use camino::Utf8Path;
use itertools::Itertools;
use portal_model::{ItemAttribute, ItemType, Parameter};
use swrite::{SWrite, swrite};

const TABLE_INDENT: &str = "          ";
const TABLE_SEPARATOR: &str = "|";
const DOCSTRING_DECORATOR: &str = "\n\"\"\"\n";

/// `Feature: Login`, `Rule: Admins`, `Scenario Outline: Eating`.
pub(crate) fn node_name(keyword: &str, name: &str) -> String {
    format!("{keyword}: {name}")
}

/// Appends the 1-based outline row ordinal, e.g. `Scenario Outline: Eating [2]`.
pub(crate) fn scenario_name(keyword: &str, name: &str, outline_ordinal: Option<usize>) -> String {
    let mut out = node_name(keyword, name);
    if let Some(ordinal) = outline_ordinal {
        swrite!(out, " [{ordinal}]");
    }
    out
}

/// `BACKGROUND: Given a user`.
pub(crate) fn step_name(prefix: Option<&str>, keyword: &str, text: &str) -> String {
    format!("{}{keyword}{text}", prefix.unwrap_or_default())
}

/// Renders a data table or docstring for an item description.
pub(crate) fn multiline_argument(argument: &StepArgument) -> String {
    let mut out = String::new();
    match argument {
        StepArgument::DataTable { rows } => {
            out.push('\n');
            for row in rows {
                out.push_str(TABLE_INDENT);
                out.push_str(TABLE_SEPARATOR);
                for cell in row {
                    swrite!(out, " {cell} {TABLE_SEPARATOR}");
                }
                out.push('\n');
            }
        }
        StepArgument::DocString { content, .. } => {
            if !content.is_empty() {
                out.push_str(DOCSTRING_DECORATOR);
                out.push_str(content);
                out.push_str(DOCSTRING_DECORATOR);
            }
        }
    }
    out
}

/// The backend item type and display name for a hook, in step reporting mode.
pub(crate) fn hook_item(hook_type: HookType) -> (ItemType, &'static str) {
    match hook_type {
        HookType::BeforeScenario => (ItemType::BeforeTest, "Before hooks"),
        HookType::AfterScenario => (ItemType::AfterTest, "After hooks"),
        HookType::BeforeStep => (ItemType::BeforeMethod, "Before step"),
        HookType::AfterStep => (ItemType::AfterMethod, "After step"),
    }
}

/// `Before hook: hooks::setup_db`.
pub(crate) fn hook_log_message(hook: &HookStep) -> String {
    let when = if hook.hook_type.is_before() {
        "Before"
    } else {
        "After"
    };
    format!("{when} hook: {}", hook.code_location)
}

/// A code reference to a location in a source unit, relative to `working_dir` when possible.
///
/// Features use line 0.
pub(crate) fn source_code_ref(
    uri: &SourceUri,
    working_dir: Option<&Utf8Path>,
    line: u32,
) -> String {
    let path = Utf8Path::new(uri.path());
    let relative = working_dir
        .and_then(|dir| path.strip_prefix(dir).ok())
        .unwrap_or(path);
    format!("{relative}:{line}")
}

/// A test case ID derived from a code reference and the values captured by the step definition.
pub(crate) fn test_case_id(code_ref: &str, arguments: &[DefinitionArgument]) -> String {
    let values: Vec<_> = arguments
        .iter()
        .filter_map(|argument| argument.value.as_deref())
        .collect();
    if values.is_empty() {
        code_ref.to_owned()
    } else {
        format!("{code_ref}[{}]", values.iter().join(","))
    }
}

pub(crate) fn parameters(arguments: &[DefinitionArgument]) -> impl Iterator<Item = Parameter> + '_ {
    arguments
        .iter()
        .map(|argument| Parameter::new(argument.parameter_type.clone(), argument.value.clone()))
}

/// Tags become value-only attributes.
pub(crate) fn tag_attributes<'a>(
    tags: impl IntoIterator<Item = &'a String>,
) -> impl Iterator<Item = ItemAttribute> {
    tags.into_iter().map(ItemAttribute::value_only)
}

/// The default attachment name: the top-level type of its MIME type, e.g. `image`.
pub(crate) fn attachment_name(mime_type: &str) -> String {
    mime_type
        .split('/')
        .next()
        .filter(|top| !top.is_empty())
        .unwrap_or("attachment")
        .to_owned()
}
