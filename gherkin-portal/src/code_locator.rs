// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolving steps to the code that implements them.
//!
//! Code references identify a step definition across runs, and seed the test case IDs that
//! backends use to track history. How a step maps to code depends on the host: the engine may
//! report a location string, or the host may generate a registry at build time. The
//! [`CodeLocator`] trait is the seam between the two.

use crate::events::PickleStep;
use indexmap::IndexMap;
use portal_model::ItemAttribute;
use std::fmt;

/// Resolves steps to code references and code-level metadata.
pub trait CodeLocator: Send + Sync + fmt::Debug {
    /// Returns the code reference of the step definition matched by `step`.
    fn code_ref(&self, step: &PickleStep) -> Option<String>;

    /// Returns attributes declared on the step definition.
    fn attributes(&self, _step: &PickleStep) -> Vec<ItemAttribute> {
        Vec::new()
    }

    /// Returns a test case ID declared on the step definition, overriding the derived one.
    fn test_case_id(&self, _step: &PickleStep) -> Option<String> {
        None
    }
}

/// Derives code references from the location the engine reports for each step definition.
///
/// Argument lists are dropped, so `steps::login(String, String)` becomes `steps::login`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocationCodeLocator;

impl CodeLocator for LocationCodeLocator {
    fn code_ref(&self, step: &PickleStep) -> Option<String> {
        step.code_location
            .as_deref()
            .map(trim_location)
            .filter(|location| !location.is_empty())
            .map(str::to_owned)
    }
}

fn trim_location(location: &str) -> &str {
    match location.find('(') {
        Some(index) => location[..index].trim_end(),
        None => location.trim(),
    }
}

/// Metadata registered for a step definition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeEntry {
    /// The code reference.
    pub code_ref: String,

    /// Attributes declared on the definition.
    pub attributes: Vec<ItemAttribute>,

    /// An explicit test case ID.
    pub test_case_id: Option<String>,
}

/// A registry of step definitions, keyed by the location the engine reports for them.
///
/// Locations without an entry fall back to [`LocationCodeLocator`].
#[derive(Clone, Debug, Default)]
pub struct CodeRegistry {
    entries: IndexMap<String, CodeEntry>,
}

impl CodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers metadata for the step definition at `location`.
    pub fn register(&mut self, location: impl Into<String>, entry: CodeEntry) -> &mut Self {
        self.entries.insert(location.into(), entry);
        self
    }

    fn entry(&self, step: &PickleStep) -> Option<&CodeEntry> {
        step.code_location
            .as_deref()
            .and_then(|location| self.entries.get(location))
    }
}

impl CodeLocator for CodeRegistry {
    fn code_ref(&self, step: &PickleStep) -> Option<String> {
        match self.entry(step) {
            Some(entry) => Some(entry.code_ref.clone()),
            None => LocationCodeLocator.code_ref(step),
        }
    }

    fn attributes(&self, step: &PickleStep) -> Vec<ItemAttribute> {
        self.entry(step)
            .map(|entry| entry.attributes.clone())
            .unwrap_or_default()
    }

    fn test_case_id(&self, step: &PickleStep) -> Option<String> {
        self.entry(step).and_then(|entry| entry.test_case_id.clone())
    }
}
