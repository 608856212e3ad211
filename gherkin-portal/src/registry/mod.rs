// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-run registries that reconstruct the feature → rule → scenario hierarchy.
//!
//! All registries are shared between engine worker threads. Map operations are short and never
//! span a backend call, with the exception of the per-feature rule section in [`RuleSequencer`].
//! That section covers rule transitions and the create call of the scenario that caused them.

mod feature;
mod rule;
mod scenario;
mod source;

pub(crate) use feature::*;
pub(crate) use rule::*;
pub(crate) use scenario::*;
pub(crate) use source::*;

use crate::errors::StructuralError;
use portal_model::ItemUuid;
use std::{fmt, sync::OnceLock};

/// The level of a node in the report tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeLevel {
    /// The root suite used in scenario reporting mode.
    RootSuite,
    /// A feature.
    Feature,
    /// A rule.
    Rule,
    /// A scenario.
    Scenario,
}

impl fmt::Display for NodeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootSuite => f.write_str("root suite"),
            Self::Feature => f.write_str("feature"),
            Self::Rule => f.write_str("rule"),
            Self::Scenario => f.write_str("scenario"),
        }
    }
}

/// A backend handle that is assigned at most once.
#[derive(Debug)]
pub(crate) struct HandleCell {
    level: NodeLevel,
    cell: OnceLock<ItemUuid>,
}

impl HandleCell {
    pub(crate) fn new(level: NodeLevel) -> Self {
        Self {
            level,
            cell: OnceLock::new(),
        }
    }

    /// Assigns the handle. Assigning twice means two nodes claimed the same identity.
    pub(crate) fn set(&self, handle: ItemUuid, name: &str) -> Result<(), StructuralError> {
        self.cell
            .set(handle)
            .map_err(|_| StructuralError::HandleReassigned {
                level: self.level,
                name: name.to_owned(),
            })
    }

    /// Returns the handle, running `create` if it was never assigned.
    ///
    /// Concurrent callers block until the first caller's `create` returns, so `create` runs
    /// exactly once.
    pub(crate) fn get_or_init(&self, create: impl FnOnce() -> ItemUuid) -> ItemUuid {
        *self.cell.get_or_init(create)
    }

    pub(crate) fn get(&self) -> Option<ItemUuid> {
        self.cell.get().copied()
    }

    /// Returns the handle of a node about to be finished.
    pub(crate) fn require(&self, name: &str) -> Result<ItemUuid, StructuralError> {
        self.get().ok_or_else(|| StructuralError::UnassignedHandle {
            level: self.level,
            name: name.to_owned(),
        })
    }
}
