// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{HandleCell, NodeLevel};
use crate::{
    errors::{ReporterError, StructuralError},
    gherkin::{RuleDefinition, SourceUri},
};
use portal_model::ItemUuid;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A rule block, identified by its source URI and declaration line.
#[derive(Debug)]
pub(crate) struct RuleContext {
    uri: SourceUri,
    line: u32,
    name: String,
    description: Option<String>,
    tags: Vec<String>,
    handle: HandleCell,
}

impl RuleContext {
    pub(crate) fn new(uri: SourceUri, definition: &RuleDefinition) -> Self {
        Self {
            uri,
            line: definition.line,
            name: format!("{}: {}", definition.keyword, definition.name),
            description: definition.description.clone(),
            tags: definition.tags.clone(),
            handle: HandleCell::new(NodeLevel::Rule),
        }
    }

    pub(crate) fn uri(&self) -> &SourceUri {
        &self.uri
    }

    pub(crate) fn line(&self) -> u32 {
        self.line
    }

    /// The display name, e.g. `Rule: only admins can delete`.
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub(crate) fn tags(&self) -> &[String] {
        &self.tags
    }

    pub(crate) fn handle(&self) -> &HandleCell {
        &self.handle
    }

    fn same_identity(&self, uri: &SourceUri, line: u32) -> bool {
        self.line == line && &self.uri == uri
    }
}

/// The rule state of a feature.
#[derive(Debug, Default)]
pub(crate) enum RuleState {
    #[default]
    NoRuleOpen,
    RuleOpen(Arc<RuleContext>),
}

/// What a rule transition did.
#[derive(Clone, Debug, Default)]
pub(crate) struct RuleTransition {
    /// The rule the scenario belongs to, open after the transition.
    pub(crate) current: Option<Arc<RuleContext>>,
    /// The rule closed by this transition.
    pub(crate) closed: Option<Arc<RuleContext>>,
    /// True if `current` was opened by this transition.
    pub(crate) opened: bool,
}

/// Keeps at most one rule open per feature.
///
/// Scenarios from different rules may start concurrently on different threads. Every
/// check-and-transition runs inside a per-feature critical section, and the backend calls for
/// closing and opening rules are issued inside it. Backend calls return handles immediately, so
/// the section stays short.
#[derive(Debug, Default)]
pub(crate) struct RuleSequencer {
    state: Mutex<RuleState>,
}

impl RuleSequencer {
    /// Moves to the rule declared by a starting scenario, or to no rule, then attaches the
    /// scenario.
    ///
    /// `close` is called with the rule being closed and its handle. `open` is called with the
    /// rule being opened and must return the new handle. `attach` creates the scenario under the
    /// resulting rule. All three run before the section is released, so no other scenario of the
    /// feature can close the rule before the scenario is attached to it.
    pub(crate) fn transition<T>(
        &self,
        uri: &SourceUri,
        next: Option<&RuleDefinition>,
        close: impl FnOnce(&RuleContext, ItemUuid),
        open: impl FnOnce(&RuleContext) -> ItemUuid,
        attach: impl FnOnce(&RuleTransition) -> Result<T, ReporterError>,
    ) -> Result<(RuleTransition, T), ReporterError> {
        let mut state = self.state.lock().map_err(|_| ReporterError::Poisoned)?;
        let transition = apply(&mut state, uri, next, close, open)?;
        let attached = attach(&transition)?;
        Ok((transition, attached))
    }

    /// Takes the open rule, if any, leaving the feature with no rule open.
    pub(crate) fn take_open(&self) -> Result<Option<Arc<RuleContext>>, ReporterError> {
        let mut state = self.state.lock().map_err(|_| ReporterError::Poisoned)?;
        match std::mem::take(&mut *state) {
            RuleState::NoRuleOpen => Ok(None),
            RuleState::RuleOpen(rule) => Ok(Some(rule)),
        }
    }
}

fn apply(
    state: &mut RuleState,
    uri: &SourceUri,
    next: Option<&RuleDefinition>,
    close: impl FnOnce(&RuleContext, ItemUuid),
    open: impl FnOnce(&RuleContext) -> ItemUuid,
) -> Result<RuleTransition, ReporterError> {
    if let (RuleState::RuleOpen(open_rule), Some(definition)) = (&*state, next) {
        if open_rule.same_identity(uri, definition.line) {
            let requested = RuleContext::new(uri.clone(), definition);
            if requested.name != open_rule.name {
                return Err(StructuralError::RuleIdentityConflict {
                    uri: uri.clone(),
                    line: definition.line,
                    open_name: open_rule.name.clone(),
                    new_name: requested.name,
                }
                .into());
            }
            return Ok(RuleTransition {
                current: Some(Arc::clone(open_rule)),
                ..Default::default()
            });
        }
    }

    let mut transition = RuleTransition::default();
    if let RuleState::RuleOpen(open_rule) = std::mem::take(state) {
        let handle = open_rule.handle.require(&open_rule.name)?;
        debug!(uri = %open_rule.uri, line = open_rule.line, "closing rule");
        close(&open_rule, handle);
        transition.closed = Some(open_rule);
    }

    if let Some(definition) = next {
        let rule = Arc::new(RuleContext::new(uri.clone(), definition));
        debug!(%uri, line = rule.line, "opening rule");
        let handle = open(&rule);
        rule.handle.set(handle, &rule.name)?;
        *state = RuleState::RuleOpen(Arc::clone(&rule));
        transition.current = Some(rule);
        transition.opened = true;
    }

    Ok(transition)
}
