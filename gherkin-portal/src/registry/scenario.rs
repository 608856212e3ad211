// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{FeatureContext, HandleCell, NodeLevel, ResolvedScenario, RuleContext};
use crate::{
    errors::{LeafKind, ReporterError, StructuralError},
    events::HookType,
    gherkin::{ScenarioDefinition, SourceUri},
    mapping::worst_status,
};
use dashmap::DashMap;
use portal_model::{ItemStatus, ItemUuid};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

/// Identifies a scenario execution: its source URI and executed line.
pub(crate) type ScenarioKey = (SourceUri, u32);

/// Per-execution state for a scenario or a single outline row.
#[derive(Debug)]
pub(crate) struct ScenarioContext {
    uri: SourceUri,
    line: u32,
    name: String,
    tags: Vec<String>,
    feature: Arc<FeatureContext>,
    rule: Option<Arc<RuleContext>>,
    handle: HandleCell,
    steps: HashMap<u32, String>,
    outline_ordinal: Option<usize>,
    state: Mutex<ScenarioState>,
}

#[derive(Debug, Default)]
struct ScenarioState {
    leaf: LeafState,
    backgrounds: VecDeque<BackgroundStep>,
    worst: Option<ItemStatus>,
}

#[derive(Debug)]
struct BackgroundStep {
    line: u32,
    prefix: String,
}

/// The leaf item currently open under a scenario. There is at most one.
#[derive(Debug, Default)]
pub(crate) enum LeafState {
    #[default]
    Idle,
    StepOpen(OpenStep),
    HookOpen(OpenHook),
}

#[derive(Clone, Debug)]
pub(crate) struct OpenStep {
    pub(crate) handle: ItemUuid,
    pub(crate) line: u32,
    pub(crate) text: String,
}

#[derive(Clone, Debug)]
pub(crate) struct OpenHook {
    pub(crate) handle: ItemUuid,
    pub(crate) hook_type: HookType,
    /// The status accumulated from the hook's results so far.
    pub(crate) status: ItemStatus,
}

/// How a step about to start should be reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StepPlan {
    /// The declared keyword, e.g. `Given `.
    pub(crate) keyword: String,
    /// `BACKGROUND: ` for steps served from a background.
    pub(crate) prefix: Option<String>,
}

impl ScenarioContext {
    pub(crate) fn new(
        resolved: &ResolvedScenario<'_>,
        uri: SourceUri,
        name: String,
        tags: Vec<String>,
        feature: Arc<FeatureContext>,
        rule: Option<Arc<RuleContext>>,
        outline_ordinal: Option<usize>,
    ) -> Self {
        let mut steps: HashMap<u32, String> = resolved
            .definition
            .steps
            .iter()
            .map(|step| (step.line, step.keyword.clone()))
            .collect();

        let mut backgrounds = VecDeque::new();
        for background in resolved.backgrounds() {
            let prefix = format!("{}: ", background.keyword.to_uppercase());
            for step in &background.steps {
                steps.insert(step.line, step.keyword.clone());
                backgrounds.push_back(BackgroundStep {
                    line: step.line,
                    prefix: prefix.clone(),
                });
            }
        }

        Self {
            uri,
            line: resolved.line,
            name,
            tags,
            feature,
            rule,
            handle: HandleCell::new(NodeLevel::Scenario),
            steps,
            outline_ordinal,
            state: Mutex::new(ScenarioState {
                backgrounds,
                ..Default::default()
            }),
        }
    }

    pub(crate) fn uri(&self) -> &SourceUri {
        &self.uri
    }

    pub(crate) fn line(&self) -> u32 {
        self.line
    }

    pub(crate) fn key(&self) -> ScenarioKey {
        (self.uri.clone(), self.line)
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Tags of the scenario, without those inherited from the feature.
    pub(crate) fn tags(&self) -> &[String] {
        &self.tags
    }

    pub(crate) fn feature(&self) -> &Arc<FeatureContext> {
        &self.feature
    }

    pub(crate) fn rule(&self) -> Option<&Arc<RuleContext>> {
        self.rule.as_ref()
    }

    pub(crate) fn handle(&self) -> &HandleCell {
        &self.handle
    }

    /// The 1-based position of this row among all rows of its outline.
    pub(crate) fn outline_ordinal(&self) -> Option<usize> {
        self.outline_ordinal
    }

    fn lock(&self) -> Result<MutexGuard<'_, ScenarioState>, ReporterError> {
        self.state.lock().map_err(|_| ReporterError::Poisoned)
    }

    fn overlap(&self, open: &LeafState, started: LeafKind) -> Option<StructuralError> {
        let open = match open {
            LeafState::Idle => return None,
            LeafState::StepOpen(_) => LeafKind::Step,
            LeafState::HookOpen(_) => LeafKind::Hook,
        };
        Some(StructuralError::LeafOverlap {
            uri: self.uri.clone(),
            line: self.line,
            open,
            started,
        })
    }

    /// Checks that a step may start, and consumes a background step if it is next.
    pub(crate) fn begin_step(&self, step_line: u32) -> Result<StepPlan, ReporterError> {
        let mut state = self.lock()?;
        if let Some(error) = self.overlap(&state.leaf, LeafKind::Step) {
            return Err(error.into());
        }
        let keyword = self
            .steps
            .get(&step_line)
            .cloned()
            .ok_or_else(|| StructuralError::StepNotFound {
                uri: self.uri.clone(),
                scenario_line: self.line,
                step_line,
            })?;
        let prefix = match state.backgrounds.front() {
            Some(next) if next.line == step_line => {
                state.backgrounds.pop_front().map(|step| step.prefix)
            }
            _ => None,
        };
        Ok(StepPlan { keyword, prefix })
    }

    pub(crate) fn step_opened(&self, step: OpenStep) -> Result<(), ReporterError> {
        let mut state = self.lock()?;
        if let Some(error) = self.overlap(&state.leaf, LeafKind::Step) {
            return Err(error.into());
        }
        state.leaf = LeafState::StepOpen(step);
        Ok(())
    }

    /// Closes the open step, recording its status.
    pub(crate) fn finish_step(&self, status: ItemStatus) -> Result<OpenStep, ReporterError> {
        let mut state = self.lock()?;
        match std::mem::take(&mut state.leaf) {
            LeafState::StepOpen(step) => {
                state.worst = Some(state.worst.map_or(status, |w| worst_status(w, status)));
                Ok(step)
            }
            other => {
                state.leaf = other;
                Err(StructuralError::LeafNotOpen {
                    uri: self.uri.clone(),
                    line: self.line,
                    finished: LeafKind::Step,
                }
                .into())
            }
        }
    }

    pub(crate) fn begin_hook(&self) -> Result<(), ReporterError> {
        let state = self.lock()?;
        match self.overlap(&state.leaf, LeafKind::Hook) {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    pub(crate) fn hook_opened(
        &self,
        handle: ItemUuid,
        hook_type: HookType,
    ) -> Result<(), ReporterError> {
        let mut state = self.lock()?;
        if let Some(error) = self.overlap(&state.leaf, LeafKind::Hook) {
            return Err(error.into());
        }
        state.leaf = LeafState::HookOpen(OpenHook {
            handle,
            hook_type,
            status: ItemStatus::Passed,
        });
        Ok(())
    }

    /// Closes the open hook, folding `status` into its accumulator.
    pub(crate) fn finish_hook(&self, status: ItemStatus) -> Result<OpenHook, ReporterError> {
        let mut state = self.lock()?;
        match std::mem::take(&mut state.leaf) {
            LeafState::HookOpen(mut hook) => {
                hook.status = worst_status(hook.status, status);
                state.worst = Some(
                    state
                        .worst
                        .map_or(hook.status, |w| worst_status(w, hook.status)),
                );
                Ok(hook)
            }
            other => {
                state.leaf = other;
                Err(StructuralError::LeafNotOpen {
                    uri: self.uri.clone(),
                    line: self.line,
                    finished: LeafKind::Hook,
                }
                .into())
            }
        }
    }

    /// The open leaf's handle, if a step or hook is running.
    pub(crate) fn open_leaf(&self) -> Result<Option<ItemUuid>, ReporterError> {
        Ok(match &self.lock()?.leaf {
            LeafState::Idle => None,
            LeafState::StepOpen(step) => Some(step.handle),
            LeafState::HookOpen(hook) => Some(hook.handle),
        })
    }

    /// Takes a leaf that was left open, for force-closing.
    pub(crate) fn take_open_leaf(&self) -> Result<Option<(LeafKind, ItemUuid)>, ReporterError> {
        let mut state = self.lock()?;
        Ok(match std::mem::take(&mut state.leaf) {
            LeafState::Idle => None,
            LeafState::StepOpen(step) => Some((LeafKind::Step, step.handle)),
            LeafState::HookOpen(hook) => Some((LeafKind::Hook, hook.handle)),
        })
    }

    /// The worst status among the steps and hooks that finished so far.
    pub(crate) fn worst_status(&self) -> Result<Option<ItemStatus>, ReporterError> {
        Ok(self.lock()?.worst)
    }
}

/// Scenario contexts of running scenarios, keyed by URI and executed line.
#[derive(Debug, Default)]
pub(crate) struct ScenarioRegistry {
    scenarios: DashMap<ScenarioKey, Arc<ScenarioContext>>,
}

impl ScenarioRegistry {
    /// Returns the running context for `key`, or inserts the one built by `make`.
    ///
    /// The second element is false if a context for `key` was already running.
    pub(crate) fn get_or_create(
        &self,
        key: ScenarioKey,
        make: impl FnOnce() -> ScenarioContext,
    ) -> (Arc<ScenarioContext>, bool) {
        let mut created = false;
        let context = Arc::clone(
            self.scenarios
                .entry(key)
                .or_insert_with(|| {
                    created = true;
                    Arc::new(make())
                })
                .value(),
        );
        (context, created)
    }

    /// Removes a context. Only call this after the scenario's backend finish call.
    pub(crate) fn remove(&self, key: &ScenarioKey) -> Option<Arc<ScenarioContext>> {
        self.scenarios.remove(key).map(|(_, context)| context)
    }

    /// Removes and returns every context still running, ordered by key.
    pub(crate) fn drain(&self) -> Vec<Arc<ScenarioContext>> {
        let mut keys: Vec<_> = self.scenarios.iter().map(|e| e.key().clone()).collect();
        keys.sort_unstable();
        keys.into_iter().filter_map(|key| self.remove(&key)).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.scenarios.len()
    }
}

/// Example row lines per outline, computed once per outline definition.
#[derive(Debug, Default)]
pub(crate) struct OutlineCache {
    rows: DashMap<ScenarioKey, Arc<[u32]>>,
}

impl OutlineCache {
    /// Returns the lines of all rows generated by `outline`.
    pub(crate) fn rows(&self, uri: &SourceUri, outline: &ScenarioDefinition) -> Arc<[u32]> {
        Arc::clone(
            self.rows
                .entry((uri.clone(), outline.line))
                .or_insert_with(|| outline.example_row_lines().collect())
                .value(),
        )
    }

    /// Returns the 1-based ordinal of the row at `row_line`.
    pub(crate) fn ordinal(
        &self,
        uri: &SourceUri,
        outline: &ScenarioDefinition,
        row_line: u32,
    ) -> Option<usize> {
        self.rows(uri, outline)
            .iter()
            .position(|&line| line == row_line)
            .map(|index| index + 1)
    }

    pub(crate) fn clear(&self) {
        self.rows.clear();
    }
}
