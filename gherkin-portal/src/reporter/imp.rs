// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::stats::{Counter, RunStats, StatsCounter};
use crate::{
    backend::ReportingBackend,
    code_locator::{CodeLocator, LocationCodeLocator},
    config::{LaunchConfig, PortalConfig, ReportingMode},
    errors::{ReporterError, StructuralError},
    events::{EngineEvent, EngineEventKind, HookStep, PickleStep, StepResult, TestCase},
    helpers::{
        attachment_name, hook_item, hook_log_message, multiline_argument, node_name, parameters,
        scenario_name, source_code_ref, step_name, tag_attributes, test_case_id,
    },
    item_index::{CallbackReporter, ItemKey, ReportingItemIndex},
    locator::ExecutionLocator,
    mapping::{FALLBACK_LEVEL, ResolvedOutcome, worst_status},
    registry::{
        FeatureContext, FeatureRegistry, HandleCell, NodeLevel, OpenStep, OutlineCache,
        ScenarioContext, ScenarioRegistry, SourceRegistry,
    },
};
use bytes::Bytes;
use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset};
use debug_ignore::DebugIgnore;
use portal_model::{
    Attachment, DEFAULT_MIME_TYPE, FinishItem, ItemStatus, ItemType, ItemUuid, LaunchUuid,
    LogEntry, LogLevel, StartItem,
};
use std::{
    sync::{
        Arc, OnceLock,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};
use tracing::{debug, error, info, warn};

/// The name of the suite that holds every feature in [`ReportingMode::Scenario`].
pub const ROOT_SUITE_NAME: &str = "Root User Story";

/// Builds a [`PortalReporter`].
#[derive(Clone, Debug)]
pub struct PortalReporterBuilder {
    config: PortalConfig,
    code_locator: Arc<dyn CodeLocator>,
    working_dir: Option<Utf8PathBuf>,
}

impl PortalReporterBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(config: PortalConfig) -> Self {
        Self {
            config,
            code_locator: Arc::new(LocationCodeLocator),
            working_dir: None,
        }
    }

    /// Sets the code locator used to resolve step definitions.
    ///
    /// Defaults to [`LocationCodeLocator`].
    pub fn set_code_locator(&mut self, code_locator: Arc<dyn CodeLocator>) -> &mut Self {
        self.code_locator = code_locator;
        self
    }

    /// Sets the directory code references are made relative to.
    pub fn set_working_dir(&mut self, working_dir: impl Into<Utf8PathBuf>) -> &mut Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    /// Creates a new reporter that reports to `backend`.
    pub fn build(&self, backend: Arc<dyn ReportingBackend>) -> PortalReporter {
        let index = self
            .config
            .reporter
            .callback_reporting
            .then(|| Arc::new(ReportingItemIndex::default()));
        PortalReporter {
            mode: self.config.reporter.mode,
            launch_config: self.config.launch.clone(),
            code_locator: Arc::clone(&self.code_locator),
            working_dir: self.working_dir.clone(),
            backend,
            launch: OnceLock::new(),
            root_suite: HandleCell::new(NodeLevel::RootSuite),
            sources: DebugIgnore(SourceRegistry::default()),
            features: FeatureRegistry::default(),
            scenarios: ScenarioRegistry::default(),
            outlines: OutlineCache::default(),
            locator: ExecutionLocator::default(),
            index,
            poisoned: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            stats: StatsCounter::default(),
        }
    }
}

impl Default for PortalReporterBuilder {
    fn default() -> Self {
        Self::new(PortalConfig::default_config())
    }
}

/// Reports engine events to a hierarchical backend.
///
/// Created through a [`PortalReporterBuilder`]. One reporter handles one run.
#[derive(Debug)]
pub struct PortalReporter {
    pub(super) mode: ReportingMode,
    launch_config: LaunchConfig,
    code_locator: Arc<dyn CodeLocator>,
    working_dir: Option<Utf8PathBuf>,
    pub(super) backend: Arc<dyn ReportingBackend>,
    pub(super) launch: OnceLock<LaunchUuid>,
    pub(super) root_suite: HandleCell,
    pub(super) sources: DebugIgnore<SourceRegistry>,
    pub(super) features: FeatureRegistry,
    pub(super) scenarios: ScenarioRegistry,
    pub(super) outlines: OutlineCache,
    pub(super) locator: ExecutionLocator,
    pub(super) index: Option<Arc<ReportingItemIndex>>,
    poisoned: AtomicBool,
    pub(super) finished: AtomicBool,
    pub(super) stats: StatsCounter,
}

impl PortalReporter {
    /// Handles an event, on the thread the engine produced it on.
    ///
    /// A structural error means the event stream violated the shape of the report tree. The
    /// reporter is poisoned by it, and every later call returns [`ReporterError::Poisoned`].
    pub fn handle_event(&self, event: EngineEvent) -> Result<(), ReporterError> {
        if self.poisoned.load(Ordering::Acquire) {
            return Err(ReporterError::Poisoned);
        }
        let name = event.kind.name();
        let result = self.dispatch(event);
        if let Err(error) = &result {
            error!(event = name, ?error, "poisoning reporter");
            self.poisoned.store(true, Ordering::Release);
        }
        result
    }

    /// Returns true if an earlier event failed and the reporter refuses further events.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    /// Returns a snapshot of the run statistics.
    pub fn stats(&self) -> RunStats {
        self.stats.snapshot()
    }

    /// Returns the reporting mode.
    pub fn mode(&self) -> ReportingMode {
        self.mode
    }

    /// Returns a reporter for out-of-band reporting against already-created items.
    ///
    /// Returns `None` unless `callback-reporting` is enabled and the run has started.
    pub fn callback_reporter(&self) -> Option<CallbackReporter> {
        let launch = *self.launch.get()?;
        let index = Arc::clone(self.index.as_ref()?);
        Some(CallbackReporter::new(
            launch,
            index,
            Arc::clone(&self.backend),
        ))
    }

    fn dispatch(&self, event: EngineEvent) -> Result<(), ReporterError> {
        let EngineEvent { timestamp, kind } = event;
        if !matches!(kind, EngineEventKind::RunStarted) && self.finished.load(Ordering::Acquire) {
            return Err(StructuralError::RunAlreadyFinished { event: kind.name() }.into());
        }

        match kind {
            EngineEventKind::RunStarted => self.run_started(timestamp),
            EngineEventKind::SourceParsed { uri, document } => {
                self.sources.insert(uri, document);
                Ok(())
            }
            EngineEventKind::ScenarioStarted { test_case } => {
                self.scenario_started(timestamp, test_case)
            }
            EngineEventKind::StepStarted { step } => self.step_started(timestamp, step),
            EngineEventKind::StepFinished { step, result } => {
                self.step_finished(timestamp, &step, result)
            }
            EngineEventKind::HookStarted { hook } => self.hook_started(timestamp, &hook),
            EngineEventKind::HookFinished { hook, result } => {
                self.hook_finished(timestamp, &hook, result)
            }
            EngineEventKind::ScenarioFinished { result } => {
                self.scenario_finished(timestamp, result)
            }
            EngineEventKind::AttachmentEmitted {
                data,
                mime_type,
                name,
            } => self.attachment_emitted(timestamp, data, mime_type, name),
            EngineEventKind::TextLogged { text } => self.text_logged(timestamp, text),
            EngineEventKind::RunFinished => self.finalize(timestamp),
        }
    }

    fn run_started(&self, timestamp: DateTime<FixedOffset>) -> Result<(), ReporterError> {
        let mut started = false;
        let launch = *self.launch.get_or_init(|| {
            started = true;
            self.backend
                .start_launch(self.launch_config.start_request(timestamp))
        });
        if !started {
            return Err(StructuralError::RunAlreadyStarted.into());
        }
        info!(
            %launch,
            name = %self.launch_config.name,
            mode = %self.mode,
            "launch started",
        );

        if self.mode == ReportingMode::Scenario {
            let request = StartItem::new(ROOT_SUITE_NAME, ItemType::Suite, timestamp);
            let handle = self.backend.start_item(launch, None, request);
            self.root_suite.set(handle, ROOT_SUITE_NAME)?;
        }
        Ok(())
    }

    pub(super) fn require_launch(
        &self,
        event: &'static str,
    ) -> Result<LaunchUuid, StructuralError> {
        self.launch
            .get()
            .copied()
            .ok_or(StructuralError::RunNotStarted { event })
    }

    fn scenario_started(
        &self,
        timestamp: DateTime<FixedOffset>,
        test_case: TestCase,
    ) -> Result<(), ReporterError> {
        let launch = self.require_launch("scenario-started")?;
        let TestCase {
            uri,
            line,
            name,
            tags,
        } = test_case;

        let source = self
            .sources
            .get(&uri)
            .ok_or_else(|| StructuralError::UnknownSource {
                uri: uri.clone(),
                line,
            })?;
        let resolved = source
            .locate(line)
            .ok_or_else(|| StructuralError::ScenarioNotFound {
                uri: uri.clone(),
                line,
            })?;

        let feature_parent = match self.mode {
            ReportingMode::Step => None,
            ReportingMode::Scenario => Some(self.root_suite.require(ROOT_SUITE_NAME)?),
        };
        let (feature, feature_handle) = self.features.get_or_create(
            &uri,
            || {
                FeatureContext::new(
                    uri.clone(),
                    Arc::clone(source.document()),
                    node_name(&resolved.feature.keyword, &resolved.feature.name),
                    resolved.feature.tags.iter().cloned().collect(),
                )
            },
            |context| self.start_feature(launch, feature_parent, context, timestamp),
        );
        if !feature.created_from(&source) {
            return Err(StructuralError::SourceMismatch { uri, line }.into());
        }

        let outline_ordinal = if resolved.is_example_row {
            self.outlines.ordinal(&uri, resolved.definition, line)
        } else {
            None
        };
        let scenario_tags: Vec<String> = tags
            .into_iter()
            .filter(|tag| !feature.tags().contains(tag))
            .collect();
        let display_name = scenario_name(&resolved.definition.keyword, &name, outline_ordinal);

        let (transition, (context, handle)) = feature.rules().transition(
            &uri,
            resolved.rule,
            |_, handle| {
                self.backend
                    .finish_item(handle, FinishItem::new(timestamp, None));
            },
            |rule| {
                let mut request = StartItem::new(rule.name(), ItemType::Suite, timestamp);
                if let Some(description) = rule.description() {
                    request.set_description(description);
                }
                request
                    .set_code_ref(source_code_ref(
                        rule.uri(),
                        self.working_dir.as_deref(),
                        rule.line(),
                    ))
                    .add_attributes(tag_attributes(rule.tags()))
                    .set_has_stats(false);
                self.stats.record(Counter::Rule);
                self.backend
                    .start_item(launch, Some(feature_handle), request)
            },
            // The scenario is created while its rule is guaranteed to be open.
            |transition| {
                let (context, created) = self.scenarios.get_or_create((uri.clone(), line), || {
                    ScenarioContext::new(
                        &resolved,
                        uri.clone(),
                        display_name,
                        scenario_tags,
                        Arc::clone(&feature),
                        transition.current.clone(),
                        outline_ordinal,
                    )
                });
                if !created {
                    // Another thread is already running this scenario and owns its item.
                    return Err(StructuralError::HandleReassigned {
                        level: NodeLevel::Scenario,
                        name: context.name().to_owned(),
                    }
                    .into());
                }
                self.locator
                    .bind(thread::current().id(), Arc::clone(&context))?;
                let handle = self.start_scenario(launch, feature_handle, &context, timestamp)?;
                Ok((context, handle))
            },
        )?;
        if let Some(closed) = &transition.closed {
            debug!(
                uri = %closed.uri(),
                line = closed.line(),
                opened = transition.opened,
                "rule finished by a scenario outside it",
            );
        }
        self.stats.record(Counter::ScenarioStarted);
        debug!(
            %uri,
            line,
            name = context.name(),
            outline_row = ?context.outline_ordinal(),
            "scenario started",
        );

        if let Some(index) = &self.index {
            index.insert(ItemKey::feature(uri.clone()), feature_handle);
            index.insert(ItemKey::scenario(uri, line), handle);
        }
        Ok(())
    }

    fn start_scenario(
        &self,
        launch: LaunchUuid,
        feature_handle: ItemUuid,
        context: &ScenarioContext,
        timestamp: DateTime<FixedOffset>,
    ) -> Result<ItemUuid, ReporterError> {
        let parent = match context.rule() {
            Some(rule) => rule.handle().require(rule.name())?,
            None => feature_handle,
        };
        let code_ref = source_code_ref(context.uri(), self.working_dir.as_deref(), context.line());
        let mut request = match self.mode {
            ReportingMode::Step => StartItem::new(context.name(), ItemType::Scenario, timestamp),
            ReportingMode::Scenario => {
                let mut request = StartItem::new(context.name(), ItemType::Step, timestamp);
                request.set_test_case_id(code_ref.clone());
                request
            }
        };
        request
            .set_description(context.uri().as_str())
            .set_code_ref(code_ref)
            .add_attributes(tag_attributes(context.tags()));
        let handle = self.backend.start_item(launch, Some(parent), request);
        context.handle().set(handle, context.name())?;
        Ok(handle)
    }

    fn start_feature(
        &self,
        launch: LaunchUuid,
        parent: Option<ItemUuid>,
        feature: &FeatureContext,
        timestamp: DateTime<FixedOffset>,
    ) -> ItemUuid {
        let mut request = StartItem::new(feature.name(), ItemType::Story, timestamp);
        request
            .set_description(feature.uri().as_str())
            .set_code_ref(source_code_ref(
                feature.uri(),
                self.working_dir.as_deref(),
                0,
            ))
            .add_attributes(tag_attributes(feature.tags()));
        self.stats.record(Counter::Feature);
        self.backend.start_item(launch, parent, request)
    }

    /// Returns the scenario running on this thread, or records a dropped event.
    fn current_scenario(&self, event: &'static str) -> Option<Arc<ScenarioContext>> {
        let context = self.locator.current();
        if context.is_none() {
            warn!(
                event,
                thread = ?thread::current().id(),
                "no scenario running on this thread, dropping event",
            );
            self.stats.record(Counter::Dropped);
        }
        context
    }

    fn step_started(
        &self,
        timestamp: DateTime<FixedOffset>,
        step: PickleStep,
    ) -> Result<(), ReporterError> {
        let Some(context) = self.current_scenario("step-started") else {
            return Ok(());
        };
        let launch = self.require_launch("step-started")?;
        let plan = context.begin_step(step.line)?;
        let parent = context.handle().require(context.name())?;

        let mut request = StartItem::new(
            step_name(plan.prefix.as_deref(), &plan.keyword, &step.text),
            ItemType::Step,
            timestamp,
        );
        if let Some(argument) = &step.argument {
            let description = multiline_argument(argument);
            if !description.is_empty() {
                request.set_description(description);
            }
        }
        request
            .add_parameters(parameters(&step.definition_arguments))
            .add_attributes(self.code_locator.attributes(&step));
        if let Some(code_ref) = self.code_locator.code_ref(&step) {
            let id = self
                .code_locator
                .test_case_id(&step)
                .unwrap_or_else(|| test_case_id(&code_ref, &step.definition_arguments));
            request.set_code_ref(code_ref).set_test_case_id(id);
        } else if let Some(id) = self.code_locator.test_case_id(&step) {
            request.set_test_case_id(id);
        }
        if self.mode == ReportingMode::Scenario {
            request.set_has_stats(false);
        }

        let handle = self.backend.start_item(launch, Some(parent), request);
        if let Some(index) = &self.index {
            index.insert(
                ItemKey::step(context.uri().clone(), context.line(), step.text.as_str()),
                handle,
            );
        }
        context.step_opened(OpenStep {
            handle,
            line: step.line,
            text: step.text,
        })?;
        self.stats.record(Counter::Step);
        Ok(())
    }

    fn step_finished(
        &self,
        timestamp: DateTime<FixedOffset>,
        step: &PickleStep,
        result: StepResult,
    ) -> Result<(), ReporterError> {
        let Some(context) = self.current_scenario("step-finished") else {
            return Ok(());
        };
        let outcome = ResolvedOutcome::resolve(result.outcome);
        let open = context.finish_step(outcome.status)?;
        if open.line != step.line {
            warn!(
                uri = %context.uri(),
                open_line = open.line,
                finished_line = step.line,
                "finished step does not match the open step",
            );
        }

        if let Some(error) = result.error {
            self.backend
                .log(open.handle, LogEntry::new(timestamp, outcome.level, error));
        }
        self.report_fallback(open.handle, &outcome, timestamp);
        self.backend
            .finish_item(open.handle, FinishItem::new(timestamp, Some(outcome.status)));
        Ok(())
    }

    fn hook_started(
        &self,
        timestamp: DateTime<FixedOffset>,
        hook: &HookStep,
    ) -> Result<(), ReporterError> {
        let Some(context) = self.current_scenario("hook-started") else {
            return Ok(());
        };
        let launch = self.require_launch("hook-started")?;
        context.begin_hook()?;
        let parent = context.handle().require(context.name())?;

        let (item_type, name) = hook_item(hook.hook_type);
        let mut request = StartItem::new(name, item_type, timestamp);
        if self.mode == ReportingMode::Scenario {
            request.set_has_stats(false);
        }
        let handle = self.backend.start_item(launch, Some(parent), request);
        context.hook_opened(handle, hook.hook_type)?;
        self.stats.record(Counter::Hook);
        Ok(())
    }

    fn hook_finished(
        &self,
        timestamp: DateTime<FixedOffset>,
        hook: &HookStep,
        result: StepResult,
    ) -> Result<(), ReporterError> {
        let Some(context) = self.current_scenario("hook-finished") else {
            return Ok(());
        };
        let outcome = ResolvedOutcome::resolve(result.outcome);
        let open = context.finish_hook(outcome.status)?;
        if open.hook_type != hook.hook_type {
            warn!(
                uri = %context.uri(),
                open = ?open.hook_type,
                finished = ?hook.hook_type,
                "finished hook does not match the open hook",
            );
        }

        self.backend.log(
            open.handle,
            LogEntry::new(timestamp, outcome.level, hook_log_message(hook)),
        );
        if let Some(error) = result.error {
            self.backend
                .log(open.handle, LogEntry::new(timestamp, outcome.level, error));
        }
        self.report_fallback(open.handle, &outcome, timestamp);
        self.backend
            .finish_item(open.handle, FinishItem::new(timestamp, Some(open.status)));
        Ok(())
    }

    fn scenario_finished(
        &self,
        timestamp: DateTime<FixedOffset>,
        result: Option<StepResult>,
    ) -> Result<(), ReporterError> {
        let thread = thread::current().id();
        let Some(context) = self.locator.get(thread) else {
            warn!(
                event = "scenario-finished",
                ?thread,
                "no scenario running on this thread, dropping event",
            );
            self.stats.record(Counter::Dropped);
            return Ok(());
        };

        let handle = context.handle().require(context.name())?;
        let interrupted = self.close_open_leaf(&context, timestamp)?;
        let status = match result {
            Some(result) => {
                let outcome = ResolvedOutcome::resolve(result.outcome);
                self.report_fallback(handle, &outcome, timestamp);
                outcome.status
            }
            None => {
                let worst = context.worst_status()?.unwrap_or(ItemStatus::Passed);
                if interrupted {
                    worst_status(worst, ItemStatus::Interrupted)
                } else {
                    worst
                }
            }
        };

        self.backend
            .finish_item(handle, FinishItem::new(timestamp, Some(status)));
        context.feature().record_completion(timestamp)?;
        self.scenarios.remove(&context.key());
        if let Some(index) = &self.index {
            index.reap_steps(context.uri(), context.line());
        }
        self.locator.unbind(thread);
        self.stats.record(Counter::ScenarioFinished);
        debug!(
            uri = %context.uri(),
            line = context.line(),
            %status,
            "scenario finished",
        );
        Ok(())
    }

    /// Finishes a step or hook left open by its scenario as interrupted.
    ///
    /// Returns true if there was one.
    pub(super) fn close_open_leaf(
        &self,
        context: &ScenarioContext,
        timestamp: DateTime<FixedOffset>,
    ) -> Result<bool, ReporterError> {
        let Some((kind, handle)) = context.take_open_leaf()? else {
            return Ok(false);
        };
        warn!(
            uri = %context.uri(),
            line = context.line(),
            "{kind} still open when its scenario finished, closing it as interrupted",
        );
        self.backend
            .finish_item(handle, FinishItem::new(timestamp, Some(ItemStatus::Interrupted)));
        self.stats.record(Counter::Orphan);
        Ok(true)
    }

    fn report_fallback(
        &self,
        item: ItemUuid,
        outcome: &ResolvedOutcome,
        timestamp: DateTime<FixedOffset>,
    ) {
        if outcome.mapped {
            return;
        }
        self.stats.record(Counter::Unmapped);
        self.backend.log(
            item,
            LogEntry::new(timestamp, FALLBACK_LEVEL, outcome.fallback_message()),
        );
    }

    /// The item that side-channel output goes to: the open step or hook, else the scenario.
    fn output_target(&self, event: &'static str) -> Result<Option<ItemUuid>, ReporterError> {
        let Some(context) = self.current_scenario(event) else {
            return Ok(None);
        };
        match context.open_leaf()? {
            Some(leaf) => Ok(Some(leaf)),
            None => Ok(Some(context.handle().require(context.name())?)),
        }
    }

    fn attachment_emitted(
        &self,
        timestamp: DateTime<FixedOffset>,
        data: Bytes,
        mime_type: Option<String>,
        name: Option<String>,
    ) -> Result<(), ReporterError> {
        let Some(target) = self.output_target("attachment-emitted")? else {
            return Ok(());
        };
        let mime_type = mime_type.unwrap_or_else(|| DEFAULT_MIME_TYPE.to_owned());
        let name = name.unwrap_or_else(|| attachment_name(&mime_type));
        self.backend.attach(
            target,
            Attachment {
                time: timestamp,
                level: LogLevel::Unknown,
                name,
                mime_type,
                data,
            },
        );
        Ok(())
    }

    fn text_logged(
        &self,
        timestamp: DateTime<FixedOffset>,
        text: String,
    ) -> Result<(), ReporterError> {
        let Some(target) = self.output_target("text-logged")? else {
            return Ok(());
        };
        self.backend
            .log(target, LogEntry::new(timestamp, LogLevel::Info, text));
        Ok(())
    }
}
