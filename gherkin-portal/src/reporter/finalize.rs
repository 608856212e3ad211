// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Closing the tree at the end of a run.
//!
//! The engine never says when a feature is done: scenarios of one feature may run on several
//! threads, interleaved with scenarios of other features. Features and their open rules are
//! therefore finished once, after the run, with the completion time of their last scenario.

use super::{ROOT_SUITE_NAME, imp::PortalReporter, stats::Counter};
use crate::{
    config::ReportingMode,
    errors::{ReporterError, StructuralError},
    registry::{FeatureContext, ScenarioContext},
};
use chrono::{DateTime, FixedOffset};
use portal_model::{FinishItem, FinishLaunch, ItemStatus};
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

impl PortalReporter {
    pub(super) fn finalize(&self, timestamp: DateTime<FixedOffset>) -> Result<(), ReporterError> {
        let launch = self.require_launch("run-finished")?;
        if self.finished.swap(true, Ordering::AcqRel) {
            return Err(StructuralError::RunAlreadyFinished {
                event: "run-finished",
            }
            .into());
        }

        debug!(
            features = self.features.len(),
            running = self.scenarios.len(),
            "finalizing run",
        );

        // Scenarios the engine never finished.
        self.locator.drain();
        for context in self.scenarios.drain() {
            self.close_orphan(&context, timestamp)?;
        }

        for feature in self.features.drain() {
            self.finish_feature(&feature, timestamp)?;
        }

        if self.mode == ReportingMode::Scenario {
            let root_suite = self.root_suite.require(ROOT_SUITE_NAME)?;
            self.backend
                .finish_item(root_suite, FinishItem::new(timestamp, None));
        }

        self.sources.clear();
        self.outlines.clear();
        self.backend.finish_launch(launch, FinishLaunch::new(timestamp));

        let stats = self.stats.snapshot();
        info!(
            %launch,
            features = stats.features,
            scenarios = stats.scenarios_started,
            orphans = stats.orphans_closed,
            dropped = stats.dropped_events,
            "launch finished",
        );
        Ok(())
    }

    fn close_orphan(
        &self,
        context: &ScenarioContext,
        timestamp: DateTime<FixedOffset>,
    ) -> Result<(), ReporterError> {
        warn!(
            uri = %context.uri(),
            line = context.line(),
            "scenario still running at the end of the run, closing it as interrupted",
        );
        self.close_open_leaf(context, timestamp)?;
        let handle = context.handle().require(context.name())?;
        self.backend
            .finish_item(handle, FinishItem::new(timestamp, Some(ItemStatus::Interrupted)));
        context.feature().record_completion(timestamp)?;
        if let Some(index) = &self.index {
            index.reap_steps(context.uri(), context.line());
        }
        self.stats.record(Counter::Orphan);
        Ok(())
    }

    fn finish_feature(
        &self,
        feature: &FeatureContext,
        run_finished: DateTime<FixedOffset>,
    ) -> Result<(), ReporterError> {
        let end_time = feature.last_completion()?.unwrap_or(run_finished);

        if let Some(rule) = feature.rules().take_open()? {
            let handle = rule.handle().require(rule.name())?;
            self.backend
                .finish_item(handle, FinishItem::new(end_time, None));
        }
        let handle = feature.handle().require(feature.name())?;
        self.backend
            .finish_item(handle, FinishItem::new(end_time, None));
        if let Some(index) = &self.index {
            index.reap_feature(feature.uri());
        }
        debug!(uri = %feature.uri(), %end_time, "feature finished");
        Ok(())
    }
}
