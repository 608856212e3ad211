// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps engine outcomes to backend statuses and log levels.

use crate::events::StepOutcome;
use portal_model::{ItemStatus, LogLevel};
use tracing::error;

/// The status reported for outcomes with no mapping.
pub const FALLBACK_STATUS: ItemStatus = ItemStatus::Skipped;

/// The log level used for outcomes with no mapping.
pub const FALLBACK_LEVEL: LogLevel = LogLevel::Warn;

/// Returns the backend status for an engine outcome, or `None` if the outcome has no mapping.
pub fn item_status(outcome: StepOutcome) -> Option<ItemStatus> {
    match outcome {
        StepOutcome::Passed => Some(ItemStatus::Passed),
        StepOutcome::Failed => Some(ItemStatus::Failed),
        StepOutcome::Skipped
        | StepOutcome::Pending
        | StepOutcome::Ambiguous
        | StepOutcome::Unused => Some(ItemStatus::Skipped),
        StepOutcome::Undefined => None,
    }
}

/// Returns the log level for an engine outcome, or `None` if the outcome has no mapping.
pub fn log_level(outcome: StepOutcome) -> Option<LogLevel> {
    match outcome {
        StepOutcome::Passed => Some(LogLevel::Info),
        StepOutcome::Skipped => Some(LogLevel::Warn),
        StepOutcome::Pending
        | StepOutcome::Ambiguous
        | StepOutcome::Failed
        | StepOutcome::Unused => Some(LogLevel::Error),
        StepOutcome::Undefined => None,
    }
}

/// An engine outcome resolved to a backend status and log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedOutcome {
    /// The outcome as reported.
    pub outcome: StepOutcome,

    /// The backend status.
    pub status: ItemStatus,

    /// The log level for messages about this outcome.
    pub level: LogLevel,

    /// False if the fallbacks were used.
    pub mapped: bool,
}

impl ResolvedOutcome {
    /// Resolves an outcome, falling back to [`FALLBACK_STATUS`] and [`FALLBACK_LEVEL`].
    ///
    /// Every fallback is logged.
    pub fn resolve(outcome: StepOutcome) -> Self {
        match (item_status(outcome), log_level(outcome)) {
            (Some(status), Some(level)) => Self {
                outcome,
                status,
                level,
                mapped: true,
            },
            (status, level) => {
                error!(
                    %outcome,
                    fallback_status = %FALLBACK_STATUS,
                    "no status mapping for engine outcome, using fallback",
                );
                Self {
                    outcome,
                    status: status.unwrap_or(FALLBACK_STATUS),
                    level: level.unwrap_or(FALLBACK_LEVEL),
                    mapped: false,
                }
            }
        }
    }

    /// The diagnostic message sent to the backend when the fallbacks were used.
    pub fn fallback_message(&self) -> String {
        format!(
            "Unable to map step outcome `{}`, reporting as {}",
            self.outcome, self.status
        )
    }
}

/// Returns the more severe of two statuses.
///
/// Severity increases from passed to skipped to interrupted to failed.
pub fn worst_status(a: ItemStatus, b: ItemStatus) -> ItemStatus {
    if severity(b) > severity(a) { b } else { a }
}

fn severity(status: ItemStatus) -> u8 {
    match status {
        ItemStatus::Passed => 0,
        ItemStatus::Skipped => 1,
        ItemStatus::Interrupted => 2,
        ItemStatus::Failed => 3,
    }
}
