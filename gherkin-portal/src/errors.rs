// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by gherkin-portal.

pub use crate::registry::NodeLevel;

use crate::gherkin::SourceUri;
use camino::Utf8PathBuf;
use config::ConfigError;
use portal_model::AttributeParseError;
use std::fmt;
use thiserror::Error;

/// An error returned while handling an engine event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReporterError {
    /// The event broke the shape of the report tree.
    ///
    /// The reporter refuses all further events after returning this error.
    #[error("report tree invariant violated")]
    Structural(#[from] StructuralError),

    /// An earlier structural error left the reporter unusable.
    #[error("reporter is unusable after an earlier structural error")]
    Poisoned,
}

/// A violation of the report tree's invariants.
///
/// These indicate that the event stream does not describe a well-formed tree. Continuing would
/// corrupt the tree on the backend, so they are fatal to the run's reporting.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum StructuralError {
    /// An event that requires a launch arrived before the run started.
    #[error("{event} received before the run started")]
    RunNotStarted {
        /// The name of the event.
        event: &'static str,
    },

    /// The run was started twice.
    #[error("run started twice")]
    RunAlreadyStarted,

    /// An event was received after the run finished.
    #[error("{event} received after the run finished")]
    RunAlreadyFinished {
        /// The name of the event.
        event: &'static str,
    },

    /// A scenario referenced a source unit that was never parsed.
    #[error("scenario at {uri}:{line} references a source unit that was never parsed")]
    UnknownSource {
        /// The source URI.
        uri: SourceUri,
        /// The scenario line.
        line: u32,
    },

    /// A scenario's source unit no longer matches the document its feature was created from.
    ///
    /// This happens when a source unit is parsed again with different content after scenarios
    /// from it have started.
    #[error("scenario at {uri}:{line} comes from a different document than its feature")]
    SourceMismatch {
        /// The source URI.
        uri: SourceUri,
        /// The scenario line.
        line: u32,
    },

    /// No scenario or example row is declared at the given line.
    #[error("no scenario or example row declared at {uri}:{line}")]
    ScenarioNotFound {
        /// The source URI.
        uri: SourceUri,
        /// The line.
        line: u32,
    },

    /// A step line does not belong to the running scenario or its backgrounds.
    #[error("step at line {step_line} does not belong to scenario {uri}:{scenario_line}")]
    StepNotFound {
        /// The source URI.
        uri: SourceUri,
        /// The scenario line.
        scenario_line: u32,
        /// The step line.
        step_line: u32,
    },

    /// A backend handle was assigned twice.
    #[error("{level} `{name}` was assigned a backend handle twice")]
    HandleReassigned {
        /// The level of the node.
        level: NodeLevel,
        /// The display name of the node.
        name: String,
    },

    /// A node was finished before its backend handle was assigned.
    #[error("{level} `{name}` finished without a backend handle")]
    UnassignedHandle {
        /// The level of the node.
        level: NodeLevel,
        /// The display name of the node.
        name: String,
    },

    /// A step or hook started while another was still open in the same scenario.
    #[error("{started} started in scenario {uri}:{line} while a {open} is still open")]
    LeafOverlap {
        /// The source URI.
        uri: SourceUri,
        /// The scenario line.
        line: u32,
        /// The leaf that is open.
        open: LeafKind,
        /// The leaf that was started.
        started: LeafKind,
    },

    /// A step or hook finished while no leaf of that kind was open.
    #[error("{finished} finished in scenario {uri}:{line} but none is open")]
    LeafNotOpen {
        /// The source URI.
        uri: SourceUri,
        /// The scenario line.
        line: u32,
        /// The leaf that finished.
        finished: LeafKind,
    },

    /// A thread started a scenario while another scenario was still bound to it.
    #[error(
        "thread {thread} started scenario {new_uri}:{new_line} \
         while scenario {bound_uri}:{bound_line} is still running on it"
    )]
    ThreadAlreadyBound {
        /// A description of the thread.
        thread: String,
        /// The URI of the scenario bound to the thread.
        bound_uri: SourceUri,
        /// The line of the scenario bound to the thread.
        bound_line: u32,
        /// The URI of the scenario that was started.
        new_uri: SourceUri,
        /// The line of the scenario that was started.
        new_line: u32,
    },

    /// Two different rule definitions claimed the same identity.
    #[error(
        "rule `{new_name}` at {uri}:{line} conflicts with the open rule `{open_name}` \
         declared at the same location"
    )]
    RuleIdentityConflict {
        /// The source URI.
        uri: SourceUri,
        /// The declaration line.
        line: u32,
        /// The name of the rule that is open.
        open_name: String,
        /// The name of the rule that claimed the same identity.
        new_name: String,
    },
}

/// The kind of leaf item open under a scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafKind {
    /// A step.
    Step,
    /// A hook.
    Hook,
}

impl fmt::Display for LeafKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step => f.write_str("step"),
            Self::Hook => f.write_str("hook"),
        }
    }
}

/// An error that occurred while loading the reporter configuration.
#[derive(Debug, Error)]
#[error("failed to parse reporter config{}", .config_file.as_ref().map(|path| format!(" at `{path}`")).unwrap_or_default())]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Option<Utf8PathBuf>,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self { config_file, kind }
    }

    /// Returns the config file that failed to parse, if one was specified.
    pub fn config_file(&self) -> Option<&Utf8PathBuf> {
        self.config_file.as_ref()
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while loading the configuration.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config from its sources.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// A launch attribute could not be parsed.
    #[error("invalid launch attribute")]
    InvalidAttribute(#[source] AttributeParseError),
}
