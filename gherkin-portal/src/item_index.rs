// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Out-of-band access to reported items.
//!
//! With `callback-reporting` enabled, the reporter records the handle of every feature, scenario
//! and step it creates. Code outside the normal event flow, such as a step definition that learns
//! about a problem after the fact, can look a handle up and attach logs to the item or change its
//! status through a [`CallbackReporter`].
//!
//! Entries outlive their items for a short while so that just-closed items can still be
//! annotated:
//! * step entries are removed when their scenario finishes;
//! * scenario and feature entries are removed when the feature is finalized at the end of the
//!   run.

use crate::{backend::ReportingBackend, gherkin::SourceUri};
use chrono::{DateTime, FixedOffset};
use dashmap::DashMap;
use portal_model::{FinishItem, ItemStatus, ItemUuid, LaunchUuid, LogEntry, LogLevel};
use std::{fmt, sync::Arc};
use tracing::{debug, warn};

/// A key identifying an item in the [`ReportingItemIndex`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ItemKey {
    /// A feature, by source URI.
    Feature {
        /// The source URI.
        uri: SourceUri,
    },
    /// A scenario, by source URI and executed line.
    Scenario {
        /// The source URI.
        uri: SourceUri,
        /// The scenario line, or the example row line for outline iterations.
        line: u32,
    },
    /// A step, by its scenario and step text.
    ///
    /// If a scenario runs the same step text more than once, the key resolves to the most recent
    /// occurrence.
    Step {
        /// The source URI.
        uri: SourceUri,
        /// The line of the step's scenario.
        line: u32,
        /// The step text, as reported by the engine.
        text: String,
    },
}

impl ItemKey {
    /// Creates a feature key.
    pub fn feature(uri: impl Into<SourceUri>) -> Self {
        Self::Feature { uri: uri.into() }
    }

    /// Creates a scenario key.
    pub fn scenario(uri: impl Into<SourceUri>, line: u32) -> Self {
        Self::Scenario {
            uri: uri.into(),
            line,
        }
    }

    /// Creates a step key.
    pub fn step(uri: impl Into<SourceUri>, line: u32, text: impl Into<String>) -> Self {
        Self::Step {
            uri: uri.into(),
            line,
            text: text.into(),
        }
    }

    /// The key of the entry this one is reaped with.
    fn parent(&self) -> Option<ItemKey> {
        match self {
            Self::Feature { .. } => None,
            Self::Scenario { uri, .. } => Some(Self::feature(uri.clone())),
            Self::Step { uri, line, .. } => Some(Self::scenario(uri.clone(), *line)),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feature { uri } => write!(f, "{uri}"),
            Self::Scenario { uri, line } => write!(f, "{uri}:{line}"),
            Self::Step { uri, line, text } => write!(f, "{uri}:{line} `{text}`"),
        }
    }
}

/// Handles of reported items, for out-of-band lookups from any thread.
#[derive(Debug, Default)]
pub struct ReportingItemIndex {
    items: DashMap<ItemKey, ItemUuid>,
    // Keys filed under each feature and scenario entry.
    children: DashMap<ItemKey, Vec<ItemKey>>,
}

impl ReportingItemIndex {
    /// Looks up the handle for `key`.
    ///
    /// Returns `None` if the item was never reported or its entry has been reaped.
    pub fn lookup(&self, key: &ItemKey) -> Option<ItemUuid> {
        let handle = self.items.get(key).map(|entry| *entry.value());
        if handle.is_none() {
            debug!(%key, "item index miss");
        }
        handle
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Records `handle` for `key`, replacing the handle of an earlier item with the same key.
    pub(crate) fn insert(&self, key: ItemKey, handle: ItemUuid) {
        if self.items.insert(key.clone(), handle).is_some() {
            return;
        }
        if let Some(parent) = key.parent() {
            self.children.entry(parent).or_default().push(key);
        }
    }

    /// Removes the step entries of a finished scenario.
    pub(crate) fn reap_steps(&self, uri: &SourceUri, scenario_line: u32) {
        self.reap_children(&ItemKey::scenario(uri.clone(), scenario_line));
    }

    /// Removes every entry belonging to a finalized feature.
    pub(crate) fn reap_feature(&self, uri: &SourceUri) {
        let feature = ItemKey::feature(uri.clone());
        self.reap_children(&feature);
        self.items.remove(&feature);
    }

    fn reap_children(&self, parent: &ItemKey) {
        let Some((_, keys)) = self.children.remove(parent) else {
            return;
        };
        for key in keys {
            self.reap_children(&key);
            self.items.remove(&key);
        }
    }
}

/// Reports to items outside the normal event flow.
///
/// Obtained from [`PortalReporter::callback_reporter`](crate::reporter::PortalReporter::callback_reporter).
#[derive(Clone, Debug)]
pub struct CallbackReporter {
    launch: LaunchUuid,
    index: Arc<ReportingItemIndex>,
    backend: Arc<dyn ReportingBackend>,
}

impl CallbackReporter {
    pub(crate) fn new(
        launch: LaunchUuid,
        index: Arc<ReportingItemIndex>,
        backend: Arc<dyn ReportingBackend>,
    ) -> Self {
        Self {
            launch,
            index,
            backend,
        }
    }

    /// The launch the items belong to.
    pub fn launch(&self) -> LaunchUuid {
        self.launch
    }

    /// Looks up an item's handle.
    pub fn lookup(&self, key: &ItemKey) -> Option<ItemUuid> {
        self.index.lookup(key)
    }

    /// Finishes an item again with a new status, overriding the one it was finished with.
    pub fn finish_item(&self, item: ItemUuid, status: ItemStatus, end_time: DateTime<FixedOffset>) {
        debug!(%item, %status, "callback finish");
        self.backend
            .finish_item(item, FinishItem::new(end_time, Some(status)));
    }

    /// Attaches a log entry to an item.
    pub fn send_log(
        &self,
        item: ItemUuid,
        level: LogLevel,
        message: impl Into<String>,
        time: DateTime<FixedOffset>,
    ) {
        self.backend.log(item, LogEntry::new(time, level, message));
    }

    /// Looks up `key` and attaches a log entry to it.
    ///
    /// Returns false, and logs a warning, if the key is not in the index.
    pub fn send_log_to(
        &self,
        key: &ItemKey,
        level: LogLevel,
        message: impl Into<String>,
        time: DateTime<FixedOffset>,
    ) -> bool {
        match self.lookup(key) {
            Some(item) => {
                self.send_log(item, level, message, time);
                true
            }
            None => {
                warn!(%key, "dropping callback log for unknown item");
                false
            }
        }
    }
}
