// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::ReportingBackend;
use portal_model::{
    Attachment, FinishItem, FinishLaunch, ItemType, ItemUuid, LaunchUuid, LogEntry, StartItem,
    StartLaunch,
};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A call received by a [`RecordingBackend`].
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    /// A launch was started.
    StartLaunch {
        /// The handle returned.
        launch: LaunchUuid,
        /// The request.
        request: StartLaunch,
    },
    /// A launch was finished.
    FinishLaunch {
        /// The launch.
        launch: LaunchUuid,
        /// The request.
        request: FinishLaunch,
    },
    /// An item was started.
    StartItem {
        /// The handle returned.
        item: ItemUuid,
        /// The parent item, if any.
        parent: Option<ItemUuid>,
        /// The request.
        request: StartItem,
    },
    /// An item was finished.
    FinishItem {
        /// The item.
        item: ItemUuid,
        /// The request.
        request: FinishItem,
    },
    /// A log entry was attached.
    Log {
        /// The item.
        item: ItemUuid,
        /// The entry.
        entry: LogEntry,
    },
    /// A file was attached.
    Attach {
        /// The item.
        item: ItemUuid,
        /// The attachment.
        attachment: Attachment,
    },
}

/// An item started on a [`RecordingBackend`].
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedItem {
    /// The handle returned for the item.
    pub item: ItemUuid,
    /// The parent item, if any.
    pub parent: Option<ItemUuid>,
    /// The start request.
    pub request: StartItem,
}

/// An in-memory backend that records every call in order.
///
/// Handles are random v4 UUIDs. Useful for tests and for inspecting what a run would send.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<BackendCall>>,
}

impl RecordingBackend {
    /// Creates a new, empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all calls received so far.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().clone()
    }

    /// Returns every started item, in start order.
    pub fn started_items(&self) -> Vec<RecordedItem> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                BackendCall::StartItem {
                    item,
                    parent,
                    request,
                } => Some(RecordedItem {
                    item: *item,
                    parent: *parent,
                    request: request.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Returns the started items of the given type, in start order.
    pub fn started_of_type(&self, item_type: ItemType) -> Vec<RecordedItem> {
        self.started_items()
            .into_iter()
            .filter(|item| item.request.item_type == item_type)
            .collect()
    }

    /// Returns the first started item with the given name.
    pub fn item_named(&self, name: &str) -> Option<RecordedItem> {
        self.started_items()
            .into_iter()
            .find(|item| item.request.name == name)
    }

    /// Returns the children of `parent`, in start order.
    pub fn children_of(&self, parent: ItemUuid) -> Vec<RecordedItem> {
        self.started_items()
            .into_iter()
            .filter(|item| item.parent == Some(parent))
            .collect()
    }

    /// Returns every finish request for `item`. A well-formed run finishes each item once.
    pub fn finishes_of(&self, item: ItemUuid) -> Vec<FinishItem> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                BackendCall::FinishItem { item: i, request } if *i == item => {
                    Some(request.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Returns the last finish request for `item`.
    pub fn finish_of(&self, item: ItemUuid) -> Option<FinishItem> {
        self.finishes_of(item).pop()
    }

    /// Returns the log entries attached to `item`.
    pub fn logs_of(&self, item: ItemUuid) -> Vec<LogEntry> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                BackendCall::Log { item: i, entry } if *i == item => Some(entry.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns every log entry, across all items.
    pub fn all_logs(&self) -> Vec<(ItemUuid, LogEntry)> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                BackendCall::Log { item, entry } => Some((*item, entry.clone())),
                _ => None,
            })
            .collect()
    }

    /// Returns the attachments attached to `item`.
    pub fn attachments_of(&self, item: ItemUuid) -> Vec<Attachment> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                BackendCall::Attach { item: i, attachment } if *i == item => {
                    Some(attachment.clone())
                }
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BackendCall>> {
        // A panic while recording cannot leave the vector half-written.
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: BackendCall) {
        self.lock().push(call);
    }
}

impl ReportingBackend for RecordingBackend {
    fn start_launch(&self, request: StartLaunch) -> LaunchUuid {
        let launch = LaunchUuid::new_v4();
        self.record(BackendCall::StartLaunch { launch, request });
        launch
    }

    fn finish_launch(&self, launch: LaunchUuid, request: FinishLaunch) {
        self.record(BackendCall::FinishLaunch { launch, request });
    }

    fn start_item(
        &self,
        _launch: LaunchUuid,
        parent: Option<ItemUuid>,
        request: StartItem,
    ) -> ItemUuid {
        let item = ItemUuid::new_v4();
        self.record(BackendCall::StartItem {
            item,
            parent,
            request,
        });
        item
    }

    fn finish_item(&self, item: ItemUuid, request: FinishItem) {
        self.record(BackendCall::FinishItem { item, request });
    }

    fn log(&self, item: ItemUuid, entry: LogEntry) {
        self.record(BackendCall::Log { item, entry });
    }

    fn attach(&self, item: ItemUuid, attachment: Attachment) {
        self.record(BackendCall::Attach { item, attachment });
    }
}
