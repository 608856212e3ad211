// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The interface to a hierarchical reporting backend.
//!
//! A backend returns handles immediately. Delivering requests (HTTP, batching, retries) happens
//! behind this interface and failures there never surface to the reporter.

mod recording;

pub use recording::*;

use portal_model::{
    Attachment, FinishItem, FinishLaunch, ItemUuid, LaunchUuid, LogEntry, StartItem, StartLaunch,
};
use std::fmt;

/// A hierarchical reporting backend.
///
/// Implementations are shared by all engine worker threads.
pub trait ReportingBackend: Send + Sync + fmt::Debug {
    /// Starts a launch and returns its handle.
    fn start_launch(&self, request: StartLaunch) -> LaunchUuid;

    /// Finishes a launch.
    fn finish_launch(&self, launch: LaunchUuid, request: FinishLaunch);

    /// Starts an item under `parent`, or at the top level of the launch, and returns its handle.
    fn start_item(&self, launch: LaunchUuid, parent: Option<ItemUuid>, request: StartItem)
    -> ItemUuid;

    /// Finishes an item.
    fn finish_item(&self, item: ItemUuid, request: FinishItem);

    /// Attaches a text log entry to an item.
    fn log(&self, item: ItemUuid, entry: LogEntry);

    /// Attaches a file to an item.
    fn attach(&self, item: ItemUuid, attachment: Attachment);
}
