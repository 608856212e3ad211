// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Reports the runs of a Gherkin test engine to a hierarchical reporting backend.
//!
//! A test engine emits a flat stream of lifecycle events: a scenario started, a step finished, a
//! screenshot was attached. A reporting backend wants a tree of launches, features, rules,
//! scenarios, steps and hooks, each started and finished exactly once. This crate rebuilds the
//! tree from the event stream, across all of the engine's worker threads.
//!
//! The entry point is [`reporter::PortalReporter`]. Backends implement
//! [`backend::ReportingBackend`]; [`backend::RecordingBackend`] keeps every call in memory.

pub mod backend;
pub mod code_locator;
pub mod config;
pub mod errors;
pub mod events;
pub mod gherkin;
mod helpers;
pub mod item_index;
mod locator;
pub mod mapping;
mod registry;
pub mod reporter;
