// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Data model for hierarchical test reporting backends.
//!
//! A reporting backend models a test run as a tree: a launch contains items, and items contain
//! other items. Every item is created with a [`StartItem`] request, which returns an opaque
//! [`ItemUuid`] handle, and is closed with a [`FinishItem`] request. Logs and file attachments
//! can be attached to any item through its handle.
//!
//! This crate only defines the data exchanged with a backend. The transport (HTTP, batching,
//! retries) is the backend's concern.

mod errors;
mod item;
mod launch;
mod log;

pub use errors::*;
pub use item::*;
pub use launch::*;
pub use log::*;
