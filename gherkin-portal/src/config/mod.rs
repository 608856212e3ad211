// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the reporter.
//!
//! Settings are resolved in the following order (highest priority first):
//!
//! 1. Environment variables, e.g. `GHERKIN_PORTAL_LAUNCH__NAME`. Nested keys are separated by
//!    `__`, and `GHERKIN_PORTAL_LAUNCH__ATTRIBUTES` is a comma-separated list.
//! 2. The config file, if one is passed in.
//! 3. The built-in defaults, see `default-config.toml` in this crate.

mod elements;
mod imp;

pub use elements::*;
pub use imp::*;
