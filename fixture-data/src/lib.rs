// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feature documents, in the engine's JSON representation, along with what reporting them is
//! expected to produce.

pub mod features;
pub mod models;
