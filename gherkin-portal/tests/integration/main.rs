// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod callback;
mod concurrency;
mod fixtures;
mod structural;
