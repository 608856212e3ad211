// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns engine events into calls against a reporting backend.
//!
//! The main structure in this module is [`PortalReporter`]. It is shared by every engine worker
//! thread, and each event is handed to [`PortalReporter::handle_event`] on the thread that
//! produced it.
//!
//! The backend tree looks like:
//!
//! ```text
//! launch
//! └── (root suite, in scenario mode)
//!     └── feature
//!         └── (rule)
//!             └── scenario
//!                 └── step or hook
//! ```

mod finalize;
mod imp;
mod stats;

pub use imp::*;
pub use stats::*;
