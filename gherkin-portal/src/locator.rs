// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolves the scenario running on the calling thread.
//!
//! The engine delivers step, hook, attachment and text events without saying which scenario they
//! belong to. Since every worker thread runs at most one scenario at a time, the scenario is
//! recovered from the thread the event arrives on.
//!
//! Contract:
//! * [`ExecutionLocator::bind`] is called on scenario start, before any other event of that
//!   scenario is handled on the thread.
//! * A thread never has two live scenarios bound to it; a second bind is a structural error.
//! * [`ExecutionLocator::unbind`] is called on scenario finish. Events observed afterwards on the
//!   same thread find nothing and are reported as dropped.

use crate::{errors::StructuralError, registry::ScenarioContext};
use dashmap::{DashMap, mapref::entry::Entry};
use std::{
    sync::Arc,
    thread::{self, ThreadId},
};

#[derive(Debug, Default)]
pub(crate) struct ExecutionLocator {
    bound: DashMap<ThreadId, Arc<ScenarioContext>>,
}

impl ExecutionLocator {
    /// Returns the scenario bound to the calling thread.
    pub(crate) fn current(&self) -> Option<Arc<ScenarioContext>> {
        self.get(thread::current().id())
    }

    pub(crate) fn get(&self, thread: ThreadId) -> Option<Arc<ScenarioContext>> {
        self.bound.get(&thread).map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn bind(
        &self,
        thread: ThreadId,
        context: Arc<ScenarioContext>,
    ) -> Result<(), StructuralError> {
        match self.bound.entry(thread) {
            Entry::Occupied(entry) => {
                let bound = entry.get();
                Err(StructuralError::ThreadAlreadyBound {
                    thread: format!("{thread:?}"),
                    bound_uri: bound.uri().clone(),
                    bound_line: bound.line(),
                    new_uri: context.uri().clone(),
                    new_line: context.line(),
                })
            }
            Entry::Vacant(entry) => {
                entry.insert(context);
                Ok(())
            }
        }
    }

    pub(crate) fn unbind(&self, thread: ThreadId) -> Option<Arc<ScenarioContext>> {
        self.bound.remove(&thread).map(|(_, context)| context)
    }

    /// Unbinds every thread, returning the scenarios that were still bound.
    pub(crate) fn drain(&self) -> Vec<Arc<ScenarioContext>> {
        let threads: Vec<_> = self.bound.iter().map(|entry| *entry.key()).collect();
        threads
            .into_iter()
            .filter_map(|thread| self.unbind(thread))
            .collect()
    }
}
