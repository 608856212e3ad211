// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::atomic::{AtomicUsize, Ordering};

/// Statistics for a reported run.
///
/// Returned by [`PortalReporter::stats`](super::PortalReporter::stats).
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct RunStats {
    /// The number of features reported.
    pub features: usize,

    /// The number of rule blocks opened. A rule interrupted by a scenario from another rule is
    /// counted again when it is reopened.
    pub rules: usize,

    /// The number of scenarios started, counting each outline row.
    pub scenarios_started: usize,

    /// The number of scenarios finished by the engine.
    ///
    /// Scenarios force-closed at the end of the run are counted in `orphans_closed` instead.
    pub scenarios_finished: usize,

    /// The number of steps started.
    pub steps: usize,

    /// The number of hooks started.
    pub hooks: usize,

    /// The number of steps, hooks and scenarios that were still open when their parent finished,
    /// and were closed as interrupted.
    pub orphans_closed: usize,

    /// The number of events dropped because no scenario was running on their thread.
    pub dropped_events: usize,

    /// The number of step, hook or scenario outcomes that had no status mapping.
    pub unmapped_outcomes: usize,
}

impl RunStats {
    /// Returns true if every started scenario was finished by the engine.
    pub fn is_complete(&self) -> bool {
        self.scenarios_started == self.scenarios_finished
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) enum Counter {
    Feature,
    Rule,
    ScenarioStarted,
    ScenarioFinished,
    Step,
    Hook,
    Orphan,
    Dropped,
    Unmapped,
}

/// Lock-free counters behind [`RunStats`].
#[derive(Debug, Default)]
pub(super) struct StatsCounter {
    features: AtomicUsize,
    rules: AtomicUsize,
    scenarios_started: AtomicUsize,
    scenarios_finished: AtomicUsize,
    steps: AtomicUsize,
    hooks: AtomicUsize,
    orphans_closed: AtomicUsize,
    dropped_events: AtomicUsize,
    unmapped_outcomes: AtomicUsize,
}

impl StatsCounter {
    pub(super) fn record(&self, counter: Counter) {
        let counter = match counter {
            Counter::Feature => &self.features,
            Counter::Rule => &self.rules,
            Counter::ScenarioStarted => &self.scenarios_started,
            Counter::ScenarioFinished => &self.scenarios_finished,
            Counter::Step => &self.steps,
            Counter::Hook => &self.hooks,
            Counter::Orphan => &self.orphans_closed,
            Counter::Dropped => &self.dropped_events,
            Counter::Unmapped => &self.unmapped_outcomes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn snapshot(&self) -> RunStats {
        let load = |counter: &AtomicUsize| counter.load(Ordering::Relaxed);
        RunStats {
            features: load(&self.features),
            rules: load(&self.rules),
            scenarios_started: load(&self.scenarios_started),
            scenarios_finished: load(&self.scenarios_finished),
            steps: load(&self.steps),
            hooks: load(&self.hooks),
            orphans_closed: load(&self.orphans_closed),
            dropped_events: load(&self.dropped_events),
            unmapped_outcomes: load(&self.unmapped_outcomes),
        }
    }
}
