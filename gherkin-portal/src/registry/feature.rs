// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{HandleCell, NodeLevel, ParsedSource, RuleSequencer};
use crate::{
    errors::ReporterError,
    gherkin::{FeatureDocument, SourceUri},
};
use chrono::{DateTime, FixedOffset};
use dashmap::DashMap;
use portal_model::ItemUuid;
use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
};
use tracing::debug;

/// Per-run state for a single source unit.
#[derive(Debug)]
pub(crate) struct FeatureContext {
    uri: SourceUri,
    document: Arc<FeatureDocument>,
    name: String,
    tags: BTreeSet<String>,
    handle: HandleCell,
    rules: RuleSequencer,
    last_completion: Mutex<Option<DateTime<FixedOffset>>>,
}

impl FeatureContext {
    pub(crate) fn new(
        uri: SourceUri,
        document: Arc<FeatureDocument>,
        name: String,
        tags: BTreeSet<String>,
    ) -> Self {
        Self {
            uri,
            document,
            name,
            tags,
            handle: HandleCell::new(NodeLevel::Feature),
            rules: RuleSequencer::default(),
            last_completion: Mutex::new(None),
        }
    }

    pub(crate) fn uri(&self) -> &SourceUri {
        &self.uri
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if `source` is the document this feature's node was created from.
    ///
    /// A source unit parsed again with different content no longer matches.
    pub(crate) fn created_from(&self, source: &ParsedSource) -> bool {
        Arc::ptr_eq(&self.document, source.document()) || self.document == *source.document()
    }

    /// Tags declared on the feature itself. Scenarios inherit these.
    pub(crate) fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub(crate) fn handle(&self) -> &HandleCell {
        &self.handle
    }

    pub(crate) fn rules(&self) -> &RuleSequencer {
        &self.rules
    }

    /// Records a scenario end time, keeping the latest seen.
    pub(crate) fn record_completion(
        &self,
        end_time: DateTime<FixedOffset>,
    ) -> Result<(), ReporterError> {
        let mut last = self
            .last_completion
            .lock()
            .map_err(|_| ReporterError::Poisoned)?;
        if last.is_none_or(|last| end_time > last) {
            *last = Some(end_time);
        }
        Ok(())
    }

    /// The latest end time among the scenarios of this feature, if any finished.
    pub(crate) fn last_completion(&self) -> Result<Option<DateTime<FixedOffset>>, ReporterError> {
        Ok(*self
            .last_completion
            .lock()
            .map_err(|_| ReporterError::Poisoned)?)
    }
}

/// Feature contexts keyed by source URI.
#[derive(Debug, Default)]
pub(crate) struct FeatureRegistry {
    features: DashMap<SourceUri, Arc<FeatureContext>>,
}

impl FeatureRegistry {
    /// Returns the context for `uri`, creating the context and its backend node if needed.
    ///
    /// `create` runs exactly once per URI, even if several scenarios of the same feature start
    /// concurrently. Callers only get the handle after `create` has returned.
    pub(crate) fn get_or_create(
        &self,
        uri: &SourceUri,
        make_context: impl FnOnce() -> FeatureContext,
        create: impl FnOnce(&FeatureContext) -> ItemUuid,
    ) -> (Arc<FeatureContext>, ItemUuid) {
        // The map guard must be released before the backend call so other features can proceed.
        let context = Arc::clone(
            self.features
                .entry(uri.clone())
                .or_insert_with(|| Arc::new(make_context()))
                .value(),
        );
        let handle = context.handle.get_or_init(|| {
            debug!(%uri, "creating feature");
            create(&context)
        });
        (context, handle)
    }

    /// Removes and returns every tracked feature, ordered by URI.
    pub(crate) fn drain(&self) -> Vec<Arc<FeatureContext>> {
        let mut uris: Vec<_> = self.features.iter().map(|e| e.key().clone()).collect();
        uris.sort_unstable();
        uris.into_iter()
            .filter_map(|uri| self.features.remove(&uri).map(|(_, context)| context))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.features.len()
    }
}
