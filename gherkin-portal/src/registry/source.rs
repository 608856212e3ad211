// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::gherkin::{
    Background, FeatureChild, FeatureDocument, RuleChild, RuleDefinition, ScenarioDefinition,
    SourceUri,
};
use dashmap::DashMap;
use iddqd::{IdOrdItem, IdOrdMap, id_upcast};
use std::sync::Arc;
use tracing::debug;

/// Parsed source units, keyed by URI.
#[derive(Debug, Default)]
pub(crate) struct SourceRegistry {
    sources: DashMap<SourceUri, Arc<ParsedSource>>,
}

impl SourceRegistry {
    pub(crate) fn insert(&self, uri: SourceUri, document: Arc<FeatureDocument>) {
        let source = Arc::new(ParsedSource::new(uri.clone(), document));
        debug!(
            %uri,
            scenarios = source.locations.len(),
            "indexed source unit",
        );
        self.sources.insert(uri, source);
    }

    pub(crate) fn get(&self, uri: &SourceUri) -> Option<Arc<ParsedSource>> {
        self.sources.get(uri).map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn clear(&self) {
        self.sources.clear();
    }
}

/// A source unit along with an index from executable lines to the scenarios declared there.
#[derive(Debug)]
pub(crate) struct ParsedSource {
    uri: SourceUri,
    document: Arc<FeatureDocument>,
    locations: IdOrdMap<ScenarioLocation>,
}

impl ParsedSource {
    pub(crate) fn new(uri: SourceUri, document: Arc<FeatureDocument>) -> Self {
        let mut locations = IdOrdMap::new();
        for (feature_child, child) in document.children.iter().enumerate() {
            match child {
                FeatureChild::Background(_) => {}
                FeatureChild::Scenario(scenario) => {
                    index_scenario(&mut locations, scenario, feature_child, None);
                }
                FeatureChild::Rule(rule) => {
                    for (rule_child, child) in rule.children.iter().enumerate() {
                        if let RuleChild::Scenario(scenario) = child {
                            index_scenario(
                                &mut locations,
                                scenario,
                                feature_child,
                                Some(rule_child),
                            );
                        }
                    }
                }
            }
        }

        Self {
            uri,
            document,
            locations,
        }
    }

    pub(crate) fn uri(&self) -> &SourceUri {
        &self.uri
    }

    pub(crate) fn document(&self) -> &Arc<FeatureDocument> {
        &self.document
    }

    /// Resolves the scenario executed at `line`: either a scenario declaration or an example row
    /// of an outline.
    pub(crate) fn locate(&self, line: u32) -> Option<ResolvedScenario<'_>> {
        let location = self.locations.get(&line)?;
        let (rule, definition) = match (
            self.document.children.get(location.feature_child)?,
            location.rule_child,
        ) {
            (FeatureChild::Scenario(definition), None) => (None, definition),
            (FeatureChild::Rule(rule), Some(rule_child)) => match rule.children.get(rule_child)? {
                RuleChild::Scenario(definition) => (Some(rule), definition),
                RuleChild::Background(_) => return None,
            },
            _ => return None,
        };

        Some(ResolvedScenario {
            line,
            is_example_row: location.is_example_row,
            feature: &self.document,
            rule,
            definition,
        })
    }
}

/// A scenario resolved against its source unit.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ResolvedScenario<'a> {
    /// The executed line: the scenario line, or the example row line for outlines.
    pub(crate) line: u32,
    pub(crate) is_example_row: bool,
    pub(crate) feature: &'a FeatureDocument,
    pub(crate) rule: Option<&'a RuleDefinition>,
    pub(crate) definition: &'a ScenarioDefinition,
}

impl<'a> ResolvedScenario<'a> {
    /// Backgrounds in execution order: the feature's first, then the rule's.
    pub(crate) fn backgrounds(&self) -> impl Iterator<Item = &'a Background> + use<'a> {
        self.feature
            .background()
            .into_iter()
            .chain(self.rule.and_then(|rule| rule.background()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ScenarioLocation {
    line: u32,
    feature_child: usize,
    rule_child: Option<usize>,
    is_example_row: bool,
}

impl IdOrdItem for ScenarioLocation {
    type Key<'a> = u32;
    fn key(&self) -> Self::Key<'_> {
        self.line
    }
    id_upcast!();
}

fn index_scenario(
    locations: &mut IdOrdMap<ScenarioLocation>,
    scenario: &ScenarioDefinition,
    feature_child: usize,
    rule_child: Option<usize>,
) {
    let lines = if scenario.is_outline() {
        scenario
            .example_row_lines()
            .map(|line| (line, true))
            .collect::<Vec<_>>()
    } else {
        vec![(scenario.line, false)]
    };
    for (line, is_example_row) in lines {
        locations.insert_overwrite(ScenarioLocation {
            line,
            feature_child,
            rule_child,
            is_example_row,
        });
    }
}
