// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The feature files used by the integration tests.

use crate::models::{FeatureFixture, ScenarioFixture, StepFixture};
use iddqd::{IdOrdMap, id_ord_map};
use std::sync::LazyLock;

/// A feature with a background and two scenarios.
///
/// ```gherkin
/// @auth
/// Feature: Login
///
///   Background:
///     Given a registered user
///
///   @smoke
///   Scenario: Successful login
///     When the user logs in
///     Then the dashboard is shown
///
///   Scenario: Wrong password
///     When the user logs in with a wrong password
///     Then an error is shown
/// ```
pub const LOGIN_URI: &str = "features/login.feature";

/// A feature with two rules, the second of which has its own background.
///
/// ```gherkin
/// Feature: Accounts
///
///   Rule: Admins
///
///     Scenario: Admin deletes user
///       Given an admin
///       When they delete a user
///
///     Scenario: Admin lists users
///       Given an admin
///
///   Rule: Guests
///     Background:
///       Given a guest session
///
///     Scenario: Guest browses
///       When they open the catalog
/// ```
pub const ACCOUNTS_URI: &str = "features/accounts.feature";

/// A scenario outline with three example rows.
///
/// ```gherkin
/// Feature: Eating
///
///   Scenario Outline: Eating cucumbers
///     Given there are <start> cucumbers
///     When I eat <eat> cucumbers
///
///     Examples:
///       | start | eat |
///       | 12    | 5   |
///       | 20    | 5   |
///       | 7     | 7   |
/// ```
pub const EATING_URI: &str = "features/eating.feature";

const LOGIN_DOCUMENT: &str = r#"{
    "keyword": "Feature",
    "name": "Login",
    "line": 2,
    "tags": ["@auth"],
    "children": [
        {"background": {
            "keyword": "Background",
            "line": 4,
            "steps": [{"keyword": "Given ", "text": "a registered user", "line": 5}]
        }},
        {"scenario": {
            "keyword": "Scenario",
            "name": "Successful login",
            "line": 8,
            "tags": ["@smoke"],
            "steps": [
                {"keyword": "When ", "text": "the user logs in", "line": 9},
                {"keyword": "Then ", "text": "the dashboard is shown", "line": 10}
            ]
        }},
        {"scenario": {
            "keyword": "Scenario",
            "name": "Wrong password",
            "line": 12,
            "steps": [
                {"keyword": "When ", "text": "the user logs in with a wrong password", "line": 13},
                {"keyword": "Then ", "text": "an error is shown", "line": 14}
            ]
        }}
    ]
}"#;

const ACCOUNTS_DOCUMENT: &str = r#"{
    "keyword": "Feature",
    "name": "Accounts",
    "line": 1,
    "children": [
        {"rule": {
            "keyword": "Rule",
            "name": "Admins",
            "line": 3,
            "children": [
                {"scenario": {
                    "keyword": "Scenario",
                    "name": "Admin deletes user",
                    "line": 5,
                    "steps": [
                        {"keyword": "Given ", "text": "an admin", "line": 6},
                        {"keyword": "When ", "text": "they delete a user", "line": 7}
                    ]
                }},
                {"scenario": {
                    "keyword": "Scenario",
                    "name": "Admin lists users",
                    "line": 9,
                    "steps": [{"keyword": "Given ", "text": "an admin", "line": 10}]
                }}
            ]
        }},
        {"rule": {
            "keyword": "Rule",
            "name": "Guests",
            "line": 12,
            "children": [
                {"background": {
                    "keyword": "Background",
                    "line": 13,
                    "steps": [{"keyword": "Given ", "text": "a guest session", "line": 14}]
                }},
                {"scenario": {
                    "keyword": "Scenario",
                    "name": "Guest browses",
                    "line": 16,
                    "steps": [{"keyword": "When ", "text": "they open the catalog", "line": 17}]
                }}
            ]
        }}
    ]
}"#;

const EATING_DOCUMENT: &str = r#"{
    "keyword": "Feature",
    "name": "Eating",
    "line": 1,
    "children": [
        {"scenario": {
            "keyword": "Scenario Outline",
            "name": "Eating cucumbers",
            "line": 3,
            "steps": [
                {"keyword": "Given ", "text": "there are <start> cucumbers", "line": 4},
                {"keyword": "When ", "text": "I eat <eat> cucumbers", "line": 5}
            ],
            "examples": [{
                "keyword": "Examples",
                "line": 7,
                "header": {"line": 8, "cells": ["start", "eat"]},
                "rows": [
                    {"line": 9, "cells": ["12", "5"]},
                    {"line": 10, "cells": ["20", "5"]},
                    {"line": 11, "cells": ["7", "7"]}
                ]
            }]
        }}
    ]
}"#;

/// Every fixture feature, keyed by URI.
pub static EXPECTED_FEATURES: LazyLock<IdOrdMap<FeatureFixture>> = LazyLock::new(|| {
    id_ord_map! {
        FeatureFixture {
            uri: LOGIN_URI,
            document: LOGIN_DOCUMENT,
            expected_name: "Feature: Login",
            scenarios: vec![
                ScenarioFixture {
                    line: 8,
                    name: "Successful login",
                    expected_name: "Scenario: Successful login",
                    rule: None,
                    tags: vec!["@auth", "@smoke"],
                    steps: vec![
                        StepFixture::new(5, "a registered user", "BACKGROUND: Given a registered user"),
                        StepFixture::new(9, "the user logs in", "When the user logs in"),
                        StepFixture::new(10, "the dashboard is shown", "Then the dashboard is shown"),
                    ],
                },
                ScenarioFixture {
                    line: 12,
                    name: "Wrong password",
                    expected_name: "Scenario: Wrong password",
                    rule: None,
                    tags: vec!["@auth"],
                    steps: vec![
                        StepFixture::new(5, "a registered user", "BACKGROUND: Given a registered user"),
                        StepFixture::new(
                            13,
                            "the user logs in with a wrong password",
                            "When the user logs in with a wrong password",
                        ),
                        StepFixture::new(14, "an error is shown", "Then an error is shown"),
                    ],
                },
            ],
        },
        FeatureFixture {
            uri: ACCOUNTS_URI,
            document: ACCOUNTS_DOCUMENT,
            expected_name: "Feature: Accounts",
            scenarios: vec![
                ScenarioFixture {
                    line: 5,
                    name: "Admin deletes user",
                    expected_name: "Scenario: Admin deletes user",
                    rule: Some("Rule: Admins"),
                    tags: Vec::new(),
                    steps: vec![
                        StepFixture::new(6, "an admin", "Given an admin"),
                        StepFixture::new(7, "they delete a user", "When they delete a user"),
                    ],
                },
                ScenarioFixture {
                    line: 9,
                    name: "Admin lists users",
                    expected_name: "Scenario: Admin lists users",
                    rule: Some("Rule: Admins"),
                    tags: Vec::new(),
                    steps: vec![StepFixture::new(10, "an admin", "Given an admin")],
                },
                ScenarioFixture {
                    line: 16,
                    name: "Guest browses",
                    expected_name: "Scenario: Guest browses",
                    rule: Some("Rule: Guests"),
                    tags: Vec::new(),
                    steps: vec![
                        StepFixture::new(14, "a guest session", "BACKGROUND: Given a guest session"),
                        StepFixture::new(17, "they open the catalog", "When they open the catalog"),
                    ],
                },
            ],
        },
        FeatureFixture {
            uri: EATING_URI,
            document: EATING_DOCUMENT,
            expected_name: "Feature: Eating",
            scenarios: vec![
                ScenarioFixture {
                    line: 9,
                    name: "Eating cucumbers",
                    expected_name: "Scenario Outline: Eating cucumbers [1]",
                    rule: None,
                    tags: Vec::new(),
                    steps: vec![
                        StepFixture::new(4, "there are 12 cucumbers", "Given there are 12 cucumbers"),
                        StepFixture::new(5, "I eat 5 cucumbers", "When I eat 5 cucumbers"),
                    ],
                },
                ScenarioFixture {
                    line: 10,
                    name: "Eating cucumbers",
                    expected_name: "Scenario Outline: Eating cucumbers [2]",
                    rule: None,
                    tags: Vec::new(),
                    steps: vec![
                        StepFixture::new(4, "there are 20 cucumbers", "Given there are 20 cucumbers"),
                        StepFixture::new(5, "I eat 5 cucumbers", "When I eat 5 cucumbers"),
                    ],
                },
                ScenarioFixture {
                    line: 11,
                    name: "Eating cucumbers",
                    expected_name: "Scenario Outline: Eating cucumbers [3]",
                    rule: None,
                    tags: Vec::new(),
                    steps: vec![
                        StepFixture::new(4, "there are 7 cucumbers", "Given there are 7 cucumbers"),
                        StepFixture::new(5, "I eat 7 cucumbers", "When I eat 7 cucumbers"),
                    ],
                },
            ],
        },
    }
});

/// Returns the fixture for `uri`.
///
/// # Panics
///
/// Panics if there is no such fixture.
pub fn feature(uri: &str) -> &'static FeatureFixture {
    EXPECTED_FEATURES
        .iter()
        .find(|feature| feature.uri == uri)
        .unwrap_or_else(|| panic!("no fixture feature at {uri}"))
}
