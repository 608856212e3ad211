// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// An error that occurs while parsing an [`ItemAttribute`](crate::ItemAttribute) from a string.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttributeParseError {
    /// The input was empty.
    #[error("attribute must not be empty")]
    Empty,

    /// The input had a key but no value, e.g. `"key:"`.
    #[error("attribute `{input}` has a key but no value")]
    MissingValue {
        /// The input provided.
        input: String,
    },
}
