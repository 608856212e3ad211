// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity of a log entry sent to the backend.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// An error.
    Error,
    /// A warning.
    Warn,
    /// Informational output.
    Info,
    /// Debug output.
    Debug,
    /// Trace output.
    Trace,
    /// The level could not be determined.
    Unknown,
}

impl LogLevel {
    /// Returns the string representation used by backends.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A text log entry attached to an item.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The time the entry was produced.
    pub time: DateTime<FixedOffset>,

    /// The severity.
    pub level: LogLevel,

    /// The message text.
    pub message: String,
}

impl LogEntry {
    /// Creates a new log entry.
    pub fn new(time: DateTime<FixedOffset>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            time,
            level,
            message: message.into(),
        }
    }
}

/// A binary attachment, such as a screenshot, attached to an item.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// The time the attachment was produced.
    pub time: DateTime<FixedOffset>,

    /// The severity the attachment is logged at.
    pub level: LogLevel,

    /// The display name of the attachment.
    pub name: String,

    /// The MIME type of the data.
    pub mime_type: String,

    /// The raw data.
    pub data: Bytes,
}

/// The MIME type used when the producer of an attachment did not supply one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
