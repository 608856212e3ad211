// Copyright (c) The gherkin-portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::elements::{DeserializedLaunchConfig, LaunchConfig, ReporterSettings};
use crate::errors::{ConfigParseError, ConfigParseErrorKind};
use camino::Utf8Path;
use config::{
    Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, builder::DefaultState,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Resolved reporter configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortalConfig {
    /// The `[reporter]` section.
    pub reporter: ReporterSettings,

    /// The `[launch]` section.
    pub launch: LaunchConfig,
}

impl PortalConfig {
    /// Contains the default config as a TOML file.
    ///
    /// User configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// Environment configuration uses this prefix, plus a _.
    pub const ENVIRONMENT_PREFIX: &'static str = "GHERKIN_PORTAL";

    /// Returns the built-in defaults, ignoring the environment.
    pub fn default_config() -> Self {
        let (config, ignored) = Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("embedded default config should be valid");
        // The default config ships with this crate, so unknown keys there are a bug.
        if !ignored.is_empty() {
            panic!(
                "found unknown keys in default config: {}",
                ignored.into_iter().collect::<Vec<_>>().join(", ")
            );
        }
        config
            .compile()
            .expect("embedded default launch attributes should parse")
    }

    /// Reads the config from the defaults, the given file if any, and the environment.
    ///
    /// A missing file is not an error. Unknown keys are logged as warnings.
    pub fn from_sources(config_file: Option<&Utf8Path>) -> Result<Self, ConfigParseError> {
        Self::from_sources_with_warnings(config_file, &mut DefaultConfigWarnings)
    }

    /// Reads the config like [`Self::from_sources`], reporting unknown keys to `warnings`.
    pub fn from_sources_with_warnings(
        config_file: Option<&Utf8Path>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let mut builder = Self::make_default_config();
        if let Some(config_file) = config_file {
            debug!("reporter config: layering {config_file}");
            builder = builder
                .add_source(File::new(config_file.as_str(), FileFormat::Toml).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix(Self::ENVIRONMENT_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("launch.attributes")
                .try_parsing(true),
        );

        let config_file_owned = config_file.map(ToOwned::to_owned);
        let (config, ignored) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(config_file_owned.clone(), kind))?;
        if !ignored.is_empty() {
            warnings.unknown_config_keys(config_file, &ignored);
        }

        config.compile().map_err(|error| {
            ConfigParseError::new(
                config_file_owned,
                ConfigParseErrorKind::InvalidAttribute(error),
            )
        })
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(PortalConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: PortalConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // serde_path_to_error already reports the key, so drop it from the config error.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

/// Handles warnings produced while loading the config.
pub trait ConfigWarnings {
    /// Called with the keys that were present in the config but not recognized.
    ///
    /// `config_file` is `None` if the keys came from the environment.
    fn unknown_config_keys(&mut self, config_file: Option<&Utf8Path>, unknown: &BTreeSet<String>);
}

/// Logs config warnings through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: Option<&Utf8Path>, unknown: &BTreeSet<String>) {
        let mut unknown_str = String::new();
        if unknown.len() == 1 {
            // Print this on the same line.
            unknown_str.push_str("key: ");
            unknown_str.extend(unknown.iter().map(String::as_str));
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push_str("\n  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        match config_file {
            Some(config_file) => warn!(
                "in reporter config file {config_file}, ignoring unknown configuration {unknown_str}"
            ),
            None => warn!("in reporter config, ignoring unknown configuration {unknown_str}"),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PortalConfigDeserialize {
    reporter: ReporterSettings,
    launch: DeserializedLaunchConfig,
}

impl PortalConfigDeserialize {
    fn compile(self) -> Result<PortalConfig, portal_model::AttributeParseError> {
        Ok(PortalConfig {
            reporter: self.reporter,
            launch: self.launch.compile()?,
        })
    }
}
