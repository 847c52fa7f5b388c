// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::ToolsConfig;
use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind},
    test_case::TestCase,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{collections::BTreeSet, num::NonZeroUsize, time::Duration};
use tracing::warn;

/// Trait for handling configuration warnings.
///
/// The default, [`DefaultConfigWarnings`], logs them. Tests collect them instead.
pub trait ConfigWarnings {
    /// Handle unknown configuration keys found in a config file.
    fn unknown_config_keys(
        &mut self,
        config_file: &Utf8Path,
        harness_dir: &Utf8Path,
        unknown: &BTreeSet<String>,
    );
}

/// Default implementation of [`ConfigWarnings`] that logs warnings using the tracing crate.
pub struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(
        &mut self,
        config_file: &Utf8Path,
        harness_dir: &Utf8Path,
        unknown: &BTreeSet<String>,
    ) {
        let mut unknown_str = String::new();
        if unknown.len() == 1 {
            // Print this on the same line.
            unknown_str.push_str("key: ");
            unknown_str.extend(unknown.iter().map(String::as_str));
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push('\n');
                unknown_str.push_str("  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        warn!(
            "in config file {}, ignoring unknown configuration {unknown_str}",
            config_file.strip_prefix(harness_dir).unwrap_or(config_file),
        )
    }
}

/// The configuration for a verification run, read from `goldcheck.toml`.
#[derive(Clone, Debug)]
pub struct VerifyConfig {
    harness_dir: Utf8PathBuf,
    config_file: Utf8PathBuf,
    tools: ToolsConfig,
    timeout: Option<Duration>,
    test_case: TestCase,
}

impl VerifyConfig {
    /// The name of the config file, looked up in the directory goldcheck is invoked from.
    pub const CONFIG_FILE_NAME: &'static str = "goldcheck.toml";

    /// Contains the default config as a TOML file.
    ///
    /// The authored config file is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// Reads the config from `config_file`.
    ///
    /// `harness_dir` is the directory goldcheck was invoked from. The test's working directory is
    /// relative to it.
    pub fn from_file(
        harness_dir: impl Into<Utf8PathBuf>,
        config_file: impl Into<Utf8PathBuf>,
    ) -> Result<Self, ConfigParseError> {
        Self::from_file_with_warnings(harness_dir, config_file, &mut DefaultConfigWarnings)
    }

    /// Reads the config from `config_file`, with custom warning handling.
    pub fn from_file_with_warnings(
        harness_dir: impl Into<Utf8PathBuf>,
        config_file: impl Into<Utf8PathBuf>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let config_file = config_file.into();
        let source = File::new(config_file.as_str(), FileFormat::Toml);
        Self::from_source(harness_dir.into(), config_file, source, warnings)
    }

    /// Parses a config from a string, as if it were read from `goldcheck.toml` in `harness_dir`.
    #[cfg(test)]
    pub(crate) fn from_str_for_test(
        harness_dir: impl Into<Utf8PathBuf>,
        contents: &str,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let harness_dir = harness_dir.into();
        let config_file = harness_dir.join(Self::CONFIG_FILE_NAME);
        let source = File::from_str(contents, FileFormat::Toml);
        Self::from_source(harness_dir, config_file, source, warnings)
    }

    /// Returns the directory goldcheck was invoked from.
    #[inline]
    pub fn harness_dir(&self) -> &Utf8Path {
        &self.harness_dir
    }

    /// Returns the config file this was read from.
    #[inline]
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the configured tools.
    #[inline]
    pub fn tools(&self) -> &ToolsConfig {
        &self.tools
    }

    /// Returns the per-stage timeout, if one is configured.
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the test case described by this config.
    #[inline]
    pub fn test_case(&self) -> &TestCase {
        &self.test_case
    }

    // ---
    // Helper methods
    // ---

    fn from_source<S>(
        harness_dir: Utf8PathBuf,
        config_file: Utf8PathBuf,
        source: S,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let builder = Self::make_default_config().add_source(source);
        let (deserialized, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        if !unknown.is_empty() {
            warnings.unknown_config_keys(&config_file, &harness_dir, &unknown);
        }

        let VerifyConfigDeserialize { test, tools } = deserialized;
        let mut case_builder = TestCase::builder(test.name, harness_dir.join(&test.dir));
        case_builder.partitions(test.partitions);
        tools.apply_to(&mut case_builder);
        let test_case = case_builder.build().map_err(|err| {
            ConfigParseError::new(&config_file, ConfigParseErrorKind::InvalidTestName(err))
        })?;

        Ok(Self {
            harness_dir,
            config_file,
            tools,
            timeout: test.timeout,
            test_case,
        })
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(VerifyConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: VerifyConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // serde_path_to_error already carries the key, so drop it from the config error.
                let path = error.path().clone();
                let config_error = error.into_inner();
                let error = match config_error {
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

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct VerifyConfigDeserialize {
    test: TestConfig,
    tools: ToolsConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TestConfig {
    name: String,
    dir: Utf8PathBuf,
    partitions: NonZeroUsize,
    #[serde(default, with = "humantime_serde::option")]
    timeout: Option<Duration>,
}
