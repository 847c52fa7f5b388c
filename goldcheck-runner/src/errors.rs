// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by goldcheck.

use camino::{Utf8Path, Utf8PathBuf};
use config::ConfigError;
use std::io;
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse goldcheck config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// The test name is not usable as a file name stem.
    #[error(transparent)]
    InvalidTestName(#[from] InvalidTestNameError),
}

/// The name of a test was invalid.
///
/// Every artifact goldcheck touches is named after the test, so the name must be a plain,
/// non-empty file name stem.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid test name `{name}`: {reason}")]
pub struct InvalidTestNameError {
    name: String,
    reason: &'static str,
}

impl InvalidTestNameError {
    pub(crate) fn new(name: impl Into<String>, reason: &'static str) -> Self {
        Self {
            name: name.into(),
            reason,
        }
    }

    /// Returns the name that was rejected.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The working directory of a test could not be entered.
#[derive(Debug, Error)]
#[error("working directory `{dir}` is not accessible")]
pub struct DirectoryError {
    dir: Utf8PathBuf,
    #[source]
    err: io::Error,
}

impl DirectoryError {
    pub(crate) fn new(dir: impl Into<Utf8PathBuf>, err: io::Error) -> Self {
        Self {
            dir: dir.into(),
            err,
        }
    }

    /// Returns the directory that could not be entered.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }
}

/// An error that occurred while preparing a test's working directory.
///
/// Any of these aborts the run before a single stage has started.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PrepareWorkspaceError {
    /// The working directory is missing or is not a directory.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The log file left behind by a previous run could not be removed.
    #[error("failed to remove previous log file `{path}`")]
    RemoveLog {
        /// The log file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// The working directory could not be listed.
    #[error("failed to read working directory `{dir}`")]
    ReadDir {
        /// The working directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// A stale output artifact could not be removed.
    #[error("failed to remove stale output `{path}`")]
    RemoveStale {
        /// The stale artifact.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },
}

/// A stage's command could not be run.
///
/// This is distinct from a command that ran and exited with a nonzero status: an
/// `ExecutionError` means the command never ran to completion under goldcheck's control.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecutionError {
    /// The run log could not be attached to the command's output streams.
    #[error("failed to attach the run log to `{command}`")]
    AttachLog {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// The command could not be started.
    #[error("failed to start `{command}`")]
    Spawn {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// Waiting for the command, or killing it after a timeout, failed.
    #[error("failed to wait for `{command}`")]
    Wait {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        err: io::Error,
    },
}

impl ExecutionError {
    /// Returns the command line that failed.
    pub fn command(&self) -> &str {
        match self {
            Self::AttachLog { command, .. }
            | Self::Spawn { command, .. }
            | Self::Wait { command, .. } => command,
        }
    }
}

/// An error that occurred while managing the run log.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunLogError {
    /// The log file could not be created.
    #[error("failed to create log file `{path}`")]
    Create {
        /// The log file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// A note could not be appended to the log file.
    #[error("failed to write to log file `{path}`")]
    Write {
        /// The log file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// The log file could not be flushed to disk on close.
    #[error("failed to close log file `{path}`")]
    Close {
        /// The log file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// The closed log file could not be read back.
    #[error("failed to read log file `{path}`")]
    Read {
        /// The log file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },
}
