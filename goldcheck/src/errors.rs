// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::FromPathBufError;
use goldcheck_metadata::GoldcheckExitCode;
use goldcheck_runner::errors::{
    ConfigParseError, ConfigParseErrorKind, PrepareWorkspaceError, RunLogError,
};
use owo_colors::OwoColorize;
use std::{error::Error, io};
use thiserror::Error;
use tracing::{error, warn};

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that stopped goldcheck from producing a verdict.
///
/// A stage that runs and fails is not an `ExpectedError`: its status becomes the process's exit
/// status instead.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirFailed {
        #[source]
        err: io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 {
        #[source]
        err: FromPathBufError,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("failed to prepare working directory")]
    PrepareWorkspaceError {
        #[from]
        err: PrepareWorkspaceError,
    },
    #[error("failed to create run log")]
    RunLogCreateError {
        #[source]
        err: RunLogError,
    },
}

impl ExpectedError {
    pub(crate) fn run_log_create_error(err: RunLogError) -> Self {
        Self::RunLogCreateError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::PrepareWorkspaceError { .. }
            | Self::RunLogCreateError { .. } => GoldcheckExitCode::SETUP_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { err } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    err.as_path().display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => match err.kind() {
                ConfigParseErrorKind::DeserializeError(de_err) => {
                    error!(
                        "in config file `{}`, failed to parse `{}`",
                        err.config_file().style(styles.bold),
                        de_err.path().style(styles.bold),
                    );
                    Some(de_err.inner() as &dyn Error)
                }
                _ => {
                    error!(
                        "failed to read config file `{}`",
                        err.config_file().style(styles.bold)
                    );
                    err.source()
                }
            },
            Self::PrepareWorkspaceError { err } => match err {
                PrepareWorkspaceError::Directory(dir_err) => {
                    error!(
                        "working directory `{}` is not accessible, no stages were run",
                        dir_err.dir().style(styles.bold)
                    );
                    dir_err.source()
                }
                _ => {
                    error!("{err}");
                    err.source()
                }
            },
            Self::RunLogCreateError { err } => {
                error!("{err}");
                err.source()
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

/// A problem finishing up the run log after every stage has run.
///
/// The stages have already produced a verdict by this point, so these are printed as warnings and
/// the exit status stays that of the stages.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum LogFinishError {
    #[error("failed to finish run log")]
    RunLog {
        #[source]
        err: RunLogError,
    },
    #[error("failed to write run log to standard output")]
    WriteOutput {
        #[source]
        err: io::Error,
    },
}

impl LogFinishError {
    pub(crate) fn run_log(err: RunLogError) -> Self {
        Self::RunLog { err }
    }

    pub(crate) fn write_output(err: io::Error) -> Self {
        Self::WriteOutput { err }
    }

    /// Displays this error to stderr as a warning.
    pub fn display_to_stderr(&self) {
        let mut next_error = match self {
            Self::RunLog { err } => {
                warn!("{err}");
                err.source()
            }
            Self::WriteOutput { err } => {
                warn!("failed to write run log to standard output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            warn!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
