// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ExpectedError, LogFinishError, Result},
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use goldcheck_runner::{
    config::VerifyConfig,
    reporter::EventLogger,
    run_log::{ClosedRunLog, RunLog},
    runner::VerifyRunner,
    workspace::prepare_workspace,
};
use std::{ffi::OsString, io::Write};
use tracing::debug;

/// Runs a partitioned simulation, merges its output and compares it against a gold file.
///
/// The test is described by `goldcheck.toml` in the current directory. All tool output goes to
/// `<name>.log` in the test's working directory. The exit status is 0 if every stage passed, and
/// otherwise the status of the first stage that failed.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct GoldcheckApp {
    #[clap(flatten)]
    output: OutputOpts,
}

impl GoldcheckApp {
    /// Parses the process's command-line arguments, exiting on error.
    pub fn parse_from_env() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Initializes logging and returns the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the run from the current directory, returning the exit code.
    pub fn exec(&self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let harness_dir = current_dir()?;
        self.exec_in(&harness_dir, output, output_writer)
    }

    pub(crate) fn exec_in(
        &self,
        harness_dir: &Utf8Path,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let config_file = harness_dir.join(VerifyConfig::CONFIG_FILE_NAME);
        let config = VerifyConfig::from_file(harness_dir, &config_file)?;
        let test_case = config.test_case();

        let workspace = prepare_workspace(test_case)?;
        let log = RunLog::create(workspace.log_file()).map_err(ExpectedError::run_log_create_error)?;

        let mut logger = EventLogger::new();
        let result = VerifyRunner::new(test_case, &workspace)
            .timeout(config.timeout())
            .execute(&log, |event| logger.report_event(event));
        logger.report_result(&result);

        if let Err(err) = finish_log(log, output.verbose, output_writer) {
            err.display_to_stderr();
        }

        Ok(result.aggregate_status())
    }
}

/// Rewrites the single-dash `-verbose` spelling into `--verbose`.
///
/// Only exact matches are rewritten. Everything else is passed through for clap to judge.
pub fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| {
            if arg == "-verbose" {
                OsString::from("--verbose")
            } else {
                arg
            }
        })
        .collect()
}

fn current_dir() -> Result<Utf8PathBuf> {
    let dir = std::env::current_dir().map_err(|err| ExpectedError::CurrentDirFailed { err })?;
    Utf8PathBuf::try_from(dir).map_err(|err| ExpectedError::CurrentDirInvalidUtf8 { err })
}

fn finish_log(
    log: RunLog,
    verbose: bool,
    output_writer: &mut OutputWriter,
) -> Result<(), LogFinishError> {
    let closed = log.close().map_err(LogFinishError::run_log)?;
    if verbose {
        dump_log(&closed, output_writer)?;
    }
    Ok(())
}

fn dump_log(log: &ClosedRunLog, output_writer: &mut OutputWriter) -> Result<(), LogFinishError> {
    let contents = log.read_contents().map_err(LogFinishError::run_log)?;
    debug!("writing {} bytes from {} to stdout", contents.len(), log.path());

    let mut writer = output_writer.stdout_writer();
    writer
        .write_all(&contents)
        .map_err(LogFinishError::write_output)?;
    writer.flush().map_err(LogFinishError::write_output)
}
