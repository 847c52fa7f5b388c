// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The stage sequencer.
//!
//! [`VerifyRunner`] runs the simulate, merge and compare stages of a [`TestCase`] one after the
//! other. A failing stage never stops the run: later stages still execute so the log holds as much
//! diagnostic output as possible. The overall status is the status of the first stage that failed.

use crate::{
    errors::ExecutionError,
    reporter::RunEvent,
    run_log::RunLog,
    stage_command::ChildExit,
    test_case::{StageKind, StageSpec, TestCase},
    workspace::PreparedWorkspace,
};
use goldcheck_metadata::GoldcheckExitCode;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::warn;

/// Runs the stages of a test case against a prepared workspace.
#[derive(Debug)]
pub struct VerifyRunner<'a> {
    test_case: &'a TestCase,
    workspace: &'a PreparedWorkspace,
    timeout: Option<Duration>,
}

impl<'a> VerifyRunner<'a> {
    /// Creates a new runner. By default stages may run forever.
    pub fn new(test_case: &'a TestCase, workspace: &'a PreparedWorkspace) -> Self {
        Self {
            test_case,
            workspace,
            timeout: None,
        }
    }

    /// Sets a limit on how long each stage may run before it is killed.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs all three stages in order, writing their output to `log`.
    ///
    /// The callback is called before and after each stage.
    pub fn execute<F>(&self, log: &RunLog, mut callback: F) -> RunResult
    where
        F: FnMut(RunEvent<'_>),
    {
        let mut result = RunResult::new();

        for spec in self.test_case.stages() {
            callback(RunEvent::StageStarted {
                kind: spec.kind(),
                command: spec.command(),
            });

            let outcome = self.run_stage(spec, log);
            callback(RunEvent::StageFinished { outcome: &outcome });

            result.record(outcome);
        }

        result
    }

    fn run_stage(&self, spec: &StageSpec, log: &RunLog) -> StageOutcome {
        let kind = spec.kind();
        let start_time = Instant::now();

        let result = match spec.command().run(self.workspace.dir(), log, self.timeout) {
            Ok(ChildExit::Exited(code)) => StageResult::Exited { code },
            Ok(ChildExit::TimedOut(limit)) => {
                note_in_log(log, &format!("{kind} stage timed out after {limit:?}"));
                StageResult::TimedOut { limit }
            }
            Err(error) => {
                // Record the chain as well: "No such file or directory" is the useful part.
                let reason = match std::error::Error::source(&error) {
                    Some(source) => format!("{error}: {source}"),
                    None => error.to_string(),
                };
                note_in_log(log, &format!("{kind} stage did not run: {reason}"));
                StageResult::ExecFailed {
                    error: Arc::new(error),
                }
            }
        };

        StageOutcome {
            kind,
            result,
            time_taken: start_time.elapsed(),
        }
    }
}

fn note_in_log(log: &RunLog, note: &str) {
    if let Err(err) = log.write_note(note) {
        warn!("{err}");
    }
}

/// The outcome of a single stage.
#[derive(Clone, Debug)]
pub struct StageOutcome {
    /// The stage that ran.
    pub kind: StageKind,

    /// How the stage finished.
    pub result: StageResult,

    /// How long the stage took.
    pub time_taken: Duration,
}

impl StageOutcome {
    /// Returns the integer status recorded for this stage.
    #[inline]
    pub fn status(&self) -> i32 {
        self.result.status_code()
    }
}

/// How a stage finished.
#[derive(Clone, Debug)]
pub enum StageResult {
    /// The stage's command ran and exited with this status.
    Exited {
        /// The exit status, verbatim.
        code: i32,
    },

    /// The stage's command could not be run.
    ExecFailed {
        /// The error that prevented the command from running.
        error: Arc<ExecutionError>,
    },

    /// The stage's command was killed after exceeding the configured timeout.
    TimedOut {
        /// The timeout that was exceeded.
        limit: Duration,
    },
}

impl StageResult {
    /// Returns the integer status for this result.
    ///
    /// Exit statuses are passed through unchanged. Launch failures and timeouts have no status of
    /// their own, so they map to [`GoldcheckExitCode::STAGE_EXEC_FAILED`] and
    /// [`GoldcheckExitCode::STAGE_TIMED_OUT`].
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Exited { code } => *code,
            Self::ExecFailed { .. } => GoldcheckExitCode::STAGE_EXEC_FAILED,
            Self::TimedOut { .. } => GoldcheckExitCode::STAGE_TIMED_OUT,
        }
    }

    /// Returns true if the stage succeeded.
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited { code: 0 })
    }
}

/// The accumulated result of a run.
#[derive(Clone, Debug, Default)]
pub struct RunResult {
    // Invariant: the first nonzero status in `stages`, or 0 if there is none.
    aggregate_status: i32,
    stages: Vec<StageOutcome>,
}

impl RunResult {
    /// Creates an empty result, with an aggregate status of 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of the next stage.
    ///
    /// The aggregate status is set by the first failing stage and never changes afterwards.
    pub fn record(&mut self, outcome: StageOutcome) {
        let status = outcome.status();
        if self.aggregate_status == 0 && status != 0 {
            self.aggregate_status = status;
        }
        self.stages.push(outcome);
    }

    /// Returns the status of the first failing stage, or 0 if every stage succeeded.
    #[inline]
    pub fn aggregate_status(&self) -> i32 {
        self.aggregate_status
    }

    /// Returns true if every recorded stage succeeded.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.aggregate_status == 0
    }

    /// Returns the recorded stages, in run order.
    #[inline]
    pub fn stages(&self) -> &[StageOutcome] {
        &self.stages
    }

    /// Returns the status of each recorded stage, in run order.
    pub fn stage_statuses(&self) -> impl Iterator<Item = i32> + '_ {
        self.stages.iter().map(StageOutcome::status)
    }

    /// Returns the first stage that failed, if any.
    pub fn first_failure(&self) -> Option<&StageOutcome> {
        self.stages.iter().find(|outcome| outcome.status() != 0)
    }
}
