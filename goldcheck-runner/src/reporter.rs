// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events produced while a run is in progress, and a reporter that turns them into log messages.
//!
//! The run log belongs to the tools: goldcheck never writes its own progress there, apart from a
//! one-line note when a stage could not run at all. Progress goes through `tracing` instead, at a
//! level that stays quiet by default.

use crate::{
    runner::{RunResult, StageOutcome, StageResult},
    stage_command::StageCommand,
    test_case::StageKind,
};
use tracing::{debug, warn};

/// An event that occurred during a run.
#[derive(Clone, Copy, Debug)]
pub enum RunEvent<'a> {
    /// A stage is about to start.
    StageStarted {
        /// The stage.
        kind: StageKind,

        /// The command the stage runs.
        command: &'a StageCommand,
    },

    /// A stage finished, successfully or not.
    StageFinished {
        /// What happened.
        outcome: &'a StageOutcome,
    },
}

/// Reports [`RunEvent`]s through `tracing`.
#[derive(Debug, Default)]
pub struct EventLogger {
    _private: (),
}

impl EventLogger {
    /// Creates a new logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports a single event.
    pub fn report_event(&mut self, event: RunEvent<'_>) {
        match event {
            RunEvent::StageStarted { kind, command } => {
                debug!("{kind} stage starting: {}", command.display());
            }
            RunEvent::StageFinished { outcome } => {
                let kind = outcome.kind;
                let time_taken = outcome.time_taken;
                match &outcome.result {
                    StageResult::Exited { code: 0 } => {
                        debug!("{kind} stage passed in {time_taken:.3?}");
                    }
                    StageResult::Exited { code } => {
                        debug!("{kind} stage exited with status {code} after {time_taken:.3?}");
                    }
                    StageResult::ExecFailed { error } => {
                        warn!("{kind} stage did not run: {error}");
                    }
                    StageResult::TimedOut { limit } => {
                        warn!("{kind} stage timed out after {limit:?} and was killed");
                    }
                }
            }
        }
    }

    /// Reports the overall result of a run.
    pub fn report_result(&self, result: &RunResult) {
        match result.first_failure() {
            None => debug!("all stages passed"),
            Some(failure) => debug!(
                "{} stage failed with status {}",
                failure.kind,
                failure.status()
            ),
        }
    }
}
