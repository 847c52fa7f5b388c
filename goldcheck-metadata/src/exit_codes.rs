// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `goldcheck` runs.
///
/// A run exits with [`Self::OK`] if every stage succeeded. Otherwise it exits with the status of
/// the *first* stage that failed, unchanged: callers must treat "nonzero" as the only guaranteed
/// signal. The constants below cover the cases where goldcheck has to pick a code itself.
pub enum GoldcheckExitCode {}

impl GoldcheckExitCode {
    /// Every stage exited with status 0.
    pub const OK: i32 = 0;

    /// A user issue happened while setting up the run, before any stage was started.
    ///
    /// This covers an unreadable or invalid `goldcheck.toml`, a missing working directory, and
    /// failures to remove stale artifacts or create the run log.
    pub const SETUP_ERROR: i32 = 96;

    /// A stage was killed because it ran longer than the configured timeout.
    ///
    /// Recorded as that stage's status. Matches the convention used by `timeout(1)`.
    pub const STAGE_TIMED_OUT: i32 = 124;

    /// A stage's program could not be started (for example, it does not exist or is not
    /// executable).
    ///
    /// Recorded as that stage's status. Matches the convention used by POSIX shells for a command
    /// that was not found.
    pub const STAGE_EXEC_FAILED: i32 = 127;
}
