// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running a single external command with its output captured into the run log.

use crate::{errors::ExecutionError, run_log::RunLog};
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    process::ExitStatus,
    thread,
    time::{Duration, Instant},
};
use tracing::debug;

/// How often a running child is polled when a timeout is configured.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// An external command: a program followed by its arguments.
///
/// The program is opaque to goldcheck. All that matters is its exit status and whatever it writes
/// to its standard streams.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageCommand {
    program: String,
    args: Vec<String>,
}

impl StageCommand {
    /// Creates a new command.
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the program, as configured.
    #[inline]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the arguments.
    #[inline]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the full argument list: the program followed by its arguments.
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }

    /// Returns the command line, quoted for a Unix shell.
    pub fn display(&self) -> String {
        shell_words::join(self.argv())
    }

    /// Returns the program to execute when running in `cwd`.
    ///
    /// A relative program path such as `../../scripts/epu` is resolved against `cwd`. A bare name
    /// like `mpiexec` is left alone, to be looked up on `PATH`.
    pub fn resolve_program(&self, cwd: &Utf8Path) -> Utf8PathBuf {
        let program = Utf8Path::new(&self.program);
        if program.is_relative() && program.components().count() > 1 {
            cwd.join(program)
        } else {
            program.to_owned()
        }
    }

    /// Runs the command in `cwd` and waits for it to exit.
    ///
    /// Standard output and standard error both go to `log`, interleaved in the order the child
    /// writes them. If `timeout` is set and the child is still running once it elapses, the child
    /// is killed along with everything else in its process group, and [`ChildExit::TimedOut`] is
    /// returned. Without a timeout this waits forever.
    ///
    /// Returns an error if the command could not be started at all; a command that starts and
    /// then fails is reported through [`ChildExit::Exited`] instead.
    pub fn run(
        &self,
        cwd: &Utf8Path,
        log: &RunLog,
        timeout: Option<Duration>,
    ) -> Result<ChildExit, ExecutionError> {
        let command = self.display();
        let program = self.resolve_program(cwd);

        let log_handle = log
            .child_handle()
            .map_err(|err| ExecutionError::AttachLog {
                command: command.clone(),
                err,
            })?;

        debug!("running `{command}` in {cwd}");

        // Redirections apply from the outside in: stdout is pointed at the log first, then
        // stderr is joined to it.
        let mut expression = duct::cmd(program.as_str(), &self.args)
            .dir(cwd)
            .stderr_to_stdout()
            .stdout_file(log_handle)
            .unchecked();
        if timeout.is_some() {
            // The child leads its own process group, so a timeout can kill everything it started.
            expression = expression.before_spawn(|cmd| {
                os::set_process_group(cmd);
                Ok(())
            });
        }

        let handle = expression
            .start()
            .map_err(|err| ExecutionError::Spawn {
                command: command.clone(),
                err,
            })?;

        let wait_err = |err| ExecutionError::Wait {
            command: command.clone(),
            err,
        };

        let output = match timeout {
            None => handle.wait().map_err(wait_err)?,
            Some(limit) => {
                let start = Instant::now();
                loop {
                    if let Some(output) = handle.try_wait().map_err(wait_err)? {
                        break output;
                    }
                    if start.elapsed() >= limit {
                        debug!("`{command}` still running after {limit:?}, killing it");
                        os::kill_process_group(&handle).map_err(wait_err)?;
                        if let Err(err) = handle.wait() {
                            debug!("failed to reap `{command}` after killing it: {err}");
                        }
                        return Ok(ChildExit::TimedOut(limit));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        };

        Ok(ChildExit::Exited(exit_code(output.status)))
    }
}

/// How a child process finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildExit {
    /// The child exited by itself with this status code.
    Exited(i32),

    /// The child was killed after running for this long.
    TimedOut(Duration),
}

#[cfg(unix)]
mod os {
    use std::{io, os::unix::process::CommandExt, process::Command};

    pub(super) fn set_process_group(cmd: &mut Command) {
        cmd.process_group(0);
    }

    /// Sends `SIGKILL` to the process group led by each child of `handle`.
    pub(super) fn kill_process_group(handle: &duct::Handle) -> io::Result<()> {
        for pid in handle.pids() {
            let pgid = libc::pid_t::try_from(pid).map_err(io::Error::other)?;
            // SAFETY: kill has no memory safety requirements. The child has not been reaped yet,
            // so its process group id cannot have been reused.
            if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
                let err = io::Error::last_os_error();
                // ESRCH: every process in the group has already exited.
                if err.raw_os_error() != Some(libc::ESRCH) {
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

#[cfg(not(unix))]
mod os {
    use std::{io, process::Command};

    pub(super) fn set_process_group(_cmd: &mut Command) {}

    pub(super) fn kill_process_group(handle: &duct::Handle) -> io::Result<()> {
        handle.kill()
    }
}

/// Converts an exit status into the integer code a shell would report.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    // Not reachable on supported platforms: a child either exits or is killed by a signal.
    1
}
