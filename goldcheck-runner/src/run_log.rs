// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single log file shared by every stage of a run.
//!
//! A [`RunLog`] is created once per run and handed to each stage by reference. Child processes
//! write through duplicates of the same file handle, so output from consecutive stages lands in
//! the file one after the other. [`RunLog::close`] consumes the log and returns a
//! [`ClosedRunLog`], which is the only way to read the contents back; this keeps reads from
//! observing a partially flushed file.

use crate::errors::RunLogError;
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    fs::{self, File},
    io::{self, Write},
};
use tracing::debug;

/// The open log file for a run.
///
/// Dropping a `RunLog` closes the file as well, so it is never leaked on an early return or a
/// panic. Use [`close`](Self::close) on the normal path to get errors reported.
#[derive(Debug)]
pub struct RunLog {
    path: Utf8PathBuf,
    file: File,
}

impl RunLog {
    /// Creates the log file, truncating any file already at `path`.
    pub fn create(path: impl Into<Utf8PathBuf>) -> Result<Self, RunLogError> {
        let path = path.into();
        let file = File::create(&path).map_err(|err| RunLogError::Create {
            path: path.clone(),
            err,
        })?;
        debug!("opened run log at {path}");
        Ok(Self { path, file })
    }

    /// Returns the path to the log file.
    #[inline]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns a new handle to the log file, for a child process's output streams.
    ///
    /// The handle shares the file offset with this log, so writes through it and through
    /// [`write_note`](Self::write_note) never overwrite each other.
    pub(crate) fn child_handle(&self) -> io::Result<File> {
        self.file.try_clone()
    }

    /// Appends a line written by goldcheck itself.
    pub(crate) fn write_note(&self, note: &str) -> Result<(), RunLogError> {
        writeln!(&self.file, "goldcheck: {note}").map_err(|err| RunLogError::Write {
            path: self.path.clone(),
            err,
        })
    }

    /// Flushes the log to disk and closes it.
    pub fn close(self) -> Result<ClosedRunLog, RunLogError> {
        let Self { path, file } = self;
        if let Err(err) = file.sync_all() {
            return Err(RunLogError::Close { path, err });
        }
        drop(file);
        debug!("closed run log at {path}");
        Ok(ClosedRunLog { path })
    }
}

/// A run log that has been flushed and closed.
#[derive(Clone, Debug)]
pub struct ClosedRunLog {
    path: Utf8PathBuf,
}

impl ClosedRunLog {
    /// Returns the path to the log file.
    #[inline]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Reads the full contents of the log.
    pub fn read_contents(&self) -> Result<Vec<u8>, RunLogError> {
        fs::read(&self.path).map_err(|err| RunLogError::Read {
            path: self.path.clone(),
            err,
        })
    }
}
