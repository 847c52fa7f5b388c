// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Preparing a test's working directory before any stage runs.

use crate::{
    errors::{DirectoryError, PrepareWorkspaceError},
    test_case::TestCase,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::{fs, io};
use tracing::{debug, warn};

/// A working directory that has been checked and cleared of the previous run's artifacts.
#[derive(Clone, Debug)]
pub struct PreparedWorkspace {
    dir: Utf8PathBuf,
    log_file: Utf8PathBuf,
    removed: Vec<Utf8PathBuf>,
}

impl PreparedWorkspace {
    /// Returns the absolute, canonical working directory. Every stage runs here.
    #[inline]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns the path the run log should be created at.
    #[inline]
    pub fn log_file(&self) -> &Utf8Path {
        &self.log_file
    }

    /// Returns the stale output artifacts that were deleted.
    #[inline]
    pub fn removed(&self) -> &[Utf8PathBuf] {
        &self.removed
    }
}

/// Prepares the working directory of `test_case`.
///
/// This:
///
/// 1. resolves the working directory, failing with a [`DirectoryError`] if it is missing or not a
///    directory;
/// 2. deletes the log file from a previous run, if any;
/// 3. deletes every directory entry whose name is exactly the consolidated output name
///    (`<name>.e`).
///
/// Matching in step 3 is by exact name. Gold files (`<name>_gold.e`) and anything else that merely
/// shares a prefix are left alone. Deleting the old output up front means a run that fails before
/// the merge stage can't be judged against output a previous run left behind.
pub fn prepare_workspace(test_case: &TestCase) -> Result<PreparedWorkspace, PrepareWorkspaceError> {
    let dir = enter_dir(test_case.working_dir())?;
    let layout = test_case.layout();

    let log_file = dir.join(layout.log_file_name());
    match fs::remove_file(&log_file) {
        Ok(()) => debug!("removed previous log file {log_file}"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(PrepareWorkspaceError::RemoveLog { path: log_file, err }),
    }

    let output_name = layout.output_file_name();
    let mut removed = Vec::new();
    let entries = fs::read_dir(&dir).map_err(|err| PrepareWorkspaceError::ReadDir {
        dir: dir.clone(),
        err,
    })?;
    for entry in entries {
        let entry = entry.map_err(|err| PrepareWorkspaceError::ReadDir {
            dir: dir.clone(),
            err,
        })?;
        if entry.file_name() != output_name.as_str() {
            continue;
        }

        let path = dir.join(&output_name);
        let is_dir = entry
            .file_type()
            .map_err(|err| PrepareWorkspaceError::RemoveStale {
                path: path.clone(),
                err,
            })?
            .is_dir();
        if is_dir {
            warn!("not removing directory {path}: it has the same name as the test output");
            continue;
        }

        fs::remove_file(&path).map_err(|err| PrepareWorkspaceError::RemoveStale {
            path: path.clone(),
            err,
        })?;
        debug!("removed stale output {path}");
        removed.push(path);
    }

    Ok(PreparedWorkspace {
        dir,
        log_file,
        removed,
    })
}

fn enter_dir(dir: &Utf8Path) -> Result<Utf8PathBuf, DirectoryError> {
    let canonical = dir
        .canonicalize_utf8()
        .map_err(|err| DirectoryError::new(dir, err))?;
    let metadata = fs::metadata(&canonical).map_err(|err| DirectoryError::new(dir, err))?;
    if !metadata.is_dir() {
        return Err(DirectoryError::new(
            dir,
            io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
        ));
    }
    debug!("working directory: {canonical}");
    Ok(canonical)
}
