// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The verification scenario: a named test, where it runs, and the three commands that make up a
//! run.

use crate::{errors::InvalidTestNameError, stage_command::StageCommand};
use camino::{Utf8Path, Utf8PathBuf};
use std::{fmt, num::NonZeroUsize};

/// One of the three stages of a goldcheck run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    /// Run the solver on the test definition.
    Simulate,

    /// Merge the per-partition output into a single consolidated file.
    Merge,

    /// Compare the consolidated output against the gold file.
    Compare,
}

impl StageKind {
    /// All stages, in the order they run.
    pub const ALL: [StageKind; 3] = [StageKind::Simulate, StageKind::Merge, StageKind::Compare];

    /// Returns the name of this stage.
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Simulate => "simulate",
            StageKind::Merge => "merge",
            StageKind::Compare => "compare",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage paired with the command it runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageSpec {
    kind: StageKind,
    command: StageCommand,
}

impl StageSpec {
    /// Returns the kind of stage.
    #[inline]
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Returns the command for this stage.
    #[inline]
    pub fn command(&self) -> &StageCommand {
        &self.command
    }
}

/// File names derived from a test's name.
///
/// The log and consolidated output live in the working directory. The gold file, tolerance
/// specification and test definition live one level above it, and are handed to the tools as
/// relative paths.
#[derive(Clone, Copy, Debug)]
pub struct ArtifactLayout<'a> {
    name: &'a str,
}

impl<'a> ArtifactLayout<'a> {
    /// Creates a layout for the given test name.
    pub fn new(name: &'a str) -> Self {
        Self { name }
    }

    /// `<name>.log`, in the working directory.
    pub fn log_file_name(&self) -> String {
        format!("{}.log", self.name)
    }

    /// `<name>.e`, the consolidated output in the working directory.
    pub fn output_file_name(&self) -> String {
        format!("{}.e", self.name)
    }

    /// `../<name>_gold.e`, relative to the working directory.
    pub fn gold_file(&self) -> String {
        format!("../{}_gold.e", self.name)
    }

    /// `../<name>.comp`, relative to the working directory.
    pub fn tolerance_file(&self) -> String {
        format!("../{}.comp", self.name)
    }

    /// `../<name>.xml`, relative to the working directory.
    pub fn definition_file(&self) -> String {
        format!("../{}.xml", self.name)
    }
}

/// A single verification scenario.
///
/// Built once per invocation, either from a [`VerifyConfig`](crate::config::VerifyConfig) or with
/// [`TestCase::builder`], and never modified afterwards.
#[derive(Clone, Debug)]
pub struct TestCase {
    name: String,
    working_dir: Utf8PathBuf,
    partitions: NonZeroUsize,
    // Invariant: one entry per StageKind, in StageKind::ALL order.
    stages: [StageSpec; 3],
}

impl TestCase {
    /// Starts building a test case with the default tool names.
    pub fn builder(name: impl Into<String>, working_dir: impl Into<Utf8PathBuf>) -> TestCaseBuilder {
        TestCaseBuilder::new(name, working_dir)
    }

    /// Returns the name of the test.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the working directory, as configured.
    #[inline]
    pub fn working_dir(&self) -> &Utf8Path {
        &self.working_dir
    }

    /// Returns the number of partitions the solver writes.
    #[inline]
    pub fn partitions(&self) -> NonZeroUsize {
        self.partitions
    }

    /// Returns the file names derived from this test's name.
    #[inline]
    pub fn layout(&self) -> ArtifactLayout<'_> {
        ArtifactLayout::new(&self.name)
    }

    /// Returns the three stages, in run order.
    #[inline]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Returns the spec for a single stage.
    pub fn stage(&self, kind: StageKind) -> &StageSpec {
        // StageKind::ALL order is maintained by TestCaseBuilder::build.
        &self.stages[kind as usize]
    }
}

/// Builder for [`TestCase`].
#[derive(Clone, Debug)]
pub struct TestCaseBuilder {
    name: String,
    working_dir: Utf8PathBuf,
    partitions: NonZeroUsize,
    launcher: (String, Vec<String>),
    solver: String,
    merge: String,
    diff: String,
}

impl TestCaseBuilder {
    pub(crate) const DEFAULT_LAUNCHER: &'static str = "mpiexec";
    pub(crate) const DEFAULT_LAUNCHER_ARGS: &'static [&'static str] = &["-np"];
    pub(crate) const DEFAULT_SOLVER: &'static str = "Peridigm";
    pub(crate) const DEFAULT_MERGE: &'static str = "epu";
    pub(crate) const DEFAULT_DIFF: &'static str = "exodiff";

    fn new(name: impl Into<String>, working_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            working_dir: working_dir.into(),
            partitions: NonZeroUsize::MIN,
            launcher: (
                Self::DEFAULT_LAUNCHER.to_owned(),
                Self::DEFAULT_LAUNCHER_ARGS
                    .iter()
                    .map(|arg| (*arg).to_owned())
                    .collect(),
            ),
            solver: Self::DEFAULT_SOLVER.to_owned(),
            merge: Self::DEFAULT_MERGE.to_owned(),
            diff: Self::DEFAULT_DIFF.to_owned(),
        }
    }

    /// Sets the number of partitions. More than one partition runs the solver under the launcher.
    pub fn partitions(&mut self, partitions: NonZeroUsize) -> &mut Self {
        self.partitions = partitions;
        self
    }

    /// Sets the parallel launcher. The partition count is appended after `args`.
    pub fn launcher(
        &mut self,
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> &mut Self {
        self.launcher = (program.into(), args.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the solver program.
    pub fn solver(&mut self, program: impl Into<String>) -> &mut Self {
        self.solver = program.into();
        self
    }

    /// Sets the output-merge program.
    pub fn merge(&mut self, program: impl Into<String>) -> &mut Self {
        self.merge = program.into();
        self
    }

    /// Sets the numeric-diff program.
    pub fn diff(&mut self, program: impl Into<String>) -> &mut Self {
        self.diff = program.into();
        self
    }

    /// Builds the test case, deriving each stage's argument list from the test name.
    pub fn build(&self) -> Result<TestCase, InvalidTestNameError> {
        validate_test_name(&self.name)?;

        let layout = ArtifactLayout::new(&self.name);
        let partitions = self.partitions.to_string();

        let simulate = if self.partitions.get() > 1 {
            let (launcher, launcher_args) = &self.launcher;
            let mut args = launcher_args.clone();
            args.push(partitions.clone());
            args.push(self.solver.clone());
            args.push(layout.definition_file());
            StageCommand::new(launcher, args)
        } else {
            StageCommand::new(&self.solver, [layout.definition_file()])
        };

        let merge = StageCommand::new(
            &self.merge,
            ["-p", partitions.as_str(), self.name.as_str()],
        );

        let compare = StageCommand::new(
            &self.diff,
            [
                "-stat".to_owned(),
                layout.output_file_name(),
                layout.gold_file(),
                "-f".to_owned(),
                layout.tolerance_file(),
            ],
        );

        Ok(TestCase {
            name: self.name.clone(),
            working_dir: self.working_dir.clone(),
            partitions: self.partitions,
            stages: [
                StageSpec {
                    kind: StageKind::Simulate,
                    command: simulate,
                },
                StageSpec {
                    kind: StageKind::Merge,
                    command: merge,
                },
                StageSpec {
                    kind: StageKind::Compare,
                    command: compare,
                },
            ],
        })
    }
}

fn validate_test_name(name: &str) -> Result<(), InvalidTestNameError> {
    if name.is_empty() {
        return Err(InvalidTestNameError::new(name, "name is empty"));
    }
    if name == "." || name == ".." {
        return Err(InvalidTestNameError::new(name, "name is a relative path"));
    }
    if name.contains(['/', '\\']) {
        return Err(InvalidTestNameError::new(
            name,
            "name contains a path separator",
        ));
    }
    Ok(())
}
