// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for [goldcheck](https://crates.io/crates/goldcheck), a regression
//! verification harness for partitioned numerical simulations.
//!
//! A goldcheck run has a fixed shape:
//!
//! 1. [`prepare_workspace`](workspace::prepare_workspace) checks the test's working directory and
//!    removes the previous run's log and consolidated output.
//! 2. A [`RunLog`](run_log::RunLog) is created; every stage writes into it.
//! 3. [`VerifyRunner`](runner::VerifyRunner) runs the simulate, merge and compare stages in order,
//!    never skipping one, and folds their statuses into a single first-failure-wins
//!    [`RunResult`](runner::RunResult).
//!
//! The programs run by each stage are opaque: goldcheck only looks at their exit status.

pub mod config;
pub mod errors;
pub mod reporter;
pub mod run_log;
pub mod runner;
pub mod stage_command;
pub mod test_case;
pub mod workspace;
