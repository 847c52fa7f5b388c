// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A regression verification harness for partitioned numerical simulations.
//!
//! Run `goldcheck` from a directory containing a `goldcheck.toml`. It runs the solver, merges the
//! per-partition output into one file, and compares that file against a gold file with a numeric
//! diff tool. The exit status is `0` if all three stages pass, or the status of the first stage
//! that failed. Tool output is collected in `<name>.log` in the test's working directory; pass
//! `--verbose` to also print it once the run is over.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter, StderrStyles};
