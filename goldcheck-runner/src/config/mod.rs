// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for a verification run.
//!
//! A run is described by a `goldcheck.toml` file in the directory goldcheck is invoked from.
//! [`VerifyConfig`] is the entry point.

mod imp;
mod tools;

pub use imp::*;
pub use tools::*;
