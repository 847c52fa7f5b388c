// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Machine-readable contracts for [goldcheck](https://crates.io/crates/goldcheck).
//!
//! The only structured signal goldcheck produces is its process exit status. This crate documents
//! the codes that goldcheck itself originates, so that outer test-suite aggregators can tell
//! harness problems apart from stage failures when they care to.

mod exit_codes;

pub use exit_codes::*;
