// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Summarize Catch2 XML test reports on the command line.
//!
//! Each report passed in is one run of the same test case. Runs are processed in order so the
//! test's section tree accumulates across them, and the result of the last run is printed.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod exit_codes;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
pub use exit_codes::Catch2ExitCode;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter};
