// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core logic for turning [Catch2](https://github.com/catchorg/Catch2) XML reports into test
//! results.
//!
//! A [`Catch2Test`] owns the [`SectionTree`](section::SectionTree) accumulated over all of its
//! runs. Each run's report is fed through a [`ReportProcessor`], which merges the sections it
//! saw into the tree and produces a [`TestRunResult`]: a verdict, a duration and an indented
//! message log annotated with source locations.
//!
//! ```
//! use catch2_reporter::{Catch2Test, ReportProcessor, RunInput, TestInfo, TestState};
//! use catch2_reporter::config::ReporterConfig;
//! use semver::Version;
//!
//! let config = ReporterConfig::default();
//! let mut test = Catch2Test::new(TestInfo::new("adds", Version::new(3, 4, 0)), None);
//! let result = ReportProcessor::new(&config).process(
//!     &mut test,
//!     RunInput::new(r#"<TestCase name="adds"><OverallResult success="true"/></TestCase>"#),
//! )?;
//! assert_eq!(result.state(), TestState::Passed);
//! # Ok::<(), catch2_reporter::errors::ProcessReportError>(())
//! ```

mod benchmark;
pub mod config;
pub mod errors;
mod event;
mod helpers;
mod processor;
pub mod section;

pub use event::{Decoration, MessageEntry, TestRunResult, TestState};
pub use processor::{ReportProcessor, RunInput};
pub use test::{Catch2Test, TestInfo};
