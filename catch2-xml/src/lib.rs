// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read Catch2 XML test reports in Rust.
//!
//! The XML reporter of the [Catch2](https://github.com/catchorg/Catch2) unit-test framework emits
//! one `TestCase` element per executed test, with arbitrarily nested `Section` elements,
//! assertions, benchmarks and captured output. This crate turns that text into a generic tree of
//! [`XmlElement`]s whose tag names are classified up front into a closed set of [`TagKind`]s.

mod errors;
mod parse;
mod report;

pub use errors::*;
pub use report::*;
