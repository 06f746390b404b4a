// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `catch2-report`.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum Catch2ExitCode {}

impl Catch2ExitCode {
    /// The last run passed.
    pub const OK: i32 = 0;

    /// The last run failed or errored.
    pub const TEST_FAILED: i32 = 100;

    /// A user issue happened while setting up: an invalid config, or an unreadable input file.
    pub const SETUP_ERROR: i32 = 96;

    /// A report couldn't be processed.
    pub const REPORT_PROCESSING_FAILED: i32 = 104;

    /// Writing data to stdout produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
