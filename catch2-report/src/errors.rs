// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    exit_codes::Catch2ExitCode,
    output::{NO_HEADING_TARGET, StderrStyles},
};
use camino::Utf8PathBuf;
use catch2_reporter::errors::{ConfigReadError, ProcessReportError};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that `catch2-report` knows how to report.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config read error")]
    ConfigReadError {
        #[from]
        err: ConfigReadError,
    },
    #[error("failed to read report")]
    ReportReadError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to read stderr file")]
    StderrReadError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to process report")]
    ProcessReportError {
        path: Utf8PathBuf,
        #[source]
        err: ProcessReportError,
    },
    #[error("failed to write output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
    #[error("failed to serialize result")]
    SerializeError {
        #[source]
        err: serde_json::Error,
    },
}

impl ExpectedError {
    pub(crate) fn report_read_error(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self::ReportReadError {
            path: path.into(),
            err,
        }
    }

    pub(crate) fn stderr_read_error(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self::StderrReadError {
            path: path.into(),
            err,
        }
    }

    pub(crate) fn process_report_error(
        path: impl Into<Utf8PathBuf>,
        err: ProcessReportError,
    ) -> Self {
        Self::ProcessReportError {
            path: path.into(),
            err,
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigReadError { .. }
            | Self::ReportReadError { .. }
            | Self::StderrReadError { .. } => Catch2ExitCode::SETUP_ERROR,
            Self::ProcessReportError { .. } => Catch2ExitCode::REPORT_PROCESSING_FAILED,
            Self::WriteOutputError { .. } | Self::SerializeError { .. } => {
                Catch2ExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Displays this error to stderr, followed by its chain of causes.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::ConfigReadError { err } => {
                error!("failed to read config");
                Some(err as &dyn Error)
            }
            Self::ReportReadError { path, err } => {
                error!("failed to read report `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::StderrReadError { path, err } => {
                error!("failed to read stderr file `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::ProcessReportError { path, err } => {
                error!("failed to process report `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::WriteOutputError { err } => {
                error!("failed to write output");
                Some(err as &dyn Error)
            }
            Self::SerializeError { err } => {
                error!("failed to serialize result");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
