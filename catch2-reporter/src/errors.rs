// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by catch2-reporter.

use camino::Utf8PathBuf;
use catch2_xml::{InvalidAttribute, ParseError, XmlElement};
use std::io;
use thiserror::Error;

/// An error that made a report impossible to process.
///
/// No partial result is produced when this is returned. Problems confined to a single tag or
/// section are not errors at this level: they're reported inside the message log instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProcessReportError {
    /// The report isn't well-formed XML, or doesn't contain a test case.
    #[error("failed to parse Catch2 XML report")]
    Parse(#[from] ParseError),

    /// The test case has no `OverallResult` element, so no verdict can be given.
    #[error("test case `{test_name}` has no <OverallResult> element")]
    MissingOverallResult {
        /// The name of the test case.
        test_name: String,
    },
}

impl ProcessReportError {
    pub(crate) fn missing_overall_result(test_name: impl Into<String>) -> Self {
        Self::MissingOverallResult {
            test_name: test_name.into(),
        }
    }
}

/// An error encountered while rendering one tag occurrence or one section.
///
/// These errors are isolated: the processor logs them, replaces the offending fragment with a
/// diagnostic message and carries on with its siblings.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TagError {
    /// An attribute had a value that couldn't be interpreted.
    #[error(transparent)]
    InvalidAttribute(#[from] InvalidAttribute),

    /// A required attribute was absent.
    #[error("<{element}> is missing the `{attribute}` attribute")]
    MissingAttribute {
        /// The name of the element.
        element: String,

        /// The name of the missing attribute.
        attribute: &'static str,
    },

    /// A required child element was absent.
    #[error("<{element}> has no <{child}> element")]
    MissingChild {
        /// The name of the element.
        element: String,

        /// The name of the missing child.
        child: &'static str,
    },

    /// Sections were nested more deeply than the configured limit.
    #[error("sections are nested more than {limit} levels deep")]
    DepthLimitExceeded {
        /// The configured limit.
        limit: usize,
    },
}

impl TagError {
    pub(crate) fn missing_attribute(element: &XmlElement, attribute: &'static str) -> Self {
        Self::MissingAttribute {
            element: element.name.clone(),
            attribute,
        }
    }

    pub(crate) fn missing_child(element: &XmlElement, child: &'static str) -> Self {
        Self::MissingChild {
            element: element.name.clone(),
            child,
        }
    }
}

/// An error that occurred while reading the reporter config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigReadError {
    /// An error occurred while reading the file.
    #[error("failed to read config file `{file}`")]
    Read {
        /// The config file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// An error occurred while deserializing the file as TOML.
    #[error("failed to deserialize TOML from config file `{file}`")]
    Toml {
        /// The config file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: Box<toml::de::Error>,
    },

    /// A key had a value outside its allowed range.
    #[error("in config file `{file}`, `{key}` {reason}")]
    InvalidValue {
        /// The config file.
        file: Utf8PathBuf,

        /// The dotted key, for example `processing.max-section-depth`.
        key: &'static str,

        /// Why the value was rejected.
        reason: &'static str,
    },
}

impl ConfigReadError {
    pub(crate) fn read(file: impl Into<Utf8PathBuf>, err: io::Error) -> Self {
        Self::Read {
            file: file.into(),
            err,
        }
    }

    pub(crate) fn toml(file: impl Into<Utf8PathBuf>, err: toml::de::Error) -> Self {
        Self::Toml {
            file: file.into(),
            err: Box::new(err),
        }
    }

    pub(crate) fn invalid_value(
        file: impl Into<Utf8PathBuf>,
        key: &'static str,
        reason: &'static str,
    ) -> Self {
        Self::InvalidValue {
            file: file.into(),
            key,
            reason,
        }
    }
}
