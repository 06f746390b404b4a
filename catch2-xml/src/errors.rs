// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// An error that occurs while parsing a Catch2 XML report.
///
/// Returned by [`TestCaseReport::parse`](crate::TestCaseReport::parse). Every variant is fatal to
/// the parse: no partial report is produced.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The XML reader rejected the input.
    #[error("malformed XML at byte {position}")]
    Xml {
        /// The byte offset at which the reader failed.
        position: usize,

        /// The underlying reader error.
        #[source]
        err: quick_xml::Error,
    },

    /// The input ended while an element was still open.
    #[error("element <{name}> opened at byte {position} was never closed")]
    UnclosedElement {
        /// The name of the innermost open element.
        name: String,

        /// The byte offset of its start tag.
        position: usize,
    },

    /// A closing tag appeared with no element open.
    #[error("closing tag at byte {position} has no matching start tag")]
    UnexpectedEnd {
        /// The byte offset of the closing tag.
        position: usize,
    },

    /// The input contains no element at all.
    #[error("document has no root element")]
    NoRootElement,

    /// Elements or text were found after the root element was closed.
    #[error("unexpected content after the root element at byte {position}")]
    TrailingContent {
        /// The byte offset of the offending content.
        position: usize,
    },

    /// Elements are nested more deeply than the parser allows.
    #[error("element nesting exceeds the limit of {limit} at byte {position}")]
    DepthLimitExceeded {
        /// The maximum supported nesting depth.
        limit: usize,

        /// The byte offset of the element that crossed the limit.
        position: usize,
    },

    /// A CDATA section was not valid UTF-8.
    #[error("CDATA section at byte {position} is not valid UTF-8")]
    InvalidUtf8 {
        /// The byte offset of the CDATA section.
        position: usize,

        /// The underlying decoding error.
        #[source]
        err: std::str::Utf8Error,
    },

    /// The document parsed, but holds no `TestCase` element.
    #[error("no <TestCase> element found under root element <{root}>")]
    NoTestCase {
        /// The name of the document's root element.
        root: String,
    },
}

impl ParseError {
    pub(crate) fn xml(position: usize, err: impl Into<quick_xml::Error>) -> Self {
        Self::Xml {
            position,
            err: err.into(),
        }
    }
}

/// An attribute was present but its value could not be interpreted.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid value `{value}` for attribute `{attribute}` on <{element}>")]
pub struct InvalidAttribute {
    element: String,
    attribute: String,
    value: String,
}

impl InvalidAttribute {
    pub(crate) fn new(
        element: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            element: element.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Returns the name of the element carrying the attribute.
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Returns the attribute name.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Returns the raw value that failed to parse.
    pub fn value(&self) -> &str {
        &self.value
    }
}
