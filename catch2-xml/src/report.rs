// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{InvalidAttribute, ParseError, parse::parse_document};
use indexmap::map::IndexMap;
use std::{fmt, str::FromStr, time::Duration};

/// The kind of a Catch2 XML element.
///
/// Tag names are classified once, when the document is parsed. Every tag name that isn't part of
/// the known set is classified as [`TagKind::Other`]; consumers decide at which nesting levels
/// such tags are acceptable.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TagKind {
    /// `<TestCase>`: one executed test.
    TestCase,
    /// `<Section>`: one path through nested test logic.
    Section,
    /// `<Info>`: an informational message.
    Info,
    /// `<Warning>`: a warning with a source location.
    Warning,
    /// `<Failure>`: an explicit failure with a source location.
    Failure,
    /// `<Expression>`: an assertion with its original and expanded forms.
    Expression,
    /// `<Exception>`: an exception thrown out of the test body.
    Exception,
    /// `<OverallResult>`: the result of a test case.
    OverallResult,
    /// `<OverallResults>`: the result of a section or a group of test cases.
    OverallResults,
    /// `<FatalErrorCondition>`: a signal or structured exception that terminated the test.
    FatalErrorCondition,
    /// `<BenchmarkResults>`: the measurements of one benchmark.
    BenchmarkResults,
    /// Any other tag name.
    Other,
}

impl TagKind {
    /// Classifies a tag name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "TestCase" => Self::TestCase,
            "Section" => Self::Section,
            "Info" => Self::Info,
            "Warning" => Self::Warning,
            "Failure" => Self::Failure,
            "Expression" => Self::Expression,
            "Exception" => Self::Exception,
            "OverallResult" => Self::OverallResult,
            "OverallResults" => Self::OverallResults,
            "FatalErrorCondition" => Self::FatalErrorCondition,
            "BenchmarkResults" => Self::BenchmarkResults,
            _ => Self::Other,
        }
    }

    /// Returns true if elements of this kind may appear directly under a `TestCase` or a
    /// `Section`.
    ///
    /// Both `OverallResult` and `OverallResults` are accepted at either level.
    pub fn is_test_content(self) -> bool {
        match self {
            Self::Section
            | Self::Info
            | Self::Warning
            | Self::Failure
            | Self::Expression
            | Self::Exception
            | Self::OverallResult
            | Self::OverallResults
            | Self::FatalErrorCondition
            | Self::BenchmarkResults => true,
            Self::TestCase | Self::Other => false,
        }
    }
}

/// One element of a parsed report.
///
/// This is the generic representation of the XML document: attributes keep their document order,
/// and children are stored in document order regardless of their kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlElement {
    /// The classification of [`name`](Self::name).
    pub kind: TagKind,

    /// The tag name as written in the document.
    pub name: String,

    /// Attributes, in document order, with entities unescaped.
    pub attributes: IndexMap<String, String>,

    /// Character data and CDATA directly under this element, concatenated.
    ///
    /// This is `None` if the element has no character data, or if it consists only of whitespace.
    pub text: Option<String>,

    /// Child elements, in document order.
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Creates a new element with no attributes, text or children.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: TagKind::from_name(&name),
            name,
            attributes: IndexMap::new(),
            text: None,
            children: vec![],
        }
    }

    /// Adds an attribute to this element.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets the text of this element.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Adds a child to this element.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Returns the value of the given attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Parses the value of the given attribute, if present.
    pub fn parse_attr<T: FromStr>(&self, name: &str) -> Result<Option<T>, InvalidAttribute> {
        match self.attr(name) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| InvalidAttribute::new(&self.name, name, value)),
            None => Ok(None),
        }
    }

    /// Returns the `filename` attribute.
    pub fn filename(&self) -> Option<&str> {
        self.attr("filename")
    }

    /// Returns the 1-based `line` attribute.
    pub fn line(&self) -> Result<Option<u32>, InvalidAttribute> {
        self.parse_attr("line")
    }

    /// Returns the text of this element with surrounding whitespace removed.
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim)
    }

    /// Iterates over the children of the given kind.
    pub fn children_of(&self, kind: TagKind) -> impl Iterator<Item = &XmlElement> + '_ {
        self.children.iter().filter(move |child| child.kind == kind)
    }

    /// Returns true if at least one child is of the given kind.
    pub fn has_child_of(&self, kind: TagKind) -> bool {
        self.children_of(kind).next().is_some()
    }

    /// Returns the first child of the given kind.
    pub fn first_child_of(&self, kind: TagKind) -> Option<&XmlElement> {
        self.children_of(kind).next()
    }

    /// Iterates over the children with the given tag name.
    ///
    /// This is useful for tags that aren't part of [`TagKind`], such as `Original` or `mean`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Iterates over the texts of the children with the given tag name.
    ///
    /// Children without text produce an empty string.
    pub fn child_texts<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.children_named(name)
            .map(|child| child.text.as_deref().unwrap_or_default())
    }
}

impl fmt::Display for XmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (key, value) in &self.attributes {
            write!(f, " {key}=\"{value}\"")?;
        }
        if self.text.is_none() && self.children.is_empty() {
            write!(f, "/>")
        } else {
            write!(f, ">…</{}>", self.name)
        }
    }
}

/// A single Catch2 test case, as reported by one run of a test binary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCaseReport {
    element: XmlElement,
}

impl TestCaseReport {
    /// Parses a report.
    ///
    /// The input is either a document whose root element is `TestCase`, or a complete reporter
    /// document (`Catch`, `Catch2TestRun`, `Group`, ...) with a `TestCase` somewhere below the
    /// root. In the latter case, the first `TestCase` in document order is used.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let root = parse_document(input)?;
        let root_name = root.name.clone();

        let mut pending = vec![root];
        while let Some(element) = pending.pop() {
            if element.kind == TagKind::TestCase {
                return Ok(Self { element });
            }
            pending.extend(element.children.into_iter().rev());
        }

        Err(ParseError::NoTestCase { root: root_name })
    }

    /// Creates a report from an already-built `TestCase` element.
    pub fn from_element(element: XmlElement) -> Self {
        Self { element }
    }

    /// Returns the underlying `TestCase` element.
    pub fn element(&self) -> &XmlElement {
        &self.element
    }

    /// Returns the name of the test case.
    ///
    /// The XML reporter trims test names, so this may differ from the name the test was
    /// registered with.
    pub fn name(&self) -> &str {
        self.element.attr("name").unwrap_or_default()
    }

    /// Returns the source file the test case is defined in.
    pub fn filename(&self) -> Option<&str> {
        self.element.filename()
    }

    /// Returns the 1-based line the test case is defined at.
    pub fn line(&self) -> Result<Option<u32>, InvalidAttribute> {
        self.element.line()
    }

    /// Returns the `OverallResult` of the test case, if present.
    ///
    /// Only the singular spelling is consulted: `OverallResults` belongs to sections.
    pub fn overall_result(&self) -> Option<OverallResult<'_>> {
        self.element
            .first_child_of(TagKind::OverallResult)
            .map(|element| OverallResult { element })
    }
}

/// The `OverallResult` element of a test case.
#[derive(Copy, Clone, Debug)]
pub struct OverallResult<'a> {
    element: &'a XmlElement,
}

impl<'a> OverallResult<'a> {
    /// Returns the underlying element.
    pub fn element(&self) -> &'a XmlElement {
        self.element
    }

    /// Returns true if the `success` attribute is exactly `"true"`.
    pub fn success(&self) -> bool {
        self.element.attr("success") == Some("true")
    }

    /// Returns the `durationInSeconds` attribute as a duration.
    pub fn duration(&self) -> Result<Option<Duration>, InvalidAttribute> {
        let Some(secs) = self.element.parse_attr::<f64>("durationInSeconds")? else {
            return Ok(None);
        };
        Duration::try_from_secs_f64(secs).map(Some).map_err(|_| {
            InvalidAttribute::new(
                &self.element.name,
                "durationInSeconds",
                self.element.attr("durationInSeconds").unwrap_or_default(),
            )
        })
    }

    /// Iterates over the captured standard output blocks.
    pub fn stdout(&self) -> impl Iterator<Item = &'a str> {
        self.element.child_texts("StdOut")
    }

    /// Iterates over the captured standard error blocks.
    pub fn stderr(&self) -> impl Iterator<Item = &'a str> {
        self.element.child_texts("StdErr")
    }
}
