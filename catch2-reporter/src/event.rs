// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The result of one run of a test: a verdict and an indented, source-annotated message log.

use crate::helpers::{first_line, normalize_filename};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Serialize, Serializer};
use std::{fmt, time::Duration};
use swrite::{SWrite, swrite};

/// The verdict of a test run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestState {
    /// The test passed.
    Passed,
    /// The test reported a failure.
    Failed,
    /// The test couldn't be evaluated: it timed out, or its report was malformed.
    Errored,
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestState::Passed => write!(f, "passed"),
            TestState::Failed => write!(f, "failed"),
            TestState::Errored => write!(f, "errored"),
        }
    }
}

/// A source location attached to the message log.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Decoration {
    file: Option<Utf8PathBuf>,
    line: u32,
    label: String,
    hover: String,
}

impl Decoration {
    /// Returns the normalized source file, if known.
    pub fn file(&self) -> Option<&Utf8Path> {
        self.file.as_deref()
    }

    /// Returns the 0-based line the decoration is attached to.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Returns the short text displayed inline.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the detailed text displayed on hover.
    pub fn hover(&self) -> &str {
        &self.hover
    }
}

/// One entry of the message log.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MessageEntry {
    indent: Option<usize>,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    decoration: Option<usize>,
}

impl MessageEntry {
    /// Returns the indentation level, or `None` if the entry is printed flush-left.
    pub fn indent(&self) -> Option<usize> {
        self.indent
    }

    /// Returns the text of the entry. It may span several lines.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the index of the decoration attached to this entry, if any.
    pub fn decoration(&self) -> Option<usize> {
        self.decoration
    }
}

/// The frozen result of one test run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestRunResult {
    state: TestState,
    #[serde(rename = "duration-ms", serialize_with = "serialize_duration_ms")]
    duration: Option<Duration>,
    entries: Vec<MessageEntry>,
    decorations: Vec<Decoration>,
    description: String,
    tooltip: String,
}

impl TestRunResult {
    /// Returns the verdict.
    pub fn state(&self) -> TestState {
        self.state
    }

    /// Returns the duration of the run, if reported.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Returns the duration of the run in milliseconds, if reported.
    pub fn duration_ms(&self) -> Option<f64> {
        self.duration.map(|d| d.as_secs_f64() * 1000.0)
    }

    /// Returns the message log, in order.
    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    /// Returns the decorations referenced by the message log.
    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }

    /// Returns the description suffix, or an empty string.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the tooltip suffix, or an empty string.
    pub fn tooltip(&self) -> &str {
        &self.tooltip
    }

    /// Renders the message log into a single string.
    ///
    /// Every line of an entry is indented by two spaces per level.
    pub fn message(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let indent = "  ".repeat(entry.indent.unwrap_or(0));
            for line in entry.text.lines() {
                if !out.is_empty() {
                    out.push('\n');
                }
                swrite!(out, "{indent}{line}");
            }
        }
        out
    }
}

fn serialize_duration_ms<S: Serializer>(
    duration: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match duration {
        Some(duration) => serializer.serialize_some(&(duration.as_secs_f64() * 1000.0)),
        None => serializer.serialize_none(),
    }
}

/// Accumulates the message log and verdict of a run.
#[derive(Debug)]
pub(crate) struct TestEventBuilder {
    state: TestState,
    forced_errored: bool,
    duration: Option<Duration>,
    entries: Vec<MessageEntry>,
    decorations: Vec<Decoration>,
    description: String,
    tooltip: String,
}

impl TestEventBuilder {
    pub(crate) fn new() -> Self {
        Self {
            state: TestState::Passed,
            forced_errored: false,
            duration: None,
            entries: Vec::new(),
            decorations: Vec::new(),
            description: String::new(),
            tooltip: String::new(),
        }
    }

    /// Appends a message at the given indentation level. Empty messages are skipped.
    pub(crate) fn append_message(&mut self, text: impl Into<String>, indent: usize) {
        self.push_entry(text.into(), Some(indent), None);
    }

    /// Appends a message printed flush-left.
    pub(crate) fn append_unindented(&mut self, text: impl Into<String>) {
        self.push_entry(text.into(), None, None);
    }

    /// Appends a message along with a decoration pointing at its source.
    ///
    /// `line` is 1-based, as Catch2 reports it. Without a line, only the message is appended.
    pub(crate) fn append_message_with_decoration(
        &mut self,
        file: Option<&str>,
        line: Option<u32>,
        text: impl Into<String>,
        indent: usize,
    ) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        let decoration = line.map(|line| {
            let label = format!("⬅ {}", first_line(&text));
            self.append_decoration(file, line, label, text.clone())
        });
        self.push_entry(text, Some(indent), decoration);
    }

    /// Registers a decoration without a message. Returns its index.
    ///
    /// `line` is 1-based.
    pub(crate) fn append_decoration(
        &mut self,
        file: Option<&str>,
        line: u32,
        label: impl Into<String>,
        hover: impl Into<String>,
    ) -> usize {
        self.decorations.push(Decoration {
            file: normalize_filename(file),
            line: line.saturating_sub(1),
            label: label.into(),
            hover: hover.into(),
        });
        self.decorations.len() - 1
    }

    pub(crate) fn append_description(&mut self, text: &str) {
        self.description.push_str(text);
    }

    pub(crate) fn append_tooltip(&mut self, text: &str) {
        self.tooltip.push_str(text);
    }

    pub(crate) fn passed(&mut self) {
        self.state = TestState::Passed;
    }

    pub(crate) fn failed(&mut self) {
        self.state = TestState::Failed;
    }

    /// Forces the verdict to errored. Later calls to [`Self::passed`] and [`Self::failed`] don't
    /// override this.
    pub(crate) fn errored(&mut self) {
        self.forced_errored = true;
    }

    pub(crate) fn set_state(&mut self, state: TestState) {
        match state {
            TestState::Passed => self.passed(),
            TestState::Failed => self.failed(),
            TestState::Errored => self.errored(),
        }
    }

    pub(crate) fn set_duration(&mut self, duration: Duration) {
        self.duration = Some(duration);
    }

    pub(crate) fn build(self) -> TestRunResult {
        TestRunResult {
            state: if self.forced_errored {
                TestState::Errored
            } else {
                self.state
            },
            duration: self.duration,
            entries: self.entries,
            decorations: self.decorations,
            description: self.description,
            tooltip: self.tooltip,
        }
    }

    fn push_entry(&mut self, text: String, indent: Option<usize>, decoration: Option<usize>) {
        if text.is_empty() {
            return;
        }
        self.entries.push(MessageEntry {
            indent,
            text,
            decoration,
        });
    }
}
