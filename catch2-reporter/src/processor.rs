// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns one Catch2 XML report into a [`TestRunResult`].
//!
//! The report is walked one nesting level at a time. At every level (the test case itself, then
//! each section) the known tag kinds are rendered in a fixed order, then nested sections are
//! merged into the test's [`SectionTree`] and walked in turn.
//!
//! Faults are isolated to the smallest unit that contains them: a malformed tag occurrence or
//! section is replaced by a diagnostic message and processing continues with its siblings. Only a
//! report that can't be parsed at all, or that has no verdict, fails the whole call.

use crate::{
    benchmark::render_benchmark,
    config::ReporterConfig,
    errors::{ProcessReportError, TagError},
    event::{TestEventBuilder, TestRunResult},
    helpers::normalize_filename,
    section::{SectionId, SectionKey, SectionParent, SectionTree},
    test::Catch2Test,
};
use camino::Utf8Path;
use catch2_xml::{TagKind, TestCaseReport, XmlElement};
use std::time::Duration;
use tracing::{debug, error, warn};

/// The output of one run of a test, along with what the runner observed about it.
#[derive(Clone, Debug)]
pub struct RunInput<'a> {
    output: &'a str,
    timeout: Option<Duration>,
    rng_seed: Option<u64>,
    stderr: Option<&'a str>,
}

impl<'a> RunInput<'a> {
    /// Creates a new input from the XML report written by the test binary.
    pub fn new(output: &'a str) -> Self {
        Self {
            output,
            timeout: None,
            rng_seed: None,
            stderr: None,
        }
    }

    /// Marks the run as having been killed after the given time limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Records the seed passed to `--rng-seed`.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Sets the standard error the runner captured outside the report.
    pub fn with_stderr(mut self, stderr: &'a str) -> Self {
        self.stderr = Some(stderr);
        self
    }
}

/// Processes Catch2 reports into test results.
#[derive(Clone, Debug)]
pub struct ReportProcessor<'cfg> {
    config: &'cfg ReporterConfig,
}

impl<'cfg> ReportProcessor<'cfg> {
    /// Creates a new processor.
    pub fn new(config: &'cfg ReporterConfig) -> Self {
        Self { config }
    }

    /// Processes the report of one run of `test`.
    ///
    /// Sections seen in the report are merged into the test's section tree, and the result is
    /// recorded as the test's last run. If the report can't be processed, the test is left
    /// unchanged.
    pub fn process(
        &self,
        test: &mut Catch2Test,
        input: RunInput<'_>,
    ) -> Result<TestRunResult, ProcessReportError> {
        if let Some(timeout) = input.timeout {
            let result = self.timeout_result(timeout);
            test.record_run(&result);
            return Ok(result);
        }

        let report = TestCaseReport::parse(input.output)?;
        let overall = report
            .overall_result()
            .ok_or_else(|| ProcessReportError::missing_overall_result(report.name()))?;
        debug!(
            "processing report for test `{}` (success: {})",
            report.name(),
            overall.success()
        );

        let mut builder = TestEventBuilder::new();

        if let Some(seed) = input.rng_seed {
            builder.append_message(format!("🔀 Randomness seeded to: {seed}"), 0);
        }

        match overall.duration() {
            Ok(Some(duration)) => builder.set_duration(duration),
            Ok(None) => {}
            Err(err) => warn!("ignoring duration of test `{}`: {err}", report.name()),
        }

        let test_file = test
            .file()
            .map(Utf8Path::to_owned)
            .or_else(|| normalize_filename(report.filename()));

        let mut walker = TagWalker {
            builder: &mut builder,
            sections: test.sections_mut(),
            test_file: test_file.as_deref(),
            max_depth: self.config.max_section_depth(),
        };
        let mut stack = Vec::new();
        walker.process_tags(report.element(), 0);
        walker.process_sections(report.element(), SectionParent::Root, &mut stack);

        append_output_block(&mut builder, "std::cout", overall.stdout());
        append_output_block(&mut builder, "std::err", overall.stderr());

        if let Some(stderr) = input.stderr.filter(|stderr| !stderr.is_empty()) {
            builder.append_unindented("stderr arrived during running this test >>>");
            builder.append_message(stderr, 1);
            builder.append_unindented("<<<");
        }

        if overall.success() {
            builder.passed();
        } else {
            builder.failed();
        }

        if !test.sections().is_empty() {
            let summary = test.sections().summarize();
            builder.append_description(&format!(" [{summary}]"));
            builder.append_tooltip(&format!("ᛦ {summary} branches"));
        }

        let result = builder.build();
        test.record_run(&result);
        Ok(result)
    }

    fn timeout_result(&self, timeout: Duration) -> TestRunResult {
        let mut builder = TestEventBuilder::new();
        builder.append_message(
            format!(
                "⌛️ Timed out: the test did not finish within {} second(s).",
                timeout.as_secs_f64()
            ),
            0,
        );
        builder.set_state(self.config.timeout_verdict().to_state());
        builder.set_duration(timeout);
        builder.build()
    }
}

fn append_output_block<'a>(
    builder: &mut TestEventBuilder,
    label: &str,
    blocks: impl Iterator<Item = &'a str>,
) {
    let mut blocks = blocks.peekable();
    if blocks.peek().is_none() {
        return;
    }
    builder.append_message(format!("⬇ {label}:"), 0);
    for block in blocks {
        builder.append_message(block.trim_start_matches(['\r', '\n']).trim_end(), 1);
    }
    builder.append_message(format!("⬆ {label}"), 0);
}

/// Walks the tags of one report, building the message log and merging sections.
///
/// Depth is the number of enclosing sections: test case content is at depth 0.
struct TagWalker<'a> {
    builder: &'a mut TestEventBuilder,
    sections: &'a mut SectionTree,
    test_file: Option<&'a Utf8Path>,
    max_depth: usize,
}

impl TagWalker<'_> {
    /// Renders every non-section tag directly under `element`.
    fn process_tags(&mut self, element: &XmlElement, depth: usize) {
        for child in &element.children {
            if !child.kind.is_test_content() {
                error!("unexpected Catch2 tag: {}", child.name);
                self.builder
                    .append_message(format!("unexpected Catch2 tag: {}", child.name), depth);
                self.builder.errored();
            }
        }

        if let Some(text) = element.trimmed_text() {
            self.builder.append_message(text, depth);
        }

        self.bracketed(element, TagKind::Info, "Info", depth, Self::info);
        self.bracketed(element, TagKind::Warning, "Warning", depth, Self::warning);
        self.bracketed(element, TagKind::Failure, "Failure", depth, Self::failure);
        self.each(element, TagKind::BenchmarkResults, depth, |walker, benchmark, depth| {
            render_benchmark(walker.builder, benchmark, depth)
        });
        self.each(element, TagKind::Expression, depth, Self::expression);
        self.each(element, TagKind::Exception, depth, Self::exception);
        self.bracketed(
            element,
            TagKind::FatalErrorCondition,
            "FatalErrorCondition",
            depth,
            Self::fatal_error_condition,
        );
    }

    /// Merges and renders the sections directly under `element`.
    ///
    /// `stack` holds the enclosing sections, innermost last.
    fn process_sections(
        &mut self,
        element: &XmlElement,
        parent: SectionParent,
        stack: &mut Vec<SectionId>,
    ) {
        let depth = stack.len();
        for section in element.children_of(TagKind::Section) {
            if let Err(err) = self.process_section(section, parent, stack) {
                error!("fatal error processing section {section}: {err}");
                self.builder.append_message(
                    format!("⚡️ Fatal error processing section: {err}"),
                    depth,
                );
                self.flag_unexpected_tags(section, depth + 1);
            }
        }
    }

    /// Reports unexpected tags anywhere under a section that couldn't be walked.
    ///
    /// Uses an explicit stack, since the section may be the one that exceeded the depth limit.
    fn flag_unexpected_tags(&mut self, section: &XmlElement, depth: usize) {
        let mut pending = vec![section];
        while let Some(element) = pending.pop() {
            for child in &element.children {
                if !child.kind.is_test_content() {
                    error!("unexpected Catch2 tag: {}", child.name);
                    self.builder
                        .append_message(format!("unexpected Catch2 tag: {}", child.name), depth);
                    self.builder.errored();
                }
            }
            pending.extend(
                element
                    .children
                    .iter()
                    .rev()
                    .filter(|child| child.kind == TagKind::Section),
            );
        }
    }

    fn process_section(
        &mut self,
        element: &XmlElement,
        parent: SectionParent,
        stack: &mut Vec<SectionId>,
    ) -> Result<(), TagError> {
        let depth = stack.len();
        if depth >= self.max_depth {
            return Err(TagError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }

        let name = element
            .attr("name")
            .ok_or_else(|| TagError::missing_attribute(element, "name"))?;
        let line = element.line()?.unwrap_or(0);
        let failures = match element.first_child_of(TagKind::OverallResults) {
            Some(results) => results.parse_attr::<u64>("failures")?.unwrap_or(0),
            None => 0,
        };
        let has_children = element.has_child_of(TagKind::Section);

        let id = self
            .sections
            .find_or_create(parent, SectionKey::new(name, element.filename(), line));
        self.sections.mark_failed_if_leaf(id, has_children, failures);

        let header = {
            let section = &self.sections[id];
            let context = match stack.last() {
                Some(&enclosing) => self.sections[enclosing].file(),
                None => self.test_file,
            };
            let location = match section.file() {
                Some(file) if Some(file) != context => format!("at {file}:{line}"),
                _ => format!("at line {line}"),
            };
            let status = match (has_children, section.failed()) {
                (true, _) => "",
                (false, true) => "❌ ",
                (false, false) => "✅ ",
            };
            format!("⮑ {status}\"{name}\" ({location})")
        };
        self.builder.append_message(header, depth);

        stack.push(id);
        self.process_tags(element, depth + 1);
        self.process_sections(element, id.into(), stack);
        stack.pop();

        Ok(())
    }

    // ---
    // Per-occurrence handlers
    // ---

    /// Renders every occurrence of `kind` between begin and end markers.
    fn bracketed(
        &mut self,
        element: &XmlElement,
        kind: TagKind,
        label: &str,
        depth: usize,
        handler: fn(&mut Self, &XmlElement, usize) -> Result<(), TagError>,
    ) {
        if !element.has_child_of(kind) {
            return;
        }
        self.builder.append_message(format!("⬇ {label}:"), depth);
        self.each(element, kind, depth, handler);
        self.builder.append_message(format!("⬆ {label}"), depth);
    }

    /// Runs `handler` on every occurrence of `kind`, replacing failed occurrences with a
    /// diagnostic message.
    fn each(
        &mut self,
        element: &XmlElement,
        kind: TagKind,
        depth: usize,
        mut handler: impl FnMut(&mut Self, &XmlElement, usize) -> Result<(), TagError>,
    ) {
        for child in element.children_of(kind) {
            if let Err(err) = handler(self, child, depth) {
                error!("failed to process {child}: {err}");
                if kind == TagKind::FatalErrorCondition {
                    self.builder
                        .append_message(format!("Unknown fatal error: {err}"), depth);
                } else {
                    self.builder.append_message(
                        format!("⚡️ Failed to process <{}>: {err}", child.name),
                        depth,
                    );
                }
            }
        }
    }

    fn info(&mut self, info: &XmlElement, depth: usize) -> Result<(), TagError> {
        if let Some(text) = info.trimmed_text() {
            self.builder.append_message(text, depth + 1);
        }
        Ok(())
    }

    fn warning(&mut self, warning: &XmlElement, depth: usize) -> Result<(), TagError> {
        let line = warning.line()?;
        if let Some(text) = warning.trimmed_text() {
            self.builder
                .append_message_with_decoration(warning.filename(), line, text, depth + 1);
        }
        Ok(())
    }

    fn failure(&mut self, failure: &XmlElement, depth: usize) -> Result<(), TagError> {
        let line = failure.line()?;
        let text = text_or_fallback(failure, "Failure reported without a message");
        self.builder
            .append_message_with_decoration(failure.filename(), line, text, depth + 1);
        Ok(())
    }

    fn expression(&mut self, expression: &XmlElement, depth: usize) -> Result<(), TagError> {
        let line = expression.line()?;
        if expression.children_named("Expanded").next().is_none() {
            return Err(TagError::missing_child(expression, "Expanded"));
        }

        let original = joined_texts(expression, "Original", "; ");
        let expanded = joined_texts(expression, "Expanded", "; ");
        let message = format!("❕Original:  {original}\n❗️Expanded:  {expanded}");

        self.builder.append_message(message.clone(), depth + 1);
        if let Some(line) = line {
            let label = format!("⬅ {}", joined_texts(expression, "Expanded", " | "));
            self.builder
                .append_decoration(expression.filename(), line, label, message);
        }
        Ok(())
    }

    fn exception(&mut self, exception: &XmlElement, depth: usize) -> Result<(), TagError> {
        let line = exception.line()?;
        let text = text_or_fallback(exception, "exception without a message");
        self.builder.append_message_with_decoration(
            exception.filename(),
            line,
            format!("Exception were thrown: \"{text}\""),
            depth,
        );
        Ok(())
    }

    fn fatal_error_condition(
        &mut self,
        condition: &XmlElement,
        depth: usize,
    ) -> Result<(), TagError> {
        let line = condition.line()?;
        if let Some(text) = condition.trimmed_text() {
            self.builder
                .append_message_with_decoration(condition.filename(), line, text, depth);
        }
        Ok(())
    }
}

fn text_or_fallback<'a>(element: &'a XmlElement, fallback: &'a str) -> &'a str {
    match element.trimmed_text() {
        Some(text) if !text.is_empty() => text,
        _ => {
            warn!("no text under {element}");
            fallback
        }
    }
}

fn joined_texts(element: &XmlElement, name: &str, separator: &str) -> String {
    element
        .child_texts(name)
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(separator)
}
