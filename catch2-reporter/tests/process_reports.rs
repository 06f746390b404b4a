// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8Path;
use catch2_reporter::{
    Catch2Test, ReportProcessor, RunInput, TestInfo, TestRunResult, TestState,
    config::ReporterConfig,
    errors::ProcessReportError,
    section::{SectionKey, SectionParent},
};
use catch2_xml::ParseError;
use indoc::indoc;
use pretty_assertions::assert_eq;
use semver::Version;
use std::time::Duration;

static TWO_SECTIONS: &str = include_str!("fixtures/two_sections.xml");
static RERUN_FIRST: &str = include_str!("fixtures/rerun_first.xml");
static RERUN_SECOND: &str = include_str!("fixtures/rerun_second.xml");
static RERUN_THIRD: &str = include_str!("fixtures/rerun_third.xml");
static BENCHMARK: &str = include_str!("fixtures/benchmark.xml");
static UNEXPECTED_TAG: &str = include_str!("fixtures/unexpected_tag.xml");
static FATAL: &str = include_str!("fixtures/fatal.xml");
static DEGENERATE: &str = include_str!("fixtures/degenerate.xml");

fn new_test(name: &str) -> Catch2Test {
    Catch2Test::new(
        TestInfo::new(name, Version::new(3, 4, 0)).with_location(Some("f.cpp"), Some(1)),
        None,
    )
}

fn lines(result: &TestRunResult) -> Vec<(Option<usize>, &str)> {
    result
        .entries()
        .iter()
        .map(|entry| (entry.indent(), entry.text()))
        .collect()
}

#[test]
fn two_sibling_sections() {
    let config = ReporterConfig::default();
    let mut test = Catch2Test::new(
        TestInfo::new("vectors can be sized", Version::new(3, 4, 0))
            .with_tags(["vector"])
            .with_location(Some("f.cpp"), Some(10)),
        None,
    );

    let result = ReportProcessor::new(&config)
        .process(&mut test, RunInput::new(TWO_SECTIONS).with_rng_seed(42))
        .expect("report processes");

    assert_eq!(result.state(), TestState::Failed);
    assert_eq!(result.duration_ms(), Some(1500.0));
    assert_eq!(result.description(), " [✘1|✔︎1]");
    assert_eq!(result.tooltip(), "ᛦ ✘1|✔︎1 branches");
    assert_eq!(
        lines(&result),
        vec![
            (Some(0), "🔀 Randomness seeded to: 42"),
            (Some(0), "⮑ ✅ \"a\" (at line 1)"),
            (Some(0), "⮑ ❌ \"b\" (at line 2)"),
            (Some(2), "❕Original:  v.size() == 5\n❗️Expanded:  10 == 5"),
            (Some(0), "⬇ std::cout:"),
            (Some(1), "resizing"),
            (Some(0), "⬆ std::cout"),
        ]
    );

    let [decoration] = result.decorations() else {
        panic!("expected one decoration: {:?}", result.decorations());
    };
    assert_eq!(decoration.file(), Some(Utf8Path::new("f.cpp")));
    assert_eq!(decoration.line(), 2);
    assert_eq!(decoration.label(), "⬅ 10 == 5");

    let sections = test.sections();
    let roots: Vec<_> = sections
        .roots()
        .map(|id| (sections[id].name(), sections[id].failed()))
        .collect();
    assert_eq!(roots, vec![("a", false), ("b", true)]);
    assert_eq!(test.last_duration(), Some(Duration::from_millis(1500)));
    assert_eq!(
        test.last_run().map(TestRunResult::state),
        Some(TestState::Failed)
    );
}

#[test]
fn reruns_accumulate_sections() {
    let config = ReporterConfig::default();
    let processor = ReportProcessor::new(&config);
    let mut test = new_test("rerun");

    let first = processor
        .process(&mut test, RunInput::new(RERUN_FIRST))
        .expect("first run processes");
    assert_eq!(first.state(), TestState::Failed);
    assert_eq!(first.description(), " [✘1|✔︎0]");

    let second = processor
        .process(&mut test, RunInput::new(RERUN_SECOND))
        .expect("second run processes");
    assert_eq!(second.state(), TestState::Passed);
    assert_eq!(
        second.description(),
        " [✘1|✔︎1]",
        "A wasn't exercised, so it stays failed"
    );
    assert_eq!(
        lines(&second),
        vec![
            (Some(0), "⮑ \"outer\" (at line 2)"),
            (Some(1), "⮑ ✅ \"B\" (at line 6)"),
        ]
    );

    // The tree and last duration survive a reload of the test.
    let mut test = Catch2Test::new(
        TestInfo::new("rerun", Version::new(3, 4, 0)).with_location(Some("f.cpp"), Some(1)),
        Some(test),
    );
    assert_eq!(test.last_duration(), Some(Duration::from_millis(250)));

    let third = processor
        .process(&mut test, RunInput::new(RERUN_THIRD))
        .expect("third run processes");
    assert_eq!(third.description(), " [✔︎2]", "A flips back to succeeded");
    assert_eq!(test.last_duration(), Some(Duration::from_millis(250)));

    let sections = test.sections();
    let outer = sections
        .find(
            SectionParent::Root,
            &SectionKey::new("outer", Some("f.cpp"), 2),
        )
        .expect("outer exists");
    let children: Vec<_> = sections[outer]
        .children()
        .map(|id| (sections[id].name(), sections[id].failed()))
        .collect();
    assert_eq!(children, vec![("A", false), ("B", false)]);
    assert_eq!(sections.len(), 3);
}

#[test]
fn benchmark_is_rendered() {
    let config = ReporterConfig::default();
    let mut test = new_test("bench");

    let result = ReportProcessor::new(&config)
        .process(&mut test, RunInput::new(BENCHMARK))
        .expect("report processes");

    assert_eq!(result.state(), TestState::Passed);
    assert_eq!(result.description(), "");
    assert!(test.sections().is_empty());

    let message = result.message();
    assert!(message.contains("⮑ benchmark of \"Fibonacci 20\""), "{message}");
    assert!(
        message.contains("  Mean: 12.3 ns  (lowerBound: 11.0 ns, upperBound: 13.9 ns, ci: 0.95 ns)"),
        "{message}"
    );
    assert!(
        message.contains("  Outliers: variance: 0.01 ns, lowMild: 1 ns"),
        "{message}"
    );
    assert!(
        message.contains("  Parameters: samples: 100, resamples: 100000"),
        "{message}"
    );
}

#[test]
fn unexpected_tag_forces_errored() {
    let config = ReporterConfig::default();
    let mut test = new_test("drift");

    let result = ReportProcessor::new(&config)
        .process(&mut test, RunInput::new(UNEXPECTED_TAG))
        .expect("report processes");

    assert_eq!(result.state(), TestState::Errored);
    assert_eq!(
        lines(&result),
        vec![
            (Some(0), "⬇ Info:"),
            (Some(1), "still rendered"),
            (Some(0), "⬆ Info"),
            (Some(0), "⮑ ✅ \"s\" (at line 2)"),
            (Some(1), "unexpected Catch2 tag: Skip"),
        ]
    );
}

#[test]
fn passing_with_messages() {
    let config = ReporterConfig::default();
    let mut test = new_test("chatty");

    let result = ReportProcessor::new(&config)
        .process(
            &mut test,
            RunInput::new(indoc! {r#"
                <TestCase name="chatty" filename="f.cpp" line="1">
                  <Info>hello</Info>
                  <Warning filename="f.cpp" line="3">careful</Warning>
                  <OverallResult success="true"/>
                </TestCase>
            "#}),
        )
        .expect("report processes");

    assert_eq!(result.state(), TestState::Passed);
    assert_eq!(result.duration_ms(), None);
    assert_eq!(
        result.message(),
        indoc! {"
            ⬇ Info:
              hello
            ⬆ Info
            ⬇ Warning:
              careful
            ⬆ Warning"}
    );
}

#[test]
fn fatal_error_condition() {
    let config = ReporterConfig::default();
    let mut test = new_test("crashes");

    let result = ReportProcessor::new(&config)
        .process(&mut test, RunInput::new(FATAL))
        .expect("report processes");

    assert_eq!(result.state(), TestState::Failed);
    assert_eq!(
        lines(&result),
        vec![
            (Some(0), "⬇ FatalErrorCondition:"),
            (Some(0), "SIGSEGV - Segmentation violation signal"),
            (Some(0), "⬆ FatalErrorCondition"),
            (Some(0), "⬇ std::err:"),
            (Some(1), "about to crash"),
            (Some(0), "⬆ std::err"),
        ]
    );
    assert_eq!(result.decorations()[0].line(), 6);
}

#[test]
fn degenerate_content_is_rendered_with_fallbacks() {
    let config = ReporterConfig::default();
    let mut test = new_test("degenerate");

    let result = ReportProcessor::new(&config)
        .process(&mut test, RunInput::new(DEGENERATE))
        .expect("report processes");

    assert_eq!(result.state(), TestState::Errored);
    assert_eq!(
        lines(&result),
        vec![
            (Some(0), "unexpected Catch2 tag: Bogus"),
            (Some(0), "⬇ Failure:"),
            (Some(1), "Failure reported without a message"),
            (Some(0), "⬆ Failure"),
            (
                Some(0),
                "Exception were thrown: \"exception without a message\""
            ),
            (Some(0), "⬇ FatalErrorCondition:"),
            (
                Some(0),
                "Unknown fatal error: invalid value `x` for attribute `line` on <FatalErrorCondition>"
            ),
            (Some(0), "⬆ FatalErrorCondition"),
        ]
    );

    let decorations: Vec<_> = result
        .decorations()
        .iter()
        .map(|decoration| (decoration.line(), decoration.label()))
        .collect();
    assert_eq!(
        decorations,
        vec![
            (2, "⬅ Failure reported without a message"),
            (3, "⬅ Exception were thrown: \"exception without a message\""),
        ]
    );
}

#[test]
fn external_stderr_block() {
    let config = ReporterConfig::default();
    let mut test = new_test("t");

    let result = ReportProcessor::new(&config)
        .process(
            &mut test,
            RunInput::new(r#"<TestCase name="t"><OverallResult success="true"/></TestCase>"#)
                .with_stderr("line one\nline two"),
        )
        .expect("report processes");

    assert_eq!(
        result.message(),
        indoc! {"
            stderr arrived during running this test >>>
              line one
              line two
            <<<"}
    );

    let result = ReportProcessor::new(&config)
        .process(
            &mut test,
            RunInput::new(r#"<TestCase name="t"><OverallResult success="true"/></TestCase>"#)
                .with_stderr(""),
        )
        .expect("report processes");
    assert!(result.entries().is_empty(), "empty stderr is skipped");
}

#[test]
fn timeout_short_circuits() {
    let config = ReporterConfig::default();
    let mut test = new_test("slow");

    let result = ReportProcessor::new(&config)
        .process(
            &mut test,
            RunInput::new("this is not <xml").with_timeout(Duration::from_secs(5)),
        )
        .expect("timeouts never parse the report");

    assert_eq!(result.state(), TestState::Errored);
    assert_eq!(result.duration_ms(), Some(5000.0));
    assert_eq!(
        result.message(),
        "⌛️ Timed out: the test did not finish within 5 second(s)."
    );
    assert!(test.sections().is_empty());
    assert_eq!(
        test.last_run().map(TestRunResult::state),
        Some(TestState::Errored)
    );

    let config = ReporterConfig::from_toml_str(
        Utf8Path::new("catch2-report.toml"),
        indoc! {r#"
            [processing]
            timeout-verdict = "failed"
        "#},
    )
    .expect("config is valid");
    let result = ReportProcessor::new(&config)
        .process(
            &mut test,
            RunInput::new("").with_timeout(Duration::from_millis(1500)),
        )
        .expect("timeouts never parse the report");
    assert_eq!(result.state(), TestState::Failed);
    assert_eq!(
        result.message(),
        "⌛️ Timed out: the test did not finish within 1.5 second(s)."
    );
}

#[test]
fn invalid_xml_is_fatal() {
    let config = ReporterConfig::default();
    let mut test = new_test("t");

    let err = ReportProcessor::new(&config)
        .process(
            &mut test,
            RunInput::new(r#"<TestCase name="t"><Section name="s">"#),
        )
        .unwrap_err();

    assert!(
        matches!(
            err,
            ProcessReportError::Parse(ParseError::UnclosedElement { .. })
        ),
        "unexpected error: {err}"
    );
    assert!(test.last_run().is_none());
    assert!(test.sections().is_empty());
}

#[test]
fn missing_overall_result_is_fatal() {
    let config = ReporterConfig::default();
    let mut test = new_test("t");

    let err = ReportProcessor::new(&config)
        .process(
            &mut test,
            RunInput::new(indoc! {r#"
                <TestCase name="t">
                  <Section name="s" filename="f.cpp" line="2"/>
                </TestCase>
            "#}),
        )
        .unwrap_err();

    assert!(
        matches!(&err, ProcessReportError::MissingOverallResult { test_name } if test_name == "t"),
        "unexpected error: {err}"
    );
    assert!(test.sections().is_empty(), "nothing is merged");
}
