// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::ExpectedError,
    exit_codes::Catch2ExitCode,
    output::{OutputContext, OutputOpts, OutputWriter, StdoutStyles, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use catch2_reporter::{
    Catch2Test, ReportProcessor, RunInput, TestInfo, TestRunResult, TestState,
    config::ReporterConfig,
};
use catch2_xml::TestCaseReport;
use clap::{Parser, ValueEnum};
use owo_colors::OwoColorize;
use semver::Version;
use serde::Serialize;
use std::{io::Write, time::Duration};
use tracing::{debug, info};

/// Summarize Catch2 XML test reports.
///
/// Each REPORT is the output of one run of the same test case with `--reporter xml`. Runs are
/// processed in order, so sections explored by earlier runs show up in the summary of later ones.
/// The result of the last run is printed.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct Catch2ReportApp {
    /// XML reports, oldest first
    #[arg(required = true, value_name = "REPORT")]
    reports: Vec<Utf8PathBuf>,

    /// Random seed the last run was started with
    #[arg(long, value_name = "N")]
    rng_seed: Option<u64>,

    /// File holding the standard error captured from the last run
    #[arg(long, value_name = "PATH")]
    stderr_file: Option<Utf8PathBuf>,

    /// Treat the last run as killed after this many seconds
    #[arg(long, value_name = "SECS", value_parser = parse_timeout)]
    timed_out_after: Option<Duration>,

    /// Catch2 version the test binary was built with [default: newest]
    #[arg(long, value_name = "SEMVER", value_parser = Version::parse)]
    framework_version: Option<Version>,

    /// Config file [default: .config/catch2-report.toml]
    #[arg(long, value_name = "PATH")]
    config: Option<Utf8PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t, value_name = "FORMAT")]
    message_format: MessageFormat,

    #[command(flatten)]
    output: OutputOpts,
}

impl Catch2ReportApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(
        self,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError> {
        let config = ReporterConfig::from_sources(self.config.as_deref(), Utf8Path::new("."))?;
        debug!(
            "max section depth: {}, timeout verdict: {}",
            config.max_section_depth(),
            config.timeout_verdict()
        );

        let contents = self
            .reports
            .iter()
            .map(|path| {
                std::fs::read_to_string(path)
                    .map_err(|err| ExpectedError::report_read_error(path, err))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let stderr = self
            .stderr_file
            .as_ref()
            .map(|path| {
                std::fs::read_to_string(path)
                    .map_err(|err| ExpectedError::stderr_read_error(path, err))
            })
            .transpose()?;

        let mut test = Catch2Test::new(self.test_info(&contents), None);

        let result = match test.forced_error(config.name_workaround()) {
            Some(result) => {
                info!(
                    "test `{}` can't be selected by Catch2 {}, skipping its reports",
                    test.name(),
                    test.framework_version()
                );
                result
            }
            None => self.process_runs(&config, &mut test, &contents, stderr.as_deref())?,
        };

        let mut writer = output_writer.stdout_writer();
        match self.message_format {
            MessageFormat::Human => {
                write_human(&test, &result, &output.stdout_styles(), &mut writer)
                    .map_err(|err| ExpectedError::WriteOutputError { err })?;
            }
            MessageFormat::Json | MessageFormat::JsonPretty => {
                let summary = JsonSummary::new(&test, &result);
                let res = if self.message_format == MessageFormat::JsonPretty {
                    serde_json::to_writer_pretty(&mut writer, &summary)
                } else {
                    serde_json::to_writer(&mut writer, &summary)
                };
                res.map_err(|err| ExpectedError::SerializeError { err })?;
                writeln!(writer).map_err(|err| ExpectedError::WriteOutputError { err })?;
            }
        }
        writer
            .flush()
            .map_err(|err| ExpectedError::WriteOutputError { err })?;

        Ok(match result.state() {
            TestState::Passed => Catch2ExitCode::OK,
            TestState::Failed | TestState::Errored => Catch2ExitCode::TEST_FAILED,
        })
    }

    /// Builds the test from the first report that names it.
    fn test_info(&self, contents: &[String]) -> TestInfo {
        // Without a version, assume one recent enough to need no workarounds.
        let framework_version = self
            .framework_version
            .clone()
            .unwrap_or_else(|| Version::new(u64::MAX, 0, 0));

        for content in contents {
            if let Ok(report) = TestCaseReport::parse(content) {
                let line = report.line().ok().flatten();
                return TestInfo::new(report.name(), framework_version)
                    .with_location(report.filename(), line);
            }
        }

        // No report could be parsed: the run was cut short before Catch2 wrote anything useful.
        let name = self.reports[0].file_stem().unwrap_or("unknown");
        TestInfo::new(name, framework_version)
    }

    fn process_runs(
        &self,
        config: &ReporterConfig,
        test: &mut Catch2Test,
        contents: &[String],
        stderr: Option<&str>,
    ) -> Result<TestRunResult, ExpectedError> {
        let processor = ReportProcessor::new(config);
        let last = contents.len() - 1;
        let mut result = None;

        for (index, (path, content)) in self.reports.iter().zip(contents).enumerate() {
            let mut input = RunInput::new(content);
            if index == last {
                if let Some(seed) = self.rng_seed {
                    input = input.with_rng_seed(seed);
                }
                if let Some(stderr) = stderr {
                    input = input.with_stderr(stderr);
                }
                if let Some(timeout) = self.timed_out_after {
                    input = input.with_timeout(timeout);
                }
            }

            let run = processor
                .process(test, input)
                .map_err(|err| ExpectedError::process_report_error(path, err))?;
            debug!("run {} ({path}): {}", index + 1, run.state());
            result = Some(run);
        }

        // clap guarantees at least one report.
        Ok(result.expect("at least one report was processed"))
    }
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|err| format!("invalid number of seconds: {err}"))?;
    Duration::try_from_secs_f64(secs).map_err(|err| format!("invalid number of seconds: {err}"))
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum MessageFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON on a single line
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct JsonSummary<'a> {
    test: &'a str,
    result: &'a TestRunResult,
    branches: Option<JsonBranches>,
}

#[derive(Serialize)]
struct JsonBranches {
    failed: usize,
    succeeded: usize,
}

impl<'a> JsonSummary<'a> {
    fn new(test: &'a Catch2Test, result: &'a TestRunResult) -> Self {
        let branches = (!test.sections().is_empty()).then(|| {
            let summary = test.sections().summarize();
            JsonBranches {
                failed: summary.failed,
                succeeded: summary.succeeded,
            }
        });
        Self {
            test: test.name(),
            result,
            branches,
        }
    }
}

fn write_human(
    test: &Catch2Test,
    result: &TestRunResult,
    styles: &StdoutStyles,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    let status_style = match result.state() {
        TestState::Passed => styles.pass,
        TestState::Failed => styles.fail,
        TestState::Errored => styles.error,
    };
    let state = result.state().to_string().to_uppercase();
    write!(
        writer,
        "{:>7} {}",
        state.style(status_style),
        test.test_name_in_output().style(styles.bold)
    )?;
    if let Some(ms) = result.duration_ms() {
        write!(writer, " ({ms:.0} ms)")?;
    }
    let description = result.description().trim_start();
    if description.is_empty() {
        writeln!(writer)?;
    } else {
        writeln!(writer, " {description}")?;
    }

    let message = result.message();
    if !message.is_empty() {
        writeln!(writer)?;
        for line in message.lines() {
            writeln!(writer, "  {line}")?;
        }
    }

    if !result.decorations().is_empty() {
        writeln!(writer)?;
        for decoration in result.decorations() {
            let file = decoration.file().map_or("<unknown>", |file| file.as_str());
            writeln!(
                writer,
                "  {}: {}",
                format!("{file}:{}", decoration.line() + 1).style(styles.location),
                decoration.label()
            )?;
        }
    }

    Ok(())
}
