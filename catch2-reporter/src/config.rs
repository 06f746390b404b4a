// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for catch2-reporter.

use crate::{errors::ConfigReadError, event::TestState};
use camino::Utf8Path;
use semver::Version;
use serde::Deserialize;
use std::fmt;

/// Configuration for report processing.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReporterConfig {
    processing: ProcessingConfig,
    name_workaround: NameWorkaroundConfig,
}

impl ReporterConfig {
    /// The location of the repository config, relative to the directory passed into
    /// [`Self::from_sources`].
    pub const CONFIG_PATH: &'static str = ".config/catch2-report.toml";

    /// Contains the default config as a TOML file.
    ///
    /// The default settings are:
    ///
    /// ```toml
    #[doc = include_str!("../default-config.toml")]
    /// ```
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the given file, or if not specified from `.config/catch2-report.toml`
    /// in the given directory.
    ///
    /// If the file isn't specified and the directory doesn't have `.config/catch2-report.toml`,
    /// uses the default config options.
    pub fn from_sources(
        config_file: Option<&Utf8Path>,
        root: &Utf8Path,
    ) -> Result<Self, ConfigReadError> {
        let mut config = Self::default();

        let repo_config = match config_file {
            Some(file) => Some((file.to_owned(), Self::read_file(file)?)),
            None => {
                let default_file = root.join(Self::CONFIG_PATH);
                if default_file.is_file() {
                    let overlay = Self::read_file(&default_file)?;
                    Some((default_file, overlay))
                } else {
                    None
                }
            }
        };

        if let Some((file, overlay)) = repo_config {
            config.merge(&file, overlay)?;
        }

        Ok(config)
    }

    /// Layers the TOML in `contents` on top of the default config.
    ///
    /// `file` is only used in error messages.
    pub fn from_toml_str(file: &Utf8Path, contents: &str) -> Result<Self, ConfigReadError> {
        let overlay = toml::from_str(contents).map_err(|err| ConfigReadError::toml(file, err))?;
        let mut config = Self::default();
        config.merge(file, overlay)?;
        Ok(config)
    }

    /// Returns the maximum nesting depth of sections that are processed.
    pub fn max_section_depth(&self) -> usize {
        self.processing.max_section_depth
    }

    /// Returns the verdict given to a run that timed out.
    pub fn timeout_verdict(&self) -> TimeoutVerdict {
        self.processing.timeout_verdict
    }

    /// Returns the configuration of the workaround for test names Catch2 can't select.
    pub fn name_workaround(&self) -> &NameWorkaroundConfig {
        &self.name_workaround
    }

    // ---
    // Helper methods
    // ---

    fn read_file(file: &Utf8Path) -> Result<ConfigOverlay, ConfigReadError> {
        let data = std::fs::read_to_string(file).map_err(|err| ConfigReadError::read(file, err))?;
        toml::from_str(&data).map_err(|err| ConfigReadError::toml(file, err))
    }

    fn merge(&mut self, file: &Utf8Path, overlay: ConfigOverlay) -> Result<(), ConfigReadError> {
        let ConfigOverlay {
            processing,
            name_workaround,
        } = overlay;

        if let Some(depth) = processing.max_section_depth {
            if depth == 0 {
                return Err(ConfigReadError::invalid_value(
                    file,
                    "processing.max-section-depth",
                    "must be at least 1",
                ));
            }
            self.processing.max_section_depth = depth;
        }
        if let Some(verdict) = processing.timeout_verdict {
            self.processing.timeout_verdict = verdict;
        }

        if let Some(fixed_in) = name_workaround.fixed_in {
            self.name_workaround.fixed_in = fixed_in;
        }
        if let Some(bad_chars) = name_workaround.bad_chars {
            if bad_chars.iter().any(|c| c.is_empty()) {
                return Err(ConfigReadError::invalid_value(
                    file,
                    "name-workaround.bad-chars",
                    "must not contain empty strings",
                ));
            }
            self.name_workaround.bad_chars = bad_chars;
        }

        Ok(())
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        toml::from_str(Self::DEFAULT_CONFIG).expect("default config should be valid")
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ProcessingConfig {
    max_section_depth: usize,
    timeout_verdict: TimeoutVerdict,
}

/// Settings for the workaround for test names older Catch2 releases can't select.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NameWorkaroundConfig {
    fixed_in: Version,
    bad_chars: Vec<String>,
}

impl NameWorkaroundConfig {
    /// Returns the first Catch2 version that handles every test name.
    pub fn fixed_in(&self) -> &Version {
        &self.fixed_in
    }

    /// Returns the characters that break test selection in affected versions.
    pub fn bad_chars(&self) -> &[String] {
        &self.bad_chars
    }

    /// Returns true if a test with the given name can't be run by the given framework version.
    pub fn is_affected(&self, framework_version: &Version, test_name: &str) -> bool {
        framework_version < &self.fixed_in
            && self.bad_chars.iter().any(|c| test_name.contains(c.as_str()))
    }
}

/// The verdict given to a run that exceeded its time limit.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeoutVerdict {
    /// The run is reported as errored.
    Errored,
    /// The run is reported as failed.
    Failed,
}

impl TimeoutVerdict {
    /// Returns the test state corresponding to this verdict.
    pub fn to_state(self) -> TestState {
        match self {
            TimeoutVerdict::Errored => TestState::Errored,
            TimeoutVerdict::Failed => TestState::Failed,
        }
    }
}

impl fmt::Display for TimeoutVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutVerdict::Errored => write!(f, "errored"),
            TimeoutVerdict::Failed => write!(f, "failed"),
        }
    }
}

/// A repository config: every key is optional and overrides the default when present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ConfigOverlay {
    #[serde(default)]
    processing: ProcessingOverlay,
    #[serde(default)]
    name_workaround: NameWorkaroundOverlay,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ProcessingOverlay {
    max_section_depth: Option<usize>,
    timeout_verdict: Option<TimeoutVerdict>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct NameWorkaroundOverlay {
    fixed_in: Option<Version>,
    bad_chars: Option<Vec<String>>,
}
