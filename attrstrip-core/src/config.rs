//! Stripping configuration.
//!
//! [`StripOptions`] is the raw, user-facing option set (what a config file or
//! CLI flags produce). [`PipelineConfig`] is the validated form a pipeline
//! runs with; it can only be obtained through [`PipelineConfig::validate`].

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Attribute stripped when no `attributes` are configured.
pub const DEFAULT_ATTRIBUTE: &str = "data-testid";
/// Files eligible for processing by default.
pub const DEFAULT_INCLUDE: &str = "**/*.svelte";
/// Files never processed by default.
pub const DEFAULT_EXCLUDE: &str = "**/node_modules/**";
/// Environment in which stripping is active by default.
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// User-facing options, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct StripOptions {
    /// Attribute names to strip (exact, case-sensitive).
    pub attributes: Vec<String>,
    /// Glob patterns of files eligible for processing. Empty means all files.
    pub include: Vec<String>,
    /// Glob patterns of files never processed, even if included.
    pub exclude: Vec<String>,
    /// Environments in which stripping is active (case-insensitive).
    pub environments: Vec<String>,
    /// Log why the pipeline is inert.
    pub debug: bool,
}

impl Default for StripOptions {
    fn default() -> Self {
        Self {
            attributes: vec![DEFAULT_ATTRIBUTE.to_string()],
            include: vec![DEFAULT_INCLUDE.to_string()],
            exclude: vec![DEFAULT_EXCLUDE.to_string()],
            environments: vec![DEFAULT_ENVIRONMENT.to_string()],
            debug: false,
        }
    }
}

impl StripOptions {
    /// Replace the attribute names to strip.
    pub fn attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = names.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the environments in which stripping is active.
    pub fn environments<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environments = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Error found while validating [`StripOptions`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("`attributes` must name at least one attribute")]
    NoAttributes,

    #[error("`attributes` must not contain blank names")]
    BlankAttribute,

    #[error("`environments` must be a non-empty list of environment names")]
    NoEnvironments,

    #[error("`environments` must not contain blank names")]
    BlankEnvironment,

    #[error("invalid `{field}` pattern '{pattern}': {message}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        message: String,
    },
}

/// The set of attribute names a pipeline removes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetAttributes {
    names: BTreeSet<String>,
}

impl TargetAttributes {
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for TargetAttributes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Validated, immutable configuration for one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    target_attributes: TargetAttributes,
    include: Vec<String>,
    exclude: Vec<String>,
    /// Lowercased.
    active_environments: BTreeSet<String>,
    debug: bool,
}

impl PipelineConfig {
    /// Validate raw options. This is a pure check; reporting the error is up
    /// to the caller.
    pub fn validate(options: StripOptions) -> Result<Self, ConfigError> {
        if options.attributes.is_empty() {
            return Err(ConfigError::NoAttributes);
        }
        if options.attributes.iter().any(|a| a.trim().is_empty()) {
            return Err(ConfigError::BlankAttribute);
        }
        if options.environments.is_empty() {
            return Err(ConfigError::NoEnvironments);
        }
        if options.environments.iter().any(|e| e.trim().is_empty()) {
            return Err(ConfigError::BlankEnvironment);
        }

        check_patterns("include", &options.include)?;
        check_patterns("exclude", &options.exclude)?;

        Ok(Self {
            target_attributes: options.attributes.into_iter().collect(),
            include: options.include,
            exclude: options.exclude,
            active_environments: options
                .environments
                .iter()
                .map(|e| e.trim().to_lowercase())
                .collect(),
            debug: options.debug,
        })
    }

    pub fn target_attributes(&self) -> &TargetAttributes {
        &self.target_attributes
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Whether stripping runs in `environment` (case-insensitive).
    pub fn is_active_in(&self, environment: &str) -> bool {
        self.active_environments
            .contains(&environment.trim().to_lowercase())
    }
}

fn check_patterns(field: &'static str, patterns: &[String]) -> Result<(), ConfigError> {
    crate::filter::build_set(field, patterns).map(drop)
}
