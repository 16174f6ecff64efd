//! File eligibility.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::ConfigError;

/// Decides whether a file should go through the pipeline at all.
pub trait FileFilter: Send + Sync {
    fn should_process(&self, filename: &str) -> bool;
}

/// Include/exclude glob filter.
///
/// A file is processed when it matches at least one include pattern (or no
/// include patterns are configured) and matches no exclude pattern.
#[derive(Debug, Clone)]
pub struct GlobFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl GlobFilter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, ConfigError> {
        Ok(Self {
            include: build_set("include", include)?,
            exclude: build_set("exclude", exclude)?,
        })
    }
}

/// Compile the patterns of one option; `field` names it in errors.
pub(crate) fn build_set<S: AsRef<str>>(
    field: &'static str,
    patterns: &[S],
) -> Result<GlobSet, ConfigError> {
    let invalid = |pattern: &str, e: &globset::Error| ConfigError::InvalidPattern {
        field,
        pattern: pattern.to_string(),
        message: e.kind().to_string(),
    };

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        builder.add(Glob::new(pattern).map_err(|e| invalid(pattern, &e))?);
    }
    builder
        .build()
        .map_err(|e| invalid(e.glob().unwrap_or_default(), &e))
}

impl FileFilter for GlobFilter {
    fn should_process(&self, filename: &str) -> bool {
        // Match the same way on every platform.
        let normalized = filename.replace('\\', "/");
        let included = self.include.is_empty() || self.include.is_match(&normalized);
        included && !self.exclude.is_match(&normalized)
    }
}

/// Accepts every file.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl FileFilter for AcceptAll {
    fn should_process(&self, _filename: &str) -> bool {
        true
    }
}
