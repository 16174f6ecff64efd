//! The attribute stripping pipeline.
//!
//! A pipeline is built once per build from [`StripOptions`] and then asked to
//! [`process`](AttributeStripPipeline::process) each file. Per file it runs:
//!
//! 1. gate: inert pipelines and filtered-out files are skipped
//! 2. pre-scan: files that never mention a target name are skipped
//! 3. parse, collect, patch
//!
//! Configuration and environment problems make the pipeline inert instead of
//! failing the build. Parse failures are returned as errors.

use memchr::memmem::Finder;

use crate::collect::collect_spans;
use crate::config::{ConfigError, PipelineConfig, StripOptions};
use crate::env::{EnvVarGate, EnvironmentGate};
use crate::filter::{FileFilter, GlobFilter};
use crate::parser::{ComponentParser, MarkupParser, ParseError};
use crate::patch::{EditResult, PatchError, apply};

/// Why a file was left alone without being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The pipeline is disabled (bad configuration or inactive environment).
    Inert,
    /// The file filter rejected the file.
    Filtered,
    /// No target attribute name occurs anywhere in the text.
    NoCandidates,
}

/// Result of processing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<'a> {
    Skipped(SkipReason),
    Processed(EditResult<'a>),
}

impl<'a> Outcome<'a> {
    /// The edit, if the file was processed.
    pub fn edit(&self) -> Option<&EditResult<'a>> {
        match self {
            Outcome::Processed(edit) => Some(edit),
            Outcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }
}

/// Error that aborts processing of a single file.
#[derive(Debug, thiserror::Error)]
pub enum StripError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{source_name}: refusing to apply attribute spans: {error}")]
    Patch {
        source_name: String,
        #[source]
        error: PatchError,
    },
}

/// Something the pipeline noticed while being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Options failed validation; the pipeline is inert.
    InvalidConfig(ConfigError),
    /// The current environment could not be determined; the pipeline is inert.
    EnvironmentUnresolved,
    /// The current environment is not one of the configured ones.
    EnvironmentInactive { current: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::InvalidConfig(e) => write!(f, "invalid configuration: {e}"),
            Diagnostic::EnvironmentUnresolved => {
                write!(f, "current environment is not set, attributes are kept")
            }
            Diagnostic::EnvironmentInactive { current } => {
                write!(f, "environment '{current}' is not active, attributes are kept")
            }
        }
    }
}

struct Active {
    config: PipelineConfig,
    filter: Box<dyn FileFilter>,
    finders: Vec<Finder<'static>>,
}

/// Removes configured attributes from markup documents.
///
/// The pipeline holds only immutable state, so one instance can serve many
/// threads at once.
pub struct AttributeStripPipeline {
    active: Option<Active>,
    parser: Box<dyn MarkupParser>,
    diagnostics: Vec<Diagnostic>,
}

impl std::fmt::Debug for AttributeStripPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeStripPipeline")
            .field("config", &self.active.as_ref().map(|a| &a.config))
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

impl AttributeStripPipeline {
    pub fn builder(options: StripOptions) -> PipelineBuilder {
        PipelineBuilder::new(options)
    }

    /// Build with the default parser, glob filter and `NODE_ENV` gate.
    pub fn new(options: StripOptions) -> Self {
        PipelineBuilder::new(options).build()
    }

    /// Whether files can be stripped at all.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The validated configuration, unless validation failed.
    pub fn config(&self) -> Option<&PipelineConfig> {
        self.active.as_ref().map(|a| &a.config)
    }

    /// Everything reported while building the pipeline.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Strip target attributes from `source`.
    ///
    /// `filename` feeds the file filter and parse error messages. A position
    /// map is produced only when `want_map` is set and a filename is given.
    pub fn process<'a>(
        &self,
        source: &'a str,
        filename: Option<&str>,
        want_map: bool,
    ) -> Result<Outcome<'a>, StripError> {
        let Some(active) = &self.active else {
            return Ok(Outcome::Skipped(SkipReason::Inert));
        };

        if let Some(name) = filename
            && !active.filter.should_process(name)
        {
            log::trace!("{name}: excluded by file filter");
            return Ok(Outcome::Skipped(SkipReason::Filtered));
        }

        let haystack = source.as_bytes();
        if !active.finders.iter().any(|f| f.find(haystack).is_some()) {
            return Ok(Outcome::Skipped(SkipReason::NoCandidates));
        }

        let document = self.parser.parse(source, filename)?;
        let spans = collect_spans(&document, active.config.target_attributes());
        let want_map = want_map && filename.is_some();

        if spans.is_empty() {
            return Ok(Outcome::Processed(EditResult::unchanged(source, want_map)));
        }

        let edit = apply(source, &spans, want_map).map_err(|error| StripError::Patch {
            source_name: filename.unwrap_or("<input>").to_string(),
            error,
        })?;

        log::debug!(
            "{}: removed {} attribute(s), {} byte(s)",
            filename.unwrap_or("<input>"),
            spans.len(),
            source.len() - edit.code.len()
        );

        Ok(Outcome::Processed(edit))
    }
}

/// Builder for [`AttributeStripPipeline`] with replaceable collaborators.
pub struct PipelineBuilder {
    options: StripOptions,
    gate: Option<Box<dyn EnvironmentGate>>,
    parser: Option<Box<dyn MarkupParser>>,
    filter: Option<Box<dyn FileFilter>>,
}

impl PipelineBuilder {
    pub fn new(options: StripOptions) -> Self {
        Self {
            options,
            gate: None,
            parser: None,
            filter: None,
        }
    }

    /// Where the current environment comes from. Defaults to `NODE_ENV`.
    pub fn environment(mut self, gate: impl EnvironmentGate + 'static) -> Self {
        self.gate = Some(Box::new(gate));
        self
    }

    /// Defaults to [`ComponentParser`].
    pub fn parser(mut self, parser: impl MarkupParser + 'static) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Defaults to a [`GlobFilter`] over the configured patterns.
    pub fn filter(mut self, filter: impl FileFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Validate the options and resolve the environment, once.
    ///
    /// Never fails: problems are logged, recorded as diagnostics and leave
    /// the pipeline inert.
    pub fn build(self) -> AttributeStripPipeline {
        let parser = self.parser.unwrap_or_else(|| Box::new(ComponentParser));
        let mut diagnostics = Vec::new();
        let active = activate(self.options, self.gate, self.filter, &mut diagnostics);

        AttributeStripPipeline {
            active,
            parser,
            diagnostics,
        }
    }
}

fn activate(
    options: StripOptions,
    gate: Option<Box<dyn EnvironmentGate>>,
    filter: Option<Box<dyn FileFilter>>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Active> {
    let debug = options.debug;
    let config = match PipelineConfig::validate(options) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("attribute stripping disabled: {e}");
            diagnostics.push(Diagnostic::InvalidConfig(e));
            return None;
        }
    };

    let gate = gate.unwrap_or_else(|| Box::new(EnvVarGate::default()));
    let inactive = match gate.current_environment() {
        None => Some(Diagnostic::EnvironmentUnresolved),
        Some(current) if !config.is_active_in(&current) => {
            Some(Diagnostic::EnvironmentInactive { current })
        }
        Some(_) => None,
    };
    if let Some(diagnostic) = inactive {
        if debug {
            log::warn!("attribute stripping disabled: {diagnostic}");
        }
        diagnostics.push(diagnostic);
        return None;
    }

    let filter = match filter {
        Some(filter) => filter,
        None => match GlobFilter::new(config.include(), config.exclude()) {
            Ok(filter) => Box::new(filter),
            Err(error) => {
                log::warn!("attribute stripping disabled: {error}");
                diagnostics.push(Diagnostic::InvalidConfig(error));
                return None;
            }
        },
    };

    let finders = config
        .target_attributes()
        .iter()
        .map(|name| Finder::new(name).into_owned())
        .collect();

    log::debug!(
        "stripping attributes [{}]",
        config.target_attributes().iter().collect::<Vec<_>>().join(", ")
    );

    Some(Active {
        config,
        filter,
        finders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::FixedEnvironment;
    use crate::filter::AcceptAll;

    fn production(options: StripOptions) -> AttributeStripPipeline {
        AttributeStripPipeline::builder(options)
            .environment(FixedEnvironment::new("production"))
            .build()
    }

    #[test]
    fn strips_in_active_environment() {
        let pipeline = production(StripOptions::default());
        let src = r#"<div data-testid="x" class="y">hi</div>"#;
        let outcome = pipeline.process(src, Some("App.svelte"), false).expect("ok");
        let edit = outcome.edit().expect("processed");
        assert_eq!(edit.code, r#"<div class="y">hi</div>"#);
        assert!(edit.map.is_none());
    }

    #[test]
    fn filtered_files_are_skipped() {
        let pipeline = production(StripOptions::default());
        let outcome = pipeline
            .process(r#"<p data-testid="x"></p>"#, Some("index.html"), false)
            .expect("ok");
        assert_eq!(outcome, Outcome::Skipped(SkipReason::Filtered));
    }

    #[test]
    fn injected_filter_replaces_the_globs() {
        let pipeline = AttributeStripPipeline::builder(StripOptions::default())
            .environment(FixedEnvironment::new("production"))
            .filter(AcceptAll)
            .build();
        let outcome = pipeline
            .process(r#"<p data-testid="x"></p>"#, Some("index.html"), false)
            .expect("ok");
        assert_eq!(outcome.edit().map(|e| &*e.code), Some("<p></p>"));
    }

    #[test]
    fn anonymous_input_bypasses_the_filter() {
        let pipeline = production(StripOptions::default());
        let outcome = pipeline.process(r#"<p data-testid="x"></p>"#, None, true).expect("ok");
        let edit = outcome.edit().expect("processed");
        assert_eq!(edit.code, "<p></p>");
        assert!(edit.map.is_none(), "no map without a filename");
    }

    #[test]
    fn no_candidates_skips_before_parsing() {
        let pipeline = production(StripOptions::default());
        // Not valid markup, but the pre-scan never lets it reach the parser.
        let outcome = pipeline.process("<div <<", Some("A.svelte"), false).expect("ok");
        assert_eq!(outcome, Outcome::Skipped(SkipReason::NoCandidates));
    }

    #[test]
    fn candidate_without_attribute_returns_input() {
        let pipeline = production(StripOptions::default());
        let src = "<p>data-testid</p>";
        let outcome = pipeline.process(src, Some("A.svelte"), true).expect("ok");
        let edit = outcome.edit().expect("processed");
        assert!(!edit.is_modified());
        assert_eq!(edit.code, src);
        assert_eq!(edit.map.as_ref().map(|m| m.generated_len()), Some(src.len()));
    }

    #[test]
    fn parse_errors_propagate() {
        let pipeline = production(StripOptions::default());
        let err = pipeline
            .process(r#"<div data-testid="x">"#, Some("Broken.svelte"), false)
            .unwrap_err();
        assert!(matches!(err, StripError::Parse(ParseError::UnclosedElement { .. })));
        assert!(err.to_string().starts_with("Broken.svelte:0:"));
    }

    #[test]
    fn inactive_environment_is_recorded() {
        let pipeline = AttributeStripPipeline::builder(StripOptions::default())
            .environment(FixedEnvironment::new("development"))
            .build();
        assert!(!pipeline.is_active());
        assert_eq!(
            pipeline.diagnostics(),
            &[Diagnostic::EnvironmentInactive {
                current: "development".into()
            }]
        );
    }

    #[test]
    fn unresolved_environment_is_inert() {
        let pipeline = AttributeStripPipeline::builder(StripOptions::default().debug(true))
            .environment(FixedEnvironment::unresolved())
            .build();
        let outcome = pipeline
            .process(r#"<p data-testid="x"></p>"#, Some("A.svelte"), false)
            .expect("ok");
        assert_eq!(outcome, Outcome::Skipped(SkipReason::Inert));
        assert_eq!(pipeline.diagnostics(), &[Diagnostic::EnvironmentUnresolved]);
    }
}
