//! Shared test utilities for attrstrip tests.
//!
//! Provides helper functions for:
//! - Building pipelines pinned to a known environment
//! - Stripping inline markup and unwrapping the result
//! - Counting parser invocations

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use attrstrip_core::{
    AttributeStripPipeline, ComponentParser, Document, FixedEnvironment, MarkupParser, Outcome,
    ParseError, StripOptions,
};

// ============================================================================
// Pipeline Helpers
// ============================================================================

/// A pipeline with the given options running in `production`.
pub fn production_pipeline(options: StripOptions) -> AttributeStripPipeline {
    AttributeStripPipeline::builder(options)
        .environment(FixedEnvironment::new("production"))
        .build()
}

/// Strip `source` as `App.svelte` with default options in production.
///
/// Skipped files come back unchanged.
pub fn strip(source: &str) -> String {
    strip_with(&production_pipeline(StripOptions::default()), source)
}

/// Strip `source` as `App.svelte` with the given pipeline.
pub fn strip_with(pipeline: &AttributeStripPipeline, source: &str) -> String {
    match pipeline
        .process(source, Some("App.svelte"), false)
        .expect("markup should strip")
    {
        Outcome::Skipped(_) => source.to_string(),
        Outcome::Processed(edit) => edit.code.into_owned(),
    }
}

// ============================================================================
// Counting Parser
// ============================================================================

/// Wraps [`ComponentParser`] and counts how often it is called.
#[derive(Clone, Default)]
pub struct CountingParser {
    calls: Arc<AtomicUsize>,
}

impl CountingParser {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MarkupParser for CountingParser {
    fn parse(&self, source: &str, filename: Option<&str>) -> Result<Document, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ComponentParser.parse(source, filename)
    }
}
