pub mod ast;
pub mod collect;
pub mod config;
pub mod env;
pub mod filter;
#[cfg(feature = "serde")]
pub mod io;
pub mod parser;
pub mod patch;
pub mod pipeline;
pub mod position_map;
pub mod span;

// Re-exports for convenience
pub use ast::{Attribute, AttributeValue, Document, Element, Node, NodeKind, NodeRef};
pub use span::{Span, Spanned};

pub use collect::{AttributeMatch, collect_matches, collect_spans};
pub use config::{ConfigError, PipelineConfig, StripOptions, TargetAttributes};
pub use env::{EnvVarGate, EnvironmentGate, FixedEnvironment};
pub use filter::{AcceptAll, FileFilter, GlobFilter};
pub use parser::{ComponentParser, MarkupParser, ParseError, parse_document};
pub use patch::{EditResult, PatchError};
pub use pipeline::{
    AttributeStripPipeline, Diagnostic, Outcome, PipelineBuilder, SkipReason, StripError,
};
pub use position_map::{PositionMap, Segment};

#[cfg(feature = "serde")]
pub use io::{
    IoError, load_options, parse_options, parse_options_json, save_options, serialize_options,
};
