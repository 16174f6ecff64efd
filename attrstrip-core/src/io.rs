//! Reading and writing option files.
//!
//! Options are stored as YAML (`.yml`, `.yaml`) or JSON (`.json`). Every
//! key is optional and falls back to the [`StripOptions`] default; unknown
//! keys are rejected.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::StripOptions;

/// Error type for I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("failed to read file: {0}")]
    ReadFile(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported options file '{}': expected .yml, .yaml or .json", .0.display())]
    UnsupportedFormat(PathBuf),
}

enum Format {
    Yaml,
    Json,
}

fn format_of(path: &Path) -> Result<Format, IoError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yml" | "yaml") => Ok(Format::Yaml),
        Some("json") => Ok(Format::Json),
        _ => Err(IoError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Parse options from a YAML string.
pub fn parse_options(yaml: &str) -> Result<StripOptions, IoError> {
    if yaml.trim().is_empty() {
        return Ok(StripOptions::default());
    }
    Ok(serde_yaml_ng::from_str(yaml)?)
}

/// Parse options from a JSON string.
pub fn parse_options_json(json: &str) -> Result<StripOptions, IoError> {
    Ok(serde_json::from_str(json)?)
}

/// Load options from a file, picking the format from its extension.
pub fn load_options(path: &Path) -> Result<StripOptions, IoError> {
    let format = format_of(path)?;
    let content = fs::read_to_string(path)?;
    match format {
        Format::Yaml => parse_options(&content),
        Format::Json => parse_options_json(&content),
    }
}

/// Serialize options to a YAML string.
pub fn serialize_options(options: &StripOptions) -> Result<String, IoError> {
    Ok(serde_yaml_ng::to_string(options)?)
}

/// Save options to a file, picking the format from its extension.
pub fn save_options(options: &StripOptions, path: &Path) -> Result<(), IoError> {
    let content = match format_of(path)? {
        Format::Yaml => serialize_options(options)?,
        Format::Json => serde_json::to_string_pretty(options)?,
    };
    fs::write(path, content)?;
    Ok(())
}
