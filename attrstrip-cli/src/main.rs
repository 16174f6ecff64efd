use attrstrip_core::{
    AttributeStripPipeline, EnvVarGate, FixedEnvironment, Outcome, PipelineConfig, SkipReason,
    StripOptions, collect_matches, load_options, parse_document, save_options,
};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "attrstrip")]
#[command(about = "Strip test-only attributes from component markup", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an options file with the default settings
    Init {
        /// Where to write the options (.yml, .yaml or .json)
        #[arg(default_value = "attrstrip.yml")]
        path: PathBuf,
    },

    /// Strip attributes from files
    Strip {
        /// Files to process
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        options: OptionArgs,

        /// Environment to run in (defaults to $NODE_ENV)
        #[arg(short, long)]
        environment: Option<String>,

        /// Write results into this directory
        #[arg(short, long, conflicts_with = "in_place")]
        out_dir: Option<PathBuf>,

        /// Overwrite the input files
        #[arg(long)]
        in_place: bool,

        /// Write a `.map` source map next to every stripped file
        #[arg(long)]
        source_map: bool,

        /// Explain why nothing is stripped when the pipeline is inert
        #[arg(long)]
        debug: bool,

        /// Output format for the summary
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the attributes that would be removed from a file
    Check {
        /// File to inspect
        file: PathBuf,

        #[command(flatten)]
        options: OptionArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(clap::Args)]
struct OptionArgs {
    /// Options file (.yml, .yaml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Attribute to strip; repeat for several (replaces the configured list)
    #[arg(short = 'a', long = "attribute")]
    attributes: Vec<String>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    }
}

#[derive(Debug)]
enum CliError {
    Io(std::io::Error),
    Config(String),
    Parse(String),
    Failed(usize),
    InvalidArgs(String),
}

impl CliError {
    fn exit_status(&self) -> u8 {
        match self {
            CliError::Io(_) => 2,
            CliError::Config(_) => 2,
            CliError::Parse(_) => 1,
            CliError::Failed(_) => 1,
            CliError::InvalidArgs(_) => 1,
        }
    }

    fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "IO error: {e}"),
            CliError::Config(msg) => write!(f, "Config error: {msg}"),
            CliError::Parse(msg) => write!(f, "Parse error: {msg}"),
            CliError::Failed(count) => write!(f, "{count} file(s) could not be processed"),
            CliError::InvalidArgs(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Init { path } => cmd_init(&path),
        Commands::Strip {
            files,
            options,
            environment,
            out_dir,
            in_place,
            source_map,
            debug,
            format,
        } => {
            let destination = match (out_dir, in_place) {
                (Some(dir), _) => Destination::Dir(dir),
                (None, true) => Destination::InPlace,
                (None, false) if files.len() == 1 && !source_map => Destination::Stdout,
                (None, false) if source_map => {
                    return Err(CliError::InvalidArgs(
                        "--source-map needs --out-dir or --in-place".to_string(),
                    ));
                }
                (None, false) => {
                    return Err(CliError::InvalidArgs(
                        "Multiple files need --out-dir or --in-place".to_string(),
                    ));
                }
            };
            let mut strip_options = resolve_options(&options)?;
            strip_options.debug |= debug;
            cmd_strip(
                &files,
                strip_options,
                environment,
                &destination,
                source_map,
                &format,
            )
        }
        Commands::Check {
            file,
            options,
            format,
        } => cmd_check(&file, resolve_options(&options)?, &format),
    }
}

fn resolve_options(args: &OptionArgs) -> Result<StripOptions, CliError> {
    let mut options = match &args.config {
        Some(path) => load_options(path).map_err(|e| CliError::Config(e.to_string()))?,
        None => StripOptions::default(),
    };
    if !args.attributes.is_empty() {
        options.attributes = args.attributes.clone();
    }
    Ok(options)
}

fn cmd_init(path: &Path) -> Result<(), CliError> {
    if path.exists() {
        return Err(CliError::InvalidArgs(format!(
            "File '{}' already exists",
            path.display()
        )));
    }

    save_options(&StripOptions::default(), path).map_err(|e| CliError::Config(e.to_string()))?;
    println!("Created options file: {}", path.display());
    Ok(())
}

// ============================================================================
// strip
// ============================================================================

enum Destination {
    Stdout,
    InPlace,
    Dir(PathBuf),
}

impl Destination {
    fn output_path(&self, input: &Path) -> Option<PathBuf> {
        match self {
            Destination::Stdout => None,
            Destination::InPlace => Some(input.to_path_buf()),
            Destination::Dir(dir) => {
                let nested = input.is_relative()
                    && input
                        .components()
                        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
                match (nested, input.file_name()) {
                    (true, _) | (false, None) => Some(dir.join(input)),
                    (false, Some(name)) => Some(dir.join(name)),
                }
            }
        }
    }

    /// In-place runs only rewrite files that were actually stripped.
    fn writes(&self, status: &FileStatus) -> bool {
        !matches!(self, Destination::InPlace) || matches!(status, FileStatus::Stripped { .. })
    }
}

/// Reject runs where two inputs would be written to the same output.
fn check_outputs(files: &[PathBuf], destination: &Destination) -> Result<(), CliError> {
    let mut seen: HashMap<PathBuf, &Path> = HashMap::new();
    for input in files {
        let Some(output) = destination.output_path(input) else {
            continue;
        };
        if let Some(previous) = seen.insert(output.clone(), input) {
            return Err(CliError::InvalidArgs(format!(
                "'{}' and '{}' would both be written to '{}'",
                previous.display(),
                input.display(),
                output.display()
            )));
        }
    }
    Ok(())
}

enum FileStatus {
    Skipped(SkipReason),
    Unchanged,
    Stripped { removed_bytes: usize },
    Failed(String),
}

struct FileReport {
    path: PathBuf,
    status: FileStatus,
}

fn cmd_strip(
    files: &[PathBuf],
    options: StripOptions,
    environment: Option<String>,
    destination: &Destination,
    source_map: bool,
    format: &OutputFormat,
) -> Result<(), CliError> {
    check_outputs(files, destination)?;

    let builder = AttributeStripPipeline::builder(options);
    let pipeline = match environment {
        Some(name) => builder.environment(FixedEnvironment::new(name)).build(),
        None => builder.environment(EnvVarGate::default()).build(),
    };

    let reports: Vec<FileReport> = files
        .par_iter()
        .map(|path| FileReport {
            path: path.clone(),
            status: strip_file(&pipeline, path, destination, source_map)
                .unwrap_or_else(|e| FileStatus::Failed(e.to_string())),
        })
        .collect();

    let stdout_mode = matches!(destination, Destination::Stdout);
    print_reports(&reports, format, stdout_mode);

    let failed = reports
        .iter()
        .filter(|r| matches!(r.status, FileStatus::Failed(_)))
        .count();
    if failed > 0 {
        return Err(CliError::Failed(failed));
    }
    Ok(())
}

fn strip_file(
    pipeline: &AttributeStripPipeline,
    path: &Path,
    destination: &Destination,
    source_map: bool,
) -> Result<FileStatus, CliError> {
    let source = fs::read_to_string(path)?;
    let name = path.to_string_lossy();

    let outcome = pipeline
        .process(&source, Some(&*name), source_map)
        .map_err(|e| CliError::Parse(e.to_string()))?;

    let (code, map, status) = match outcome {
        Outcome::Skipped(reason) => (source.as_str(), None, FileStatus::Skipped(reason)),
        Outcome::Processed(ref edit) if !edit.is_modified() => {
            (source.as_str(), None, FileStatus::Unchanged)
        }
        Outcome::Processed(ref edit) => (
            &*edit.code,
            edit.map.as_ref(),
            FileStatus::Stripped {
                removed_bytes: source.len() - edit.code.len(),
            },
        ),
    };

    let Some(output) = destination.output_path(path) else {
        print!("{code}");
        return Ok(status);
    };

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    if destination.writes(&status) {
        fs::write(&output, code)?;
        log::debug!("wrote {}", output.display());
    }

    if let Some(map) = map {
        let output_name = output.to_string_lossy();
        let sm = map.to_source_map(Some(&*output_name), &name, &source);
        let mut buf = Vec::new();
        sm.to_writer(&mut buf)
            .map_err(|e| CliError::Io(std::io::Error::other(e.to_string())))?;
        let mut map_path = output.clone().into_os_string();
        map_path.push(".map");
        fs::write(PathBuf::from(map_path), buf)?;
    }

    Ok(status)
}

fn describe(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::Inert => "inert",
        SkipReason::Filtered => "filtered",
        SkipReason::NoCandidates => "no-candidates",
    }
}

fn print_reports(reports: &[FileReport], format: &OutputFormat, stdout_mode: bool) {
    match format {
        OutputFormat::Text => {
            for report in reports {
                let line = match &report.status {
                    FileStatus::Skipped(reason) => format!("skipped ({})", describe(*reason)),
                    FileStatus::Unchanged => "unchanged".to_string(),
                    FileStatus::Stripped { removed_bytes } => {
                        format!("stripped ({removed_bytes} bytes removed)")
                    }
                    FileStatus::Failed(msg) => format!("failed: {msg}"),
                };
                // Keep stdout clean for the stripped text.
                if stdout_mode {
                    eprintln!("{}: {line}", report.path.display());
                } else {
                    println!("{}: {line}", report.path.display());
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "files": reports.iter().map(|r| {
                    let (status, detail) = match &r.status {
                        FileStatus::Skipped(reason) => {
                            ("skipped", serde_json::json!(describe(*reason)))
                        }
                        FileStatus::Unchanged => ("unchanged", serde_json::Value::Null),
                        FileStatus::Stripped { removed_bytes } => {
                            ("stripped", serde_json::json!(removed_bytes))
                        }
                        FileStatus::Failed(msg) => ("failed", serde_json::json!(msg)),
                    };
                    serde_json::json!({
                        "path": r.path.display().to_string(),
                        "status": status,
                        "detail": detail,
                    })
                }).collect::<Vec<_>>(),
            });
            let text = serde_json::to_string_pretty(&output).unwrap_or_default();
            if stdout_mode {
                eprintln!("{text}");
            } else {
                println!("{text}");
            }
        }
    }
}

// ============================================================================
// check
// ============================================================================

/// Zero-based line and UTF-8 column of a byte offset.
fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (line, before[line_start..].chars().count())
}

fn cmd_check(path: &Path, options: StripOptions, format: &OutputFormat) -> Result<(), CliError> {
    let config = PipelineConfig::validate(options)
        .map_err(|e| CliError::Config(e.to_string()))?;
    let source = fs::read_to_string(path)?;
    let name = path.to_string_lossy();

    let document =
        parse_document(&source, Some(&*name)).map_err(|e| CliError::Parse(e.to_string()))?;
    let matches = collect_matches(&document, config.target_attributes());

    match format {
        OutputFormat::Text => {
            if matches.is_empty() {
                println!("{name}: nothing to strip");
            }
            for m in &matches {
                // Spans start at the separating whitespace; report the name.
                let name_offset = m.span.start + source[m.span.clone()].find(m.name).unwrap_or(0);
                let (line, col) = line_col(&source, name_offset);
                println!(
                    "{name}:{}:{}: {} ({}..{})",
                    line + 1,
                    col + 1,
                    source[m.span.clone()].trim_start(),
                    m.span.start,
                    m.span.end
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "file": name,
                "matches": matches.iter().map(|m| serde_json::json!({
                    "name": m.name,
                    "start": m.span.start,
                    "end": m.span.end,
                    "text": &source[m.span.clone()],
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        }
    }

    Ok(())
}
