use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use json_fieldmap_core::model::SourceDescriptor;
use json_fieldmap_core::{
    apply_mapping_sources, apply_mapping_with, extract_source_fields, propose_for_config,
    validate_config, ApplyOptions, ExtractOptions, MappingConfig, SourceType, DEFAULT_THRESHOLD,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "json-fieldmap")]
#[command(about = "Apply declarative JSON field mappings and inspect their configs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output file (defaults to stdout if not specified)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty, global = true)]
    format: OutputFormat,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a source document through a mapping config
    Apply {
        /// Mapping config file
        config: PathBuf,

        /// Document for the primary source
        source: PathBuf,

        /// Additional source document as `<source-id>=<file>` (repeatable)
        #[arg(long = "source", value_name = "ID=FILE")]
        sources: Vec<String>,

        /// Do not fill template default values at unmapped paths
        #[arg(long)]
        no_template_defaults: bool,

        /// Pin the wrapper timestamp (RFC 3339) instead of reading the clock
        #[arg(long)]
        timestamp: Option<chrono::DateTime<chrono::Utc>>,
    },

    /// Check a mapping config; exits with status 1 when it has errors
    Validate {
        /// Mapping config file
        config: PathBuf,
    },

    /// List the addressable fields of a sample document
    Extract {
        /// Sample document
        document: PathBuf,

        /// Path to the iterable root inside the document
        #[arg(long, default_value = "")]
        primary_path: String,

        /// Max container depth to expand
        #[arg(long, default_value_t = ExtractOptions::default().max_depth)]
        max_depth: usize,

        /// Also expand concrete array indices
        #[arg(long)]
        fixed_indices: bool,

        /// Max concrete indices per array (with --fixed-indices)
        #[arg(long, default_value_t = ExtractOptions::default().max_array_indices)]
        max_array_indices: usize,

        /// Do not generalize arrays as `field[*]`
        #[arg(long)]
        no_wildcards: bool,

        /// Attach sample values to each field
        #[arg(long)]
        values: bool,
    },

    /// Propose mappings for unmapped template fields from a sample document
    Automap {
        /// Mapping config file
        config: PathBuf,

        /// Sample document for the primary source
        sample: PathBuf,

        /// Minimum path similarity for a proposal (0.0 - 1.0)
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,

        /// Print the config with the proposals added instead of the proposals
        #[arg(long)]
        write: bool,
    },

    /// Run one transformation of a config over a JSON value
    Transform {
        /// Mapping config file
        config: PathBuf,

        /// Transformation id
        transform_id: String,

        /// Input value as JSON (e.g. '"hello"' or '42')
        value: String,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for JSON
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let output = cli.output.as_deref();
    let format = cli.format;

    match cli.command {
        Commands::Apply {
            config,
            source,
            sources,
            no_template_defaults,
            timestamp,
        } => {
            let config = read_config(&config)?;
            let document = read_json(&source, "source document")?;
            let options = ApplyOptions {
                template_defaults: !no_template_defaults,
                timestamp,
            };

            let result = if sources.is_empty() {
                apply_mapping_with(&document, &config, &options)
            } else {
                let primary = config
                    .source_selection
                    .primary()
                    .context("Config selects no sources; cannot bind --source documents")?;
                let mut documents = BTreeMap::new();
                documents.insert(primary.id.clone(), document);
                for spec in &sources {
                    let (id, path) = spec
                        .split_once('=')
                        .with_context(|| format!("Expected <source-id>=<file>, got `{}`", spec))?;
                    let doc = read_json(Path::new(path), "source document")?;
                    documents.insert(id.to_string(), doc);
                }
                apply_mapping_sources(&documents, &config, &options)
                    .map_err(|e| anyhow::Error::from(e).context("Mapping failed"))?
            };

            write_json(&result, output, format)?;
        }
        Commands::Validate { config } => {
            let config = read_config(&config)?;
            let report = validate_config(&config);

            for warning in &report.warnings {
                eprintln!("Warning: {}", warning.message);
            }
            for error in &report.errors {
                eprintln!("Error: {}", error.message);
            }
            write_json(&report, output, format)?;

            if !report.valid {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Extract {
            document,
            primary_path,
            max_depth,
            fixed_indices,
            max_array_indices,
            no_wildcards,
            values,
        } => {
            let doc = read_json(&document, "document")?;
            let options = ExtractOptions {
                max_depth,
                include_wildcards: !no_wildcards,
                include_fixed_indices: fixed_indices,
                max_array_indices,
                include_values: values,
            };
            let source = SourceDescriptor::new("document", document.display().to_string(), SourceType::Object)
                .with_primary_path(primary_path);
            let fields = extract_source_fields(&doc, &source, &options);
            write_json(&fields, output, format)?;
        }
        Commands::Automap {
            config,
            sample,
            threshold,
            write,
        } => {
            if !(0.0..=1.0).contains(&threshold) {
                bail!("Threshold must be between 0.0 and 1.0, got {}", threshold);
            }
            let config = read_config(&config)?;
            let doc = read_json(&sample, "sample document")?;

            let primary_path = config.source_selection.effective_primary_path();
            let source = SourceDescriptor::new("sample", "sample", SourceType::Object)
                .with_primary_path(primary_path);
            let source_paths: Vec<String> = extract_source_fields(&doc, &source, &ExtractOptions::default())
                .into_iter()
                .map(|f| f.path)
                .filter(|p| !p.is_empty())
                .collect();

            if write {
                let updated = config.with_auto_mappings(&source_paths, threshold);
                write_json(&updated, output, format)?;
            } else {
                let proposals = propose_for_config(&config, &source_paths, threshold);
                if proposals.is_empty() {
                    eprintln!("No field reached the similarity threshold of {}", threshold);
                }
                write_json(&proposals, output, format)?;
            }
        }
        Commands::Transform {
            config,
            transform_id,
            value,
        } => {
            let config = read_config(&config)?;
            let transformation = config
                .find_transformation(&transform_id)
                .with_context(|| format!("No transformation with id `{}` in config", transform_id))?;
            let input: serde_json::Value = serde_json::from_str(&value)
                .with_context(|| format!("Failed to parse input value as JSON: {}", value))?;

            let result = transformation
                .kind
                .try_apply(&input)
                .map_err(|e| anyhow::Error::from(e).context("Transformation failed"))?;
            write_json(&result, output, format)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn read_json(path: &Path, what: &str) -> Result<serde_json::Value> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {}: {}", what, path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse {} from: {}", what, path.display()))
}

fn read_config(path: &Path) -> Result<MappingConfig> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open config file: {}", path.display()))?;
    let reader = BufReader::new(file);
    let config: MappingConfig = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse mapping config from: {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        sources = config.source_selection.sources.len(),
        mappings = config.field_mappings.len(),
        transformations = config.transformations.len(),
        "loaded mapping config"
    );
    Ok(config)
}

fn write_json<T: serde::Serialize>(val: &T, path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let mut writer: Box<dyn Write> = if let Some(p) = path {
        let file = File::create(p)
            .with_context(|| format!("Failed to create output file: {}", p.display()))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("Failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("Failed to write JSON")?;
        }
    }

    // Ensure trailing newline
    writeln!(writer).context("Failed to write trailing newline")?;
    writer.flush().context("Failed to flush output")?;

    Ok(())
}
