//! term-scrub command line
//!
//! Runs the cleaning pipeline over a set of Parquet files and prints the
//! quality report to stdout. Logs go to stderr.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use term_scrub::config::{FailurePolicy, InputSource, PipelineConfig, DEFAULT_BATCH_SIZE};
use term_scrub::formatters::{HumanFormatter, JsonFormatter, ReportFormatter};
use term_scrub::logging::setup::{init_logging, LoggingConfig};
use term_scrub::logging::LogConfig;
use term_scrub::pipeline::PipelineDriver;
use term_scrub::writer::DEFAULT_PREFIX;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file; other input and output flags are ignored when set
    #[arg(long, conflicts_with_all = ["template", "glob", "paths"])]
    config: Option<PathBuf>,

    /// Numbered input template containing `{index}`
    #[arg(long, requires = "count")]
    template: Option<String>,

    /// Number of files in the numbered input
    #[arg(long)]
    count: Option<usize>,

    /// Zero-padding width of the `{index}` placeholder
    #[arg(long, default_value_t = 2)]
    width: usize,

    /// Glob pattern selecting the input files
    #[arg(long, conflicts_with = "template")]
    glob: Option<String>,

    /// Explicit input files
    #[arg(conflicts_with_all = ["template", "glob"])]
    paths: Vec<PathBuf>,

    /// Directory receiving the cleaned artifacts
    #[arg(long, short, default_value = "new_data")]
    output_dir: PathBuf,

    /// File name prefix of the artifacts
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Maximum rows per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Stop at the first unreadable file instead of skipping it
    #[arg(long)]
    abort_on_error: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log level for term-scrub (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Log one line per processed batch at debug level
    #[arg(long, short)]
    verbose: bool,

    /// Skip per-file progress lines
    #[arg(long, short, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn input(&self) -> Result<InputSource> {
        if let Some(template) = &self.template {
            let count = self
                .count
                .context("--count is required with --template")?;
            return Ok(InputSource::Numbered {
                template: template.clone(),
                count,
                width: self.width,
            });
        }
        if let Some(pattern) = &self.glob {
            return Ok(InputSource::glob(pattern.clone()));
        }
        if !self.paths.is_empty() {
            return Ok(InputSource::paths(self.paths.clone()));
        }
        bail!("no input given: use --config, --template, --glob or list files")
    }

    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("cannot load configuration {}", path.display()))?,
            None => PipelineConfig::new(self.input()?, &self.output_dir)
                .with_output_prefix(&self.prefix)
                .with_batch_size(self.batch_size),
        };

        if self.abort_on_error {
            config = config.with_failure_policy(FailurePolicy::Abort);
        }
        let log = if self.verbose {
            LogConfig::verbose()
        } else if self.quiet {
            LogConfig::quiet()
        } else {
            LogConfig::default()
        };
        Ok(config.with_log_config(log))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let logging = if args.verbose {
        LoggingConfig::development()
    } else {
        LoggingConfig::default().with_scrub_level(args.log_level)
    }
    .with_json_format(args.log_json);
    if let Err(e) = init_logging(logging) {
        eprintln!("failed to initialize logging: {e}");
    }

    let config = args.pipeline_config()?;
    let report = PipelineDriver::new(config).run().context("scrub run failed")?;

    let output = if args.json {
        JsonFormatter::new().format(&report)?
    } else {
        HumanFormatter::new().format(&report)?
    };
    println!("{output}");
    Ok(())
}
