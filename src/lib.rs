//! fpsynth: fingerprint minutiae templates for image-to-image training.
//!
//! fpsynth turns raw fingerprint scans into dense three-channel "templates"
//! that pair with the scans as training data. A run moves each scan through
//! four batch stages:
//!
//! 1. [`preprocess`]: quality admission with an external scorer (nfiq).
//! 2. [`extract`]: minutiae detection with an external detector (mindtct).
//! 3. [`store`]: conversion of raw `.min` output into canonical text
//!    records, dropping records with too few minutiae.
//! 4. [`render`]: rasterization and Gaussian diffusion into PNG templates.
//!
//! [`pipeline`] sequences the stages; [`batch`] runs each one over its
//! inputs and collects per-stage reports.
//!
//! # Modules
//!
//! - [`minutiae`]: point model and the `.min` / `.txt` formats
//! - [`config`]: YAML-loadable pipeline configuration
//! - [`error`]: error types and issue codes

pub mod batch;
pub mod config;
pub mod discover;
pub mod error;
pub mod extract;
pub mod minutiae;
pub mod pipeline;
pub mod preprocess;
pub mod render;
pub mod store;
pub mod tool;

use std::fmt::Display;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

pub use config::PipelineConfig;
pub use error::FpsynthError;
pub use pipeline::{Pipeline, PipelineReport};

/// The fpsynth CLI application.
#[derive(Parser)]
#[command(name = "fpsynth")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run all stages: preprocess, extract, convert, render.
    Pipeline(PipelineArgs),
    /// Copy scans that pass the quality filter.
    Preprocess(PreprocessArgs),
    /// Extract and convert minutiae for preprocessed scans.
    Extract(StageArgs),
    /// Convert raw .min files into canonical .txt records.
    Convert(ConvertArgs),
    /// Render templates from canonical .txt records.
    Render(RenderArgs),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Flags shared by every subcommand.
#[derive(clap::Args)]
struct CommonArgs {
    /// YAML configuration file.
    #[arg(long, env = "FPSYNTH_CONFIG")]
    config: Option<PathBuf>,

    /// Worker threads per stage (1 runs items sequentially).
    #[arg(long)]
    jobs: Option<usize>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct StageArgs {
    /// Input directory.
    input: PathBuf,

    /// Output directory.
    output_dir: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(clap::Args)]
struct PreprocessArgs {
    #[command(flatten)]
    stage: StageArgs,

    /// Copy every scan without scoring it.
    #[arg(long)]
    no_quality_filter: bool,
}

#[derive(clap::Args)]
struct PipelineArgs {
    #[command(flatten)]
    stage: StageArgs,

    /// Copy every scan without scoring it.
    #[arg(long)]
    no_quality_filter: bool,

    /// Square template size in pixels.
    #[arg(long)]
    template_size: Option<u32>,
}

#[derive(clap::Args)]
struct ConvertArgs {
    #[command(flatten)]
    stage: StageArgs,

    /// Minimum minutiae per kept record.
    #[arg(long)]
    min_count: Option<usize>,

    /// Minimum detector quality per minutia.
    #[arg(long)]
    quality_threshold: Option<f64>,
}

#[derive(clap::Args)]
struct RenderArgs {
    #[command(flatten)]
    stage: StageArgs,

    /// Square template size in pixels.
    #[arg(long)]
    template_size: Option<u32>,

    /// Read original sizes from the scans in this directory.
    #[arg(long)]
    scans: Option<PathBuf>,

    /// Render cores and deltas into the third channel.
    #[arg(long)]
    with_singular: bool,
}

/// Run the fpsynth CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), FpsynthError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Pipeline(args)) => run_pipeline(args),
        Some(Commands::Preprocess(args)) => run_preprocess(args),
        Some(Commands::Extract(args)) => run_extract(args),
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Render(args)) => run_render(args),
        None => {
            println!("fpsynth {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Fingerprint minutiae templates for image-to-image training.");
            println!();
            println!("Run 'fpsynth --help' for usage information.");
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    // A logger may already be installed when embedded.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init();
}

fn load_config(common: &CommonArgs) -> Result<PipelineConfig, FpsynthError> {
    let mut config = match &common.config {
        Some(path) => PipelineConfig::from_yaml_file(path)?,
        None => PipelineConfig::default(),
    };
    if common.jobs.is_some() {
        config.jobs = common.jobs;
    }
    Ok(config)
}

fn emit<R: Serialize + Display>(report: &R, format: OutputFormat) -> Result<(), FpsynthError> {
    match format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

fn run_pipeline(args: PipelineArgs) -> Result<(), FpsynthError> {
    let mut config = load_config(&args.stage.common)?;
    if args.no_quality_filter {
        config.filter_quality = false;
    }
    if let Some(side) = args.template_size {
        config.template_size = minutiae::ImageSize::square(side);
    }

    let pipeline = Pipeline::new(config)?;
    let report = pipeline.run_full_pipeline(&args.stage.input, &args.stage.output_dir)?;
    emit(&report, args.stage.common.output)
}

fn run_preprocess(args: PreprocessArgs) -> Result<(), FpsynthError> {
    let mut config = load_config(&args.stage.common)?;
    if args.no_quality_filter {
        config.filter_quality = false;
    }

    let pipeline = Pipeline::new(config)?;
    let report = pipeline.run_preprocessing_only(&args.stage.input, &args.stage.output_dir)?;
    emit(&report, args.stage.common.output)
}

fn run_extract(args: StageArgs) -> Result<(), FpsynthError> {
    let pipeline = Pipeline::new(load_config(&args.common)?)?;
    let report = pipeline.run_minutiae_extraction_only(&args.input, &args.output_dir)?;
    emit(&report, args.common.output)
}

fn run_convert(args: ConvertArgs) -> Result<(), FpsynthError> {
    let mut config = load_config(&args.stage.common)?;
    if let Some(min_count) = args.min_count {
        config.min_minutiae_count = min_count;
    }
    if let Some(threshold) = args.quality_threshold {
        config.quality_threshold = threshold;
    }

    let pipeline = Pipeline::new(config)?;
    let report = pipeline.run_conversion_only(&args.stage.input, &args.stage.output_dir)?;
    emit(&report, args.stage.common.output)
}

fn run_render(args: RenderArgs) -> Result<(), FpsynthError> {
    let mut config = load_config(&args.stage.common)?;
    if let Some(side) = args.template_size {
        config.template_size = minutiae::ImageSize::square(side);
    }
    if args.with_singular {
        config.channel_layout = render::ChannelLayout::WithSingular;
    }
    if args.scans.is_some() {
        config.original_size_from_scans = true;
    }

    let mut pipeline = Pipeline::new(config)?;
    if let Some(scans) = args.scans {
        pipeline = pipeline.with_scans_dir(scans);
    }
    let report = pipeline.run_template_creation_only(&args.stage.input, &args.stage.output_dir)?;
    emit(&report, args.stage.common.output)
}
