//! Mask-based background removal CLI
//!
//! Composites an image over a solid background using a mask image computed
//! ahead of time, and prints the `file://` URI of the written PNG.

use super::config::CliConfigBuilder;
use crate::{
    processor::BackgroundRemovalProcessor,
    segmenter::{PrecomputedMaskSegmenter, Segmenter, SupportStatus, UnsupportedSegmenter},
    services::TracingProgressReporter,
    tracing_config::{events, init_cli_tracing, spans},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use instant::Instant;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

/// Remove image backgrounds using a segmentation mask
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "maskcut")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image: path, file:// URI or base64 data: URI
    #[arg(value_name = "INPUT", required_unless_present = "check_support")]
    pub input: Option<String>,

    /// Grayscale mask image (any resolution); without it segmentation is unsupported
    #[arg(short, long, value_name = "PNG")]
    pub mask: Option<PathBuf>,

    /// Background color as RRGGBB or RRGGBBAA, with or without '#'
    #[arg(short, long, value_name = "HEX")]
    pub background_color: Option<String>,

    /// How mask scores are applied
    #[arg(short, long, value_enum)]
    pub policy: Option<CliPolicy>,

    /// Threshold cutoff (0-255); only valid with the threshold policy
    #[arg(long, value_name = "N")]
    pub cutoff: Option<u8>,

    /// Directory for the output PNG [default: <temp>/background_removal]
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// JSON configuration file; command line flags override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Return the input unchanged when segmentation is unsupported
    #[arg(long)]
    pub fallback: bool,

    /// Composite rows in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Print the full result as JSON instead of just the output URI
    #[arg(long)]
    pub json: bool,

    /// Report whether background removal can run and exit
    #[arg(long)]
    pub check_support: bool,

    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliPolicy {
    /// Binary foreground/background decision
    Threshold,
    /// Blend by mask score
    Blend,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    let segmenter = build_segmenter(&cli);

    if cli.check_support {
        return check_support(segmenter.as_ref());
    }

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;
    let input = cli.input.as_deref().context("An input image is required")?;

    let session = spans::session(input, segmenter.name());
    let processor = BackgroundRemovalProcessor::new(segmenter, config)
        .context("Failed to create processor")?
        .with_progress_reporter(Arc::new(TracingProgressReporter::new(cli.verbose >= 2)));

    let start = Instant::now();
    let outcome = match processor
        .remove_background(input, cli.background_color.as_deref())
        .instrument(session)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            events::error_with_context(&e, "background removal");
            return Err(anyhow::Error::new(e).context(format!("Failed to process {}", input)));
        },
    };
    events::performance_metric("remove_background", start.elapsed().as_millis() as u64);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.output_uri);
    }
    if !outcome.was_processed {
        tracing::warn!("Background removal unsupported; input returned unchanged");
    }
    Ok(())
}

fn build_segmenter(cli: &Cli) -> Arc<dyn Segmenter> {
    match &cli.mask {
        Some(path) => Arc::new(PrecomputedMaskSegmenter::new(path)),
        None => Arc::new(UnsupportedSegmenter::new(
            "No mask supplied; pass --mask with a precomputed segmentation mask",
        )),
    }
}

fn check_support(segmenter: &dyn Segmenter) -> Result<()> {
    match segmenter.support() {
        SupportStatus::Supported => {
            println!("supported ({})", segmenter.name());
            Ok(())
        },
        SupportStatus::Unsupported { reason } => {
            println!("unsupported: {}", reason);
            std::process::exit(2);
        },
    }
}
