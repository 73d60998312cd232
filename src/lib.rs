#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
//! # maskcut
//!
//! Mask-based background removal. Given a decoded image and a subject
//! segmentation mask from an external model, maskcut resamples the mask onto
//! the image grid, composites every pixel against a background color and
//! writes the result as a fresh PNG.
//!
//! ## Features
//!
//! - **Color parsing**: `RRGGBB` / `RRGGBBAA` hex with a forgiving default
//! - **Nearest-neighbor resampling**: masks of any resolution, bounds guaranteed
//! - **Compositing policies**: hard threshold or continuous alpha blend
//! - **Pluggable segmentation**: any model behind the [`Segmenter`] trait,
//!   including callback-style platform APIs
//! - **Typed failures**: every call ends in one outcome with a stable error code
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use maskcut::{BackgroundRemovalProcessor, PrecomputedMaskSegmenter, RemovalConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let segmenter = Arc::new(PrecomputedMaskSegmenter::new("mask.png"));
//! let processor = BackgroundRemovalProcessor::new(segmenter, RemovalConfig::default())?;
//!
//! let outcome = processor
//!     .remove_background("file:///photos/portrait.jpg", Some("#00FF00"))
//!     .await?;
//! println!("{}", outcome.output_uri);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pure compositing
//!
//! ```rust
//! use maskcut::{composite, Color, CompositingPolicy, PixelBuffer, SegmentationMask};
//!
//! let image = PixelBuffer::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
//! let mask = SegmentationMask::from_u8(&[0, 255, 255, 0], (2, 2)).unwrap();
//! let out = composite(&image, &mask, CompositingPolicy::default(), Color::rgb(0, 0, 255));
//! assert_eq!(out.get_pixel(0, 0).0, [0, 0, 255, 255]);
//! assert_eq!(out.get_pixel(3, 0).0, [255, 0, 0, 255]);
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface and tracing subscriber setup
//! - `parallel`: row-parallel compositing with rayon

#[cfg(feature = "cli")]
pub mod cli;
pub mod color;
pub mod compositor;
pub mod config;
pub mod error;
pub mod policy;
pub mod processor;
pub mod resample;
pub mod segmenter;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

use std::sync::Arc;

// Public API exports
pub use color::{parse_color, Color};
pub use compositor::{composite, Compositor};
pub use config::{RemovalConfig, RemovalConfigBuilder};
pub use error::{BgRemovalError, ErrorKind, Result};
pub use policy::CompositingPolicy;
pub use processor::BackgroundRemovalProcessor;
pub use resample::map_coordinate;
pub use segmenter::{
    CallbackSegmenter, EnvironmentInfo, FixedMaskSegmenter, PrecomputedMaskSegmenter,
    SegmentationCompletion, Segmenter, SupportStatus, UnsupportedSegmenter,
};
pub use services::{
    ContentResolver, ImageIOService, ImageSource, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressTracker, ProgressUpdate, TracingProgressReporter,
};
pub use types::{MaskStatistics, PixelBuffer, ProcessingTimings, RemovalOutcome, SegmentationMask};

#[cfg(feature = "cli")]
pub use tracing_config::{events, init_cli_tracing, spans, TracingConfig, TracingFormat};

/// Remove the background of one image in a single call
///
/// Returns the `file://` URI of the written PNG, or the input URI itself
/// when the segmenter is unsupported and `fallback_to_original` is set in
/// `config`.
///
/// # Examples
///
/// ```rust,no_run
/// use maskcut::{remove_background, PrecomputedMaskSegmenter, RemovalConfig};
/// use std::sync::Arc;
///
/// # async fn example() -> maskcut::Result<()> {
/// let uri = remove_background(
///     Arc::new(PrecomputedMaskSegmenter::new("mask.png")),
///     "/tmp/photo.png",
///     None,
///     RemovalConfig::default(),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// - See [`BackgroundRemovalProcessor::remove_background`]
pub async fn remove_background(
    segmenter: Arc<dyn Segmenter>,
    image_uri: &str,
    background_color_hex: Option<&str>,
    config: RemovalConfig,
) -> Result<String> {
    let processor = BackgroundRemovalProcessor::new(segmenter, config)?;
    let outcome = processor
        .remove_background(image_uri, background_color_hex)
        .await?;
    Ok(outcome.output_uri)
}

/// Capability query for a segmenter, independent of any image
#[must_use]
pub fn is_background_removal_supported(segmenter: &dyn Segmenter) -> bool {
    segmenter.support().is_supported()
}
