//! Core types for background removal operations

use crate::error::{BgRemovalError, Result};
use image::{GrayImage, ImageBuffer, Luma, RgbaImage};
use serde::{Deserialize, Serialize};

/// Decoded RGBA8 image, row-major, `width * height` pixels.
///
/// Ownership moves from decode to the compositor's output to the encoder;
/// the compositor only ever borrows its input.
pub type PixelBuffer = RgbaImage;

/// Per-pixel foreground scores at the segmenter's own resolution.
///
/// Scores are stored canonically as `f32` in `[0, 1]` regardless of whether the
/// segmenter produced 8-bit or normalized values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationMask {
    /// Row-major scores; may be shorter than `width * height` for partial masks
    scores: Vec<f32>,

    /// Mask dimensions (width, height)
    dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a mask from 8-bit scores (0 = background, 255 = foreground)
    ///
    /// # Errors
    /// - Zero width or height
    /// - `data.len() != width * height`
    pub fn from_u8(data: &[u8], dimensions: (u32, u32)) -> Result<Self> {
        Self::check_exact(data.len(), dimensions)?;
        Ok(Self::ingest_u8(data, dimensions))
    }

    /// Create a mask from normalized scores in `[0, 1]`.
    ///
    /// Values outside the range are clamped; NaN reads as background.
    ///
    /// # Errors
    /// - Zero width or height
    /// - `data.len() != width * height`
    pub fn from_f32(data: &[f32], dimensions: (u32, u32)) -> Result<Self> {
        Self::check_exact(data.len(), dimensions)?;
        Ok(Self::ingest_f32(data, dimensions))
    }

    /// Create a mask from an 8-bit buffer that may be shorter than `width * height`.
    ///
    /// Platform segmenters sometimes hand back buffers with fewer bytes remaining
    /// than the advertised size. Cells past the end of `data` composite as
    /// background.
    ///
    /// # Errors
    /// - Zero width or height
    /// - `data.len() > width * height`
    pub fn from_u8_partial(data: &[u8], dimensions: (u32, u32)) -> Result<Self> {
        Self::check_dimensions(dimensions)?;
        let expected = Self::cell_count(dimensions);
        if data.len() > expected {
            return Err(BgRemovalError::segmentation_failed(format!(
                "Mask buffer holds {} scores but {}x{} needs at most {}",
                data.len(),
                dimensions.0,
                dimensions.1,
                expected
            )));
        }
        if data.len() < expected {
            tracing::debug!(
                available = data.len(),
                expected = expected,
                "Partial mask buffer, missing cells will composite as background"
            );
        }
        Ok(Self::ingest_u8(data, dimensions))
    }

    /// Create mask from a grayscale image
    ///
    /// # Errors
    /// - Zero-sized image
    pub fn from_luma(image: &GrayImage) -> Result<Self> {
        Self::from_u8(image.as_raw(), image.dimensions())
    }

    /// Uniform mask, mostly useful for fallbacks and tests
    ///
    /// # Errors
    /// - Zero width or height
    pub fn uniform(score: f32, dimensions: (u32, u32)) -> Result<Self> {
        Self::check_dimensions(dimensions)?;
        let score = normalize(score);
        Ok(Self {
            scores: vec![score; Self::cell_count(dimensions)],
            dimensions,
        })
    }

    /// Mask dimensions (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.dimensions.1
    }

    /// Canonical scores, row-major
    #[must_use]
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    /// Whether fewer scores are present than the dimensions advertise
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.scores.len() < Self::cell_count(self.dimensions)
    }

    /// Score at a mask cell, `None` when the cell is out of bounds or missing
    #[must_use]
    pub fn score_at(&self, mx: u32, my: u32) -> Option<f32> {
        let (width, height) = self.dimensions;
        if mx >= width || my >= height {
            return None;
        }
        let index = my as usize * width as usize + mx as usize;
        self.scores.get(index).copied()
    }

    /// Convert mask to a grayscale image, missing cells as 0
    #[must_use]
    pub fn to_image(&self) -> GrayImage {
        let (width, height) = self.dimensions;
        ImageBuffer::from_fn(width, height, |x, y| {
            Luma([quantize(self.score_at(x, y).unwrap_or(0.0))])
        })
    }

    /// Get mask statistics; a cell counts as foreground above the midpoint
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = Self::cell_count(self.dimensions);
        let foreground_pixels = self.scores.iter().filter(|&&s| quantize(s) > 127).count();
        let background_pixels = total_pixels - foreground_pixels;
        let total = total_pixels as f32;

        MaskStatistics {
            total_pixels,
            foreground_pixels,
            background_pixels,
            foreground_ratio: foreground_pixels as f32 / total,
            background_ratio: background_pixels as f32 / total,
        }
    }

    fn ingest_u8(data: &[u8], dimensions: (u32, u32)) -> Self {
        Self {
            scores: data.iter().map(|&v| f32::from(v) / 255.0).collect(),
            dimensions,
        }
    }

    fn ingest_f32(data: &[f32], dimensions: (u32, u32)) -> Self {
        Self {
            scores: data.iter().map(|&v| normalize(v)).collect(),
            dimensions,
        }
    }

    fn cell_count((width, height): (u32, u32)) -> usize {
        width as usize * height as usize
    }

    fn check_dimensions((width, height): (u32, u32)) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(BgRemovalError::segmentation_failed(format!(
                "Mask dimensions must be at least 1x1, got {}x{}",
                width, height
            )));
        }
        Ok(())
    }

    fn check_exact(len: usize, dimensions: (u32, u32)) -> Result<()> {
        Self::check_dimensions(dimensions)?;
        let expected = Self::cell_count(dimensions);
        if len != expected {
            return Err(BgRemovalError::segmentation_failed(format!(
                "Mask buffer holds {} scores, expected {} for {}x{}",
                len, expected, dimensions.0, dimensions.1
            )));
        }
        Ok(())
    }
}

/// Clamp a raw score into `[0, 1]`, NaN to 0
fn normalize(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Canonical score back to 8 bits, exact for scores that came from `u8`
pub(crate) fn quantize(score: f32) -> u8 {
    (normalize(score) * 255.0).round() as u8
}

/// Statistics about a segmentation mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub foreground_pixels: usize,
    pub background_pixels: usize,
    pub foreground_ratio: f32,
    pub background_ratio: f32,
}

/// Timing breakdown of one background removal call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Resolving the URI and decoding the image
    pub image_decode_ms: u64,

    /// Segmentation collaborator call
    pub segmentation_ms: u64,

    /// Resample and composite
    pub compositing_ms: u64,

    /// PNG encoding and atomic write
    pub image_encode_ms: u64,

    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time not attributed to any stage
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        let measured = self.image_decode_ms
            + self.segmentation_ms
            + self.compositing_ms
            + self.image_encode_ms;
        self.total_ms.saturating_sub(measured)
    }

    /// Get timing summary for display
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Total: {}ms | Decode: {}ms | Segment: {}ms | Composite: {}ms | Encode: {}ms",
            self.total_ms,
            self.image_decode_ms,
            self.segmentation_ms,
            self.compositing_ms,
            self.image_encode_ms
        )
    }
}

/// Terminal success of a background removal call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalOutcome {
    /// `file://` URI of the written PNG, or the input URI when nothing was processed
    pub output_uri: String,

    /// `false` when the unsupported-environment fallback returned the input unchanged
    pub was_processed: bool,

    /// Output dimensions (equal to the input's), `None` when not processed
    pub dimensions: Option<(u32, u32)>,

    /// Stage timings
    pub timings: ProcessingTimings,
}

impl RemovalOutcome {
    /// Outcome for the unsupported-environment fallback
    #[must_use]
    pub fn unprocessed(input_uri: &str) -> Self {
        Self {
            output_uri: input_uri.to_string(),
            was_processed: false,
            dimensions: None,
            timings: ProcessingTimings::default(),
        }
    }
}
