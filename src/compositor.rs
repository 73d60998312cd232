//! Mask-based compositing engine
//!
//! Pure and total: the input image and mask are only borrowed, every call
//! allocates a fresh output buffer of the image's dimensions, and work is
//! `O(width * height)` whatever the mask resolution.

use crate::{
    color::Color,
    policy::CompositingPolicy,
    resample::AxisMap,
    types::{PixelBuffer, SegmentationMask},
};

const CHANNELS: usize = 4;

/// Composite `image` against `background` using `mask`, single-threaded.
///
/// Each output pixel reads the mask cell chosen by
/// [`map_coordinate`](crate::resample::map_coordinate). Cells outside the mask
/// or missing from a partial mask composite as pure background.
#[must_use]
pub fn composite(
    image: &PixelBuffer,
    mask: &SegmentationMask,
    policy: CompositingPolicy,
    background: Color,
) -> PixelBuffer {
    Compositor::new(policy, background).composite(image, mask)
}

/// Reusable compositing settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compositor {
    policy: CompositingPolicy,
    background: Color,
    parallel: bool,
}

impl Compositor {
    #[must_use]
    pub fn new(policy: CompositingPolicy, background: Color) -> Self {
        Self {
            policy,
            background,
            parallel: false,
        }
    }

    /// Split rows across the rayon pool. Output is identical to the serial path.
    ///
    /// Ignored unless the crate is built with the `parallel` feature.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn policy(&self) -> CompositingPolicy {
        self.policy
    }

    #[must_use]
    pub fn background(&self) -> Color {
        self.background
    }

    /// Produce a new buffer of `image`'s dimensions
    #[must_use]
    pub fn composite(&self, image: &PixelBuffer, mask: &SegmentationMask) -> PixelBuffer {
        let (width, height) = image.dimensions();
        let mut output = PixelBuffer::new(width, height);
        if width == 0 || height == 0 {
            return output;
        }

        let rows = RowContext {
            columns: AxisMap::new(width, mask.width()),
            image_height: height,
            mask,
            policy: self.policy,
            background: [
                self.background.r,
                self.background.g,
                self.background.b,
                self.background.a,
            ],
        };
        let row_len = width as usize * CHANNELS;

        let missing = if self.parallel {
            rows.run_parallel(image.as_raw(), &mut output, row_len)
        } else {
            rows.run_serial(image.as_raw(), &mut output, row_len)
        };

        if missing > 0 {
            tracing::debug!(
                pixels = missing,
                mask_width = mask.width(),
                mask_height = mask.height(),
                "Mask cells unavailable, pixels composited as background"
            );
        }

        output
    }
}

struct RowContext<'a> {
    columns: AxisMap,
    image_height: u32,
    mask: &'a SegmentationMask,
    policy: CompositingPolicy,
    background: [u8; CHANNELS],
}

impl RowContext<'_> {
    fn run_serial(&self, input: &[u8], output: &mut [u8], row_len: usize) -> usize {
        input
            .chunks_exact(row_len)
            .zip(output.chunks_exact_mut(row_len))
            .enumerate()
            .map(|(y, (src, dst))| self.row(y as u32, src, dst))
            .sum()
    }

    #[cfg(feature = "parallel")]
    fn run_parallel(&self, input: &[u8], output: &mut [u8], row_len: usize) -> usize {
        use rayon::prelude::*;

        input
            .par_chunks_exact(row_len)
            .zip(output.par_chunks_exact_mut(row_len))
            .enumerate()
            .map(|(y, (src, dst))| self.row(y as u32, src, dst))
            .sum()
    }

    #[cfg(not(feature = "parallel"))]
    fn run_parallel(&self, input: &[u8], output: &mut [u8], row_len: usize) -> usize {
        self.run_serial(input, output, row_len)
    }

    /// Composite one row, returning how many pixels had no mask cell
    fn row(&self, y: u32, src: &[u8], dst: &mut [u8]) -> usize {
        let (mask_width, mask_height) = self.mask.dimensions();
        let my = crate::resample::map_coordinate(0, y, 1, self.image_height, mask_width, mask_height).1;
        let mut missing = 0;

        for (x, (src_px, dst_px)) in src
            .chunks_exact(CHANNELS)
            .zip(dst.chunks_exact_mut(CHANNELS))
            .enumerate()
        {
            let mx = self.columns.get(x as u32);
            let pixel = match self.mask.score_at(mx, my) {
                Some(score) => mix_pixel(src_px, self.background, self.policy.weight(score)),
                None => {
                    missing += 1;
                    self.background
                },
            };
            dst_px.copy_from_slice(&pixel);
        }

        missing
    }
}

/// `weight * src + (1 - weight) * background`, per channel including alpha
#[inline]
fn mix_pixel(src: &[u8], background: [u8; CHANNELS], weight: f32) -> [u8; CHANNELS] {
    let mut out = background;
    if weight <= 0.0 {
        return out;
    }
    for (o, &s) in out.iter_mut().zip(src) {
        *o = if weight >= 1.0 { s } else { mix(s, *o, weight) };
    }
    out
}

#[inline]
fn mix(src: u8, background: u8, weight: f32) -> u8 {
    let value = weight * f32::from(src) + (1.0 - weight) * f32::from(background);
    value.round().clamp(0.0, 255.0) as u8
}
