//! Nearest-neighbour mapping from image pixels to mask cells
//!
//! This is a point sample, not a filtered resample: each image pixel reads
//! exactly one mask cell, so no background leaks into edges through
//! interpolation.

/// Map an image coordinate to the mask cell that covers it.
///
/// `mx = floor(x * mask_w / image_w)` and `my = floor(y * mask_h / image_h)`,
/// computed in 64-bit so the product cannot overflow, then clamped into the
/// mask. For `x < image_w` the quotient is already `< mask_w`; the clamp keeps
/// out-of-range callers in bounds too.
///
/// Zero image or mask dimensions map everything to `(0, 0)`.
#[must_use]
#[inline]
pub fn map_coordinate(
    x: u32,
    y: u32,
    image_w: u32,
    image_h: u32,
    mask_w: u32,
    mask_h: u32,
) -> (u32, u32) {
    (map_axis(x, image_w, mask_w), map_axis(y, image_h, mask_h))
}

#[inline]
fn map_axis(coord: u32, image_len: u32, mask_len: u32) -> u32 {
    if image_len == 0 || mask_len == 0 {
        return 0;
    }
    let scaled = u64::from(coord) * u64::from(mask_len) / u64::from(image_len);
    scaled.min(u64::from(mask_len - 1)) as u32
}

/// Precomputed column lookup for one image width.
///
/// The compositor resolves each column once per image instead of once per
/// pixel; the result is identical to calling [`map_coordinate`] per pixel.
#[derive(Debug, Clone)]
pub(crate) struct AxisMap {
    cells: Vec<u32>,
}

impl AxisMap {
    pub(crate) fn new(image_len: u32, mask_len: u32) -> Self {
        Self {
            cells: (0..image_len)
                .map(|c| map_axis(c, image_len, mask_len))
                .collect(),
        }
    }

    pub(crate) fn get(&self, coord: u32) -> u32 {
        self.cells.get(coord as usize).copied().unwrap_or(0)
    }
}
