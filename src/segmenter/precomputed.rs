//! Segmenters that do not run a model

use super::{Segmenter, SupportStatus};
use crate::{
    error::{BgRemovalError, Result},
    types::{PixelBuffer, SegmentationMask},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Reads a mask that was computed ahead of time and stored as an image.
///
/// Any format the `image` crate decodes works; color images are converted to
/// luma. The mask may have any resolution.
#[derive(Debug, Clone)]
pub struct PrecomputedMaskSegmenter {
    path: PathBuf,
}

impl PrecomputedMaskSegmenter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Segmenter for PrecomputedMaskSegmenter {
    fn name(&self) -> &str {
        "precomputed-mask"
    }

    async fn segment(&self, _image: &PixelBuffer) -> Result<SegmentationMask> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            BgRemovalError::segmentation_failed(format!(
                "Failed to read mask '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        let mask_image = image::load_from_memory(&bytes).map_err(|e| {
            BgRemovalError::segmentation_failed(format!(
                "Failed to decode mask '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        SegmentationMask::from_luma(&mask_image.to_luma8())
    }
}

/// Returns the same mask for every image
#[derive(Debug, Clone)]
pub struct FixedMaskSegmenter {
    mask: SegmentationMask,
}

impl FixedMaskSegmenter {
    #[must_use]
    pub fn new(mask: SegmentationMask) -> Self {
        Self { mask }
    }
}

#[async_trait]
impl Segmenter for FixedMaskSegmenter {
    fn name(&self) -> &str {
        "fixed-mask"
    }

    async fn segment(&self, _image: &PixelBuffer) -> Result<SegmentationMask> {
        Ok(self.mask.clone())
    }
}

/// Stand-in for environments without a segmentation runtime
#[derive(Debug, Clone)]
pub struct UnsupportedSegmenter {
    reason: String,
}

impl UnsupportedSegmenter {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for UnsupportedSegmenter {
    fn default() -> Self {
        Self::new("No segmentation model is available in this environment")
    }
}

#[async_trait]
impl Segmenter for UnsupportedSegmenter {
    fn name(&self) -> &str {
        "unsupported"
    }

    fn support(&self) -> SupportStatus {
        SupportStatus::unsupported(self.reason.clone())
    }

    async fn segment(&self, _image: &PixelBuffer) -> Result<SegmentationMask> {
        Err(BgRemovalError::unsupported(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use image::{GrayImage, Luma};

    #[tokio::test]
    async fn test_precomputed_mask_from_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        GrayImage::from_fn(3, 2, |x, _| Luma([if x == 0 { 255 } else { 0 }]))
            .save(&path)
            .unwrap();

        let segmenter = PrecomputedMaskSegmenter::new(&path);
        let mask = segmenter.segment(&PixelBuffer::new(30, 20)).await.unwrap();
        assert_eq!(mask.dimensions(), (3, 2));
        assert_eq!(mask.score_at(0, 1), Some(1.0));
        assert_eq!(mask.score_at(2, 1), Some(0.0));
    }

    #[tokio::test]
    async fn test_precomputed_mask_missing_file() {
        let segmenter = PrecomputedMaskSegmenter::new("/definitely/not/here/mask.png");
        let err = segmenter.segment(&PixelBuffer::new(1, 1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SegmentationFailed);
    }

    #[tokio::test]
    async fn test_unsupported_segmenter() {
        let segmenter = UnsupportedSegmenter::new("requires OS 17");
        assert!(!segmenter.support().is_supported());
        let err = segmenter.segment(&PixelBuffer::new(1, 1)).await.unwrap_err();
        assert!(err.is_unsupported());
    }
}
