//! Mock segmenter for testing the pipeline
//!
//! Records calls and can be told to fail in each of the ways a platform
//! segmenter fails, so orchestration can be tested without a model.

use super::{Segmenter, SupportStatus};
use crate::{
    error::{BgRemovalError, Result},
    types::{PixelBuffer, SegmentationMask},
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the mock should behave when asked to segment
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return this mask
    Mask(SegmentationMask),
    /// Fail as the model would
    Fail(String),
    /// Report an unsupported environment from `segment` itself
    Unsupported(String),
    /// Sleep before returning the mask
    Slow(Duration, SegmentationMask),
}

#[derive(Debug, Clone)]
pub struct MockSegmenter {
    behavior: MockBehavior,
    support: SupportStatus,
    call_history: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl MockSegmenter {
    #[must_use]
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            support: SupportStatus::Supported,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Uniform 8-bit mask of the given size
    #[must_use]
    pub fn uniform(value: u8, dimensions: (u32, u32)) -> Self {
        let len = (dimensions.0 * dimensions.1) as usize;
        Self::new(MockBehavior::Mask(
            SegmentationMask::from_u8(&vec![value; len], dimensions).unwrap(),
        ))
    }

    #[must_use]
    pub fn with_support(mut self, support: SupportStatus) -> Self {
        self.support = support;
        self
    }

    /// Dimensions of every image passed to `segment`
    pub fn calls(&self) -> Vec<(u32, u32)> {
        self.call_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl Segmenter for MockSegmenter {
    fn name(&self) -> &str {
        "mock"
    }

    fn support(&self) -> SupportStatus {
        self.support.clone()
    }

    async fn segment(&self, image: &PixelBuffer) -> Result<SegmentationMask> {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(image.dimensions());
        }

        match &self.behavior {
            MockBehavior::Mask(mask) => Ok(mask.clone()),
            MockBehavior::Fail(message) => Err(BgRemovalError::segmentation_failed(message.clone())),
            MockBehavior::Unsupported(reason) => Err(BgRemovalError::unsupported(reason.clone())),
            MockBehavior::Slow(delay, mask) => {
                tokio::time::sleep(*delay).await;
                Ok(mask.clone())
            },
        }
    }
}
