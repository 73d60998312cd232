//! Adapter for callback-driven segmentation APIs
//!
//! Mobile segmentation APIs report through success/failure listeners. The
//! adapter hands the platform a [`SegmentationCompletion`] backed by a
//! one-shot channel and awaits it, so the pipeline sees exactly one result.

use super::{Segmenter, SupportStatus};
use crate::{
    error::{BgRemovalError, Result},
    types::{PixelBuffer, SegmentationMask},
};
use async_trait::async_trait;
use tokio::sync::oneshot;

/// Single-use completion handle given to a callback-style segmenter.
///
/// Completing consumes the handle, so a second report cannot be expressed.
/// Dropping it without completing resolves the call as `SegmentationFailed`.
#[derive(Debug)]
pub struct SegmentationCompletion {
    sender: oneshot::Sender<Result<SegmentationMask>>,
}

impl SegmentationCompletion {
    /// Report the final result
    pub fn complete(self, result: Result<SegmentationMask>) {
        if self.sender.send(result).is_err() {
            tracing::debug!("Segmentation result arrived after the caller stopped waiting");
        }
    }

    pub fn succeed(self, mask: SegmentationMask) {
        self.complete(Ok(mask));
    }

    pub fn fail<S: Into<String>>(self, message: S) {
        self.complete(Err(BgRemovalError::segmentation_failed(message)));
    }
}

type StartFn = dyn Fn(&PixelBuffer, SegmentationCompletion) + Send + Sync;
type SupportFn = dyn Fn() -> SupportStatus + Send + Sync;

/// [`Segmenter`] over a start function that reports through a completion handle
pub struct CallbackSegmenter {
    name: String,
    start: Box<StartFn>,
    support: Option<Box<SupportFn>>,
}

impl CallbackSegmenter {
    /// `start` kicks off the platform request and must eventually complete or
    /// drop the handle; it may do so from any thread.
    pub fn new<S, F>(name: S, start: F) -> Self
    where
        S: Into<String>,
        F: Fn(&PixelBuffer, SegmentationCompletion) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            start: Box::new(start),
            support: None,
        }
    }

    /// Attach a capability query
    #[must_use]
    pub fn with_support<F>(mut self, support: F) -> Self
    where
        F: Fn() -> SupportStatus + Send + Sync + 'static,
    {
        self.support = Some(Box::new(support));
        self
    }
}

#[async_trait]
impl Segmenter for CallbackSegmenter {
    fn name(&self) -> &str {
        &self.name
    }

    fn support(&self) -> SupportStatus {
        self.support
            .as_ref()
            .map_or(SupportStatus::Supported, |support| support())
    }

    async fn segment(&self, image: &PixelBuffer) -> Result<SegmentationMask> {
        let (sender, receiver) = oneshot::channel();
        (self.start)(image, SegmentationCompletion { sender });

        receiver.await.map_err(|_| {
            BgRemovalError::segmentation_failed(format!(
                "{} finished without reporting a result",
                self.name
            ))
        })?
    }
}
