//! Segmentation collaborator abstraction
//!
//! The model that produces masks is external. The pipeline only needs
//! `segment(image) -> mask` plus a synchronous capability query, so it is
//! injected as a [`Segmenter`] trait object rather than a process-wide client.

mod callback;
mod precomputed;

#[cfg(test)]
pub mod test_utils;

pub use callback::{CallbackSegmenter, SegmentationCompletion};
pub use precomputed::{FixedMaskSegmenter, PrecomputedMaskSegmenter, UnsupportedSegmenter};

use crate::{
    error::Result,
    types::{PixelBuffer, SegmentationMask},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Whether the current environment can run segmentation at all
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupportStatus {
    Supported,
    Unsupported { reason: String },
}

impl SupportStatus {
    pub fn unsupported<S: Into<String>>(reason: S) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported)
    }

    /// Evaluate the usual platform gates: emulator/simulator builds and an
    /// OS version floor
    #[must_use]
    pub fn from_environment(environment: &EnvironmentInfo) -> Self {
        if environment.is_simulator {
            return Self::unsupported("Background removal is not supported on simulator");
        }
        if let Some(minimum) = environment.minimum_os_version {
            if environment.os_version < minimum {
                return Self::unsupported(format!(
                    "Background removal requires OS {}.{} or later (running {}.{})",
                    minimum.0, minimum.1, environment.os_version.0, environment.os_version.1
                ));
            }
        }
        Self::Supported
    }
}

/// Facts about the host a platform segmenter reports for capability checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    /// Running under an emulator or simulator without the model runtime
    pub is_simulator: bool,
    /// Host OS version as (major, minor)
    pub os_version: (u32, u32),
    /// Lowest OS version the model runtime supports
    pub minimum_os_version: Option<(u32, u32)>,
}

/// A subject/person segmentation model
///
/// Implementations return a mask at their own resolution; the compositor
/// resamples it onto the image grid.
#[async_trait]
pub trait Segmenter: Send + Sync {
    /// Human-readable name used in logs
    fn name(&self) -> &str;

    /// Synchronous capability check, independent of any image
    fn support(&self) -> SupportStatus {
        SupportStatus::Supported
    }

    /// Segment a decoded image
    ///
    /// # Errors
    /// - `Unsupported` when the environment cannot run the model
    /// - `SegmentationFailed` when the model errors or yields no mask
    async fn segment(&self, image: &PixelBuffer) -> Result<SegmentationMask>;
}
