//! Error types for background removal operations

use thiserror::Error;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, BgRemovalError>;

/// Coarse classification of a failure, stable across message wording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The input could not be resolved or decoded
    InvalidImage,
    /// The environment cannot run segmentation at all
    Unsupported,
    /// The segmentation collaborator failed or produced nothing
    SegmentationFailed,
    /// Encoding or writing the output failed
    PersistFailed,
    /// Rejected configuration values
    InvalidConfig,
}

impl ErrorKind {
    /// Stable machine-readable code for bridge layers
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidImage => "INVALID_IMAGE",
            Self::Unsupported => "UNSUPPORTED",
            Self::SegmentationFailed => "SEGMENTATION_ERROR",
            Self::PersistFailed => "PERSIST_ERROR",
            Self::InvalidConfig => "INVALID_CONFIG",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Error types for background removal operations
///
/// Malformed background colors are deliberately absent: they fall back to the
/// default color instead of failing.
#[derive(Error, Debug)]
pub enum BgRemovalError {
    /// The input URI could not be resolved or decoded
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Platform, OS or hardware cannot run segmentation
    #[error("Background removal unsupported: {0}")]
    Unsupported(String),

    /// The segmentation model invocation failed or returned no result
    #[error("Segmentation failed: {0}")]
    SegmentationFailed(String),

    /// Encoding or writing the output file failed
    #[error("Failed to persist result: {0}")]
    PersistFailed(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BgRemovalError {
    /// Create a new invalid image error
    pub fn invalid_image<S: Into<String>>(msg: S) -> Self {
        Self::InvalidImage(msg.into())
    }

    /// Create a new unsupported environment error
    pub fn unsupported<S: Into<String>>(reason: S) -> Self {
        Self::Unsupported(reason.into())
    }

    /// Create a new segmentation error
    pub fn segmentation_failed<S: Into<String>>(msg: S) -> Self {
        Self::SegmentationFailed(msg.into())
    }

    /// Create a new persistence error
    pub fn persist_failed<S: Into<String>>(msg: S) -> Self {
        Self::PersistFailed(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Classification of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidImage(_) => ErrorKind::InvalidImage,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::SegmentationFailed(_) => ErrorKind::SegmentationFailed,
            Self::PersistFailed(_) => ErrorKind::PersistFailed,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Stable code of the error kind, e.g. `"INVALID_IMAGE"`
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Whether the environment itself cannot run segmentation.
    ///
    /// Callers use this to fall back (for example to the original image)
    /// without inspecting message text.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    // Contextual error creators

    /// Create a persistence error for a failed file operation
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        Self::PersistFailed(format!(
            "Failed to {} '{}': {}",
            operation,
            path.as_ref().display(),
            error
        ))
    }

    /// Create an invalid image error for a failed read or decode
    pub fn image_load_error(source: &str, error: &dyn std::fmt::Display) -> Self {
        Self::InvalidImage(format!("Failed to load image from '{}': {}", source, error))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Wrap an error with the pipeline stage it occurred in, keeping its kind
    #[must_use]
    pub fn at_stage(self, stage: &str) -> Self {
        let wrap = |msg: String| format!("stage '{}': {}", stage, msg);
        match self {
            Self::InvalidImage(m) => Self::InvalidImage(wrap(m)),
            Self::Unsupported(m) => Self::Unsupported(wrap(m)),
            Self::SegmentationFailed(m) => Self::SegmentationFailed(wrap(m)),
            Self::PersistFailed(m) => Self::PersistFailed(wrap(m)),
            Self::InvalidConfig(m) => Self::InvalidConfig(wrap(m)),
        }
    }
}
