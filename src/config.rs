//! Configuration types for background removal operations

use crate::{
    color::Color,
    error::{BgRemovalError, Result},
    policy::CompositingPolicy,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default prefix of output file names
pub const DEFAULT_FILE_PREFIX: &str = "bg_removed_";

/// Subdirectory of the system temp dir used when no output dir is configured
pub const DEFAULT_OUTPUT_SUBDIR: &str = "background_removal";

/// Upper bound accepted for the segmentation timeout
const MAX_TIMEOUT_MS: u64 = 10 * 60 * 1000;

/// Configuration for background removal operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalConfig {
    /// How mask scores are interpreted
    pub policy: CompositingPolicy,

    /// Background used when a call passes no color of its own.
    /// Unparseable values fall back to opaque white at call time.
    pub background_color: Option<String>,

    /// Return the input unchanged instead of failing when segmentation is unsupported
    pub fallback_to_original: bool,

    /// Directory for output files (None = `<temp>/background_removal`)
    pub output_dir: Option<PathBuf>,

    /// File name prefix for outputs; a UUID and `.png` are appended
    pub file_prefix: String,

    /// Abort segmentation after this many milliseconds (None = wait indefinitely)
    pub segmentation_timeout_ms: Option<u64>,

    /// Composite rows in parallel (needs the `parallel` feature to take effect)
    pub parallel: bool,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            policy: CompositingPolicy::default(),
            background_color: None,
            fallback_to_original: false,
            output_dir: None,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            segmentation_timeout_ms: None,
            parallel: false,
        }
    }
}

impl RemovalConfig {
    /// Create a new configuration builder for fluent API construction
    ///
    /// # Examples
    ///
    /// ```rust
    /// use maskcut::{CompositingPolicy, RemovalConfig};
    ///
    /// let config = RemovalConfig::builder()
    ///     .policy(CompositingPolicy::AlphaBlend)
    ///     .background_color("#00FF00")
    ///     .fallback_to_original(true)
    ///     .build()
    ///     .unwrap();
    /// assert!(config.fallback_to_original);
    /// ```
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::default()
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    ///
    /// # Errors
    /// - File cannot be read
    /// - Invalid JSON
    /// - Values rejected by [`RemovalConfig::validate`]
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BgRemovalError::invalid_config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Parse a configuration from JSON text
    ///
    /// # Errors
    /// - Invalid JSON
    /// - Values rejected by [`RemovalConfig::validate`]
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| BgRemovalError::invalid_config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Validation Rules
    ///
    /// - File prefix: non-empty, no path separators
    /// - Segmentation timeout: 1 ms to 10 minutes when set
    ///
    /// # Errors
    /// - Any rule above violated
    pub fn validate(&self) -> Result<()> {
        if self.file_prefix.is_empty() {
            return Err(BgRemovalError::invalid_config("File prefix must not be empty"));
        }
        if self.file_prefix.contains(['/', '\\']) || self.file_prefix.contains("..") {
            return Err(BgRemovalError::invalid_config(format!(
                "File prefix '{}' must be a plain file name fragment",
                self.file_prefix
            )));
        }
        if let Some(timeout) = self.segmentation_timeout_ms {
            if timeout == 0 || timeout > MAX_TIMEOUT_MS {
                return Err(BgRemovalError::config_value_error(
                    "segmentation timeout",
                    timeout,
                    "1-600000 ms",
                ));
            }
        }
        Ok(())
    }

    /// Directory outputs are written to
    #[must_use]
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_OUTPUT_SUBDIR))
    }

    /// Segmentation timeout as a `Duration`
    #[must_use]
    pub fn segmentation_timeout(&self) -> Option<Duration> {
        self.segmentation_timeout_ms.map(Duration::from_millis)
    }

    /// Background for one call: the call's color, else the configured one, else white
    #[must_use]
    pub fn background_for(&self, call_color: Option<&str>) -> Color {
        crate::color::parse_color(call_color.or(self.background_color.as_deref()))
    }
}

/// Builder for `RemovalConfig`
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    #[must_use]
    pub fn policy(mut self, policy: CompositingPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    #[must_use]
    pub fn background_color<S: Into<String>>(mut self, color: S) -> Self {
        self.config.background_color = Some(color.into());
        self
    }

    #[must_use]
    pub fn fallback_to_original(mut self, fallback: bool) -> Self {
        self.config.fallback_to_original = fallback;
        self
    }

    #[must_use]
    pub fn output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn file_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn segmentation_timeout(mut self, timeout: Duration) -> Self {
        self.config.segmentation_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Values rejected by [`RemovalConfig::validate`]
    pub fn build(self) -> Result<RemovalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
