//! Compositing policies
//!
//! The two platform behaviours (binary cut-out and soft matte) are variants of
//! one policy type driving a single pixel loop.

use crate::error::BgRemovalError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default cutoff for [`CompositingPolicy::HardThreshold`]
pub const DEFAULT_CUTOFF: u8 = 128;

/// How mask scores are turned into foreground/background weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CompositingPolicy {
    /// Foreground iff `score * 255` is strictly greater than `cutoff`
    HardThreshold {
        #[serde(default = "default_cutoff")]
        cutoff: u8,
    },
    /// Linear interpolation weighted by the score
    AlphaBlend,
}

fn default_cutoff() -> u8 {
    DEFAULT_CUTOFF
}

impl Default for CompositingPolicy {
    fn default() -> Self {
        Self::HardThreshold {
            cutoff: DEFAULT_CUTOFF,
        }
    }
}

impl CompositingPolicy {
    /// Hard threshold with the default cutoff
    #[must_use]
    pub fn threshold() -> Self {
        Self::default()
    }

    /// Foreground weight in `[0, 1]` for a canonical score
    #[must_use]
    #[inline]
    pub fn weight(self, score: f32) -> f32 {
        match self {
            // Same division as u8 ingestion, so `v / 255 > c / 255` iff `v > c`
            Self::HardThreshold { cutoff } => {
                if score > f32::from(cutoff) / 255.0 {
                    1.0
                } else {
                    0.0
                }
            },
            Self::AlphaBlend => {
                if score.is_nan() {
                    0.0
                } else {
                    score.clamp(0.0, 1.0)
                }
            },
        }
    }

    /// Short name used in logs and on the command line
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::HardThreshold { .. } => "threshold",
            Self::AlphaBlend => "blend",
        }
    }
}

impl std::fmt::Display for CompositingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HardThreshold { cutoff } => write!(f, "threshold:{}", cutoff),
            Self::AlphaBlend => f.write_str("blend"),
        }
    }
}

impl FromStr for CompositingPolicy {
    type Err = BgRemovalError;

    /// Accepts `threshold`, `threshold:<0-255>` and `blend`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (mode, arg) = match s.split_once(':') {
            Some((mode, arg)) => (mode, Some(arg)),
            None => (s.as_str(), None),
        };

        match (mode, arg) {
            ("threshold" | "hard", None) => Ok(Self::threshold()),
            ("threshold" | "hard", Some(arg)) => arg
                .parse::<u8>()
                .map(|cutoff| Self::HardThreshold { cutoff })
                .map_err(|_| BgRemovalError::config_value_error("threshold cutoff", arg, "0-255")),
            ("blend" | "alpha", None) => Ok(Self::AlphaBlend),
            _ => Err(BgRemovalError::invalid_config(format!(
                "Unknown compositing policy '{}'. Use threshold, threshold:<cutoff> or blend",
                s
            ))),
        }
    }
}
