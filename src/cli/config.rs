//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliPolicy};
use crate::{color::Color, config::RemovalConfig, policy::CompositingPolicy};
use anyhow::{Context, Result};

/// Convert CLI arguments to a `RemovalConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the configuration: config file values first, then flag overrides
    pub(crate) fn from_cli(cli: &Cli) -> Result<RemovalConfig> {
        let mut config = match &cli.config {
            Some(path) => RemovalConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => RemovalConfig::default(),
        };

        if let Some(policy) = Self::policy(cli, config.policy) {
            config.policy = policy;
        }
        if let Some(color) = &cli.background_color {
            config.background_color = Some(color.clone());
        }
        if let Some(dir) = &cli.output_dir {
            config.output_dir = Some(dir.clone());
        }
        config.fallback_to_original |= cli.fallback;
        config.parallel |= cli.parallel;

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Policy requested on the command line, if any. A bare `--cutoff`
    /// implies the threshold policy.
    fn policy(cli: &Cli, current: CompositingPolicy) -> Option<CompositingPolicy> {
        match (cli.policy, cli.cutoff) {
            (Some(CliPolicy::Blend), _) => Some(CompositingPolicy::AlphaBlend),
            (Some(CliPolicy::Threshold) | None, Some(cutoff)) => {
                Some(CompositingPolicy::HardThreshold { cutoff })
            },
            (Some(CliPolicy::Threshold), None) => match current {
                CompositingPolicy::HardThreshold { .. } => Some(current),
                CompositingPolicy::AlphaBlend => Some(CompositingPolicy::threshold()),
            },
            (None, None) => None,
        }
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.policy == Some(CliPolicy::Blend) && cli.cutoff.is_some() {
            anyhow::bail!("--cutoff only applies to the threshold policy");
        }
        // The library tolerates bad colors; on the command line a typo is more likely a mistake
        if let Some(color) = &cli.background_color {
            color
                .parse::<Color>()
                .context("Invalid --background-color")?;
        }
        Ok(())
    }
}
