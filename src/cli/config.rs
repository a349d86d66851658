//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliOutputFormat};
use crate::config::{ModelVariant, OutputFormat, StudioConfig};
use anyhow::{Context, Result};

/// Convert CLI arguments to a validated `StudioConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Start from `--config` (or defaults) and apply the flags on top
    pub(crate) fn from_cli(cli: &Cli) -> Result<StudioConfig> {
        let mut config = match &cli.config {
            Some(path) => StudioConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => StudioConfig::default(),
        };

        if let Some(format) = cli.format {
            config.removal.output_format = Self::output_format(format);
        }
        if let Some(quality) = cli.quality {
            config.removal.quality = quality;
        }
        if let Some(model) = &cli.model {
            config.removal.model = model
                .parse::<ModelVariant>()
                .context("Invalid model variant")?;
        }
        if let Some(max_size) = cli.max_size {
            config.max_file_size_bytes = max_size;
        }
        config.removal.debug = config.removal.debug || cli.verbose >= 2;

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    pub(crate) fn output_format(format: CliOutputFormat) -> OutputFormat {
        match format {
            CliOutputFormat::Png => OutputFormat::Png,
            CliOutputFormat::Jpeg => OutputFormat::Jpeg,
            CliOutputFormat::Webp => OutputFormat::WebP,
        }
    }
}
