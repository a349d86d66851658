//! Configuration types for the upload pipeline

use crate::error::{Result, StudioError};
use crate::types::ImageKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 5 MiB, the largest upload the pipeline accepts by default
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Lowest percentage shown while a job is running
pub const DEFAULT_MIN_VISIBLE_PROGRESS: u8 = 4;

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// JPEG (no transparency, alpha is dropped)
    Jpeg,
    /// Lossless WebP with alpha channel transparency
    #[serde(rename = "webp")]
    WebP,
}

impl OutputFormat {
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    #[must_use]
    pub fn supports_transparency(self) -> bool {
        !matches!(self, Self::Jpeg)
    }
}

/// Model presets understood by the removal backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// Full precision model
    Isnet,
    /// Half precision model
    IsnetFp16,
    /// Quantized lightweight model
    #[default]
    IsnetQuint8,
}

impl ModelVariant {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Isnet => "isnet",
            Self::IsnetFp16 => "isnet_fp16",
            Self::IsnetQuint8 => "isnet_quint8",
        }
    }
}

impl std::fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelVariant {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isnet" => Ok(Self::Isnet),
            "isnet_fp16" | "fp16" => Ok(Self::IsnetFp16),
            "isnet_quint8" | "quint8" | "small" => Ok(Self::IsnetQuint8),
            other => Err(StudioError::invalid_config(format!(
                "Unknown model variant '{}'. Expected isnet, isnet_fp16 or isnet_quint8",
                other
            ))),
        }
    }
}

/// Configuration handed to the removal backend on every invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalConfig {
    /// Output format
    pub output_format: OutputFormat,

    /// Encoder quality in 0.0..=1.0 (only lossy formats use it)
    pub quality: f32,

    /// Model preset
    pub model: ModelVariant,

    /// Enable debug mode (additional backend logging)
    pub debug: bool,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Png,
            quality: 0.8,
            model: ModelVariant::IsnetQuint8,
            debug: false,
        }
    }
}

impl RemovalConfig {
    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Quality outside 0.0..=1.0 or not a number
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(StudioError::config_value_error(
                "quality",
                self.quality,
                "0.0-1.0",
                Some(0.8),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration for an upload pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Largest accepted upload in bytes
    pub max_file_size_bytes: u64,

    /// Declared image types the validator accepts
    pub accepted_kinds: Vec<ImageKind>,

    /// Floor for the displayed percentage while a job runs
    pub min_visible_progress: u8,

    /// Backend configuration
    pub removal: RemovalConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            accepted_kinds: ImageKind::ALL.to_vec(),
            min_visible_progress: DEFAULT_MIN_VISIBLE_PROGRESS,
            removal: RemovalConfig::default(),
        }
    }
}

impl StudioConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bgremove_studio::{ModelVariant, StudioConfig};
    ///
    /// let config = StudioConfig::builder()
    ///     .model(ModelVariant::IsnetFp16)
    ///     .quality(0.9)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.removal.model, ModelVariant::IsnetFp16);
    /// ```
    #[must_use]
    pub fn builder() -> StudioConfigBuilder {
        StudioConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Zero size limit
    /// - Empty accepted type list
    /// - Minimum visible progress above 100
    /// - Invalid removal configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_file_size_bytes == 0 {
            return Err(StudioError::invalid_config(
                "max_file_size_bytes must be greater than zero",
            ));
        }

        if self.accepted_kinds.is_empty() {
            return Err(StudioError::invalid_config(
                "accepted_kinds must list at least one image type",
            ));
        }

        if self.min_visible_progress > 100 {
            return Err(StudioError::config_value_error(
                "min_visible_progress",
                self.min_visible_progress,
                "0-100",
                Some(DEFAULT_MIN_VISIBLE_PROGRESS),
            ));
        }

        self.removal.validate()
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    ///
    /// # Errors
    /// - Malformed JSON
    /// - Validation failures
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StudioError::invalid_config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    ///
    /// # Errors
    /// - File cannot be read
    /// - Malformed JSON or validation failures
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| StudioError::file_io_error("read config file", path, &e))?;
        Self::from_json_str(&content)
    }
}

/// Builder for `StudioConfig`
#[derive(Debug, Default)]
pub struct StudioConfigBuilder {
    config: StudioConfig,
}

impl StudioConfigBuilder {
    #[must_use]
    pub fn max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_size_bytes = bytes;
        self
    }

    #[must_use]
    pub fn accepted_kinds(mut self, kinds: Vec<ImageKind>) -> Self {
        self.config.accepted_kinds = kinds;
        self
    }

    #[must_use]
    pub fn min_visible_progress(mut self, percent: u8) -> Self {
        self.config.min_visible_progress = percent.min(100);
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.removal.output_format = format;
        self
    }

    /// Set encoder quality, clamped to 0.0..=1.0
    #[must_use]
    pub fn quality(mut self, quality: f32) -> Self {
        self.config.removal.quality = if quality.is_nan() {
            quality
        } else {
            quality.clamp(0.0, 1.0)
        };
        self
    }

    #[must_use]
    pub fn model(mut self, model: ModelVariant) -> Self {
        self.config.removal.model = model;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.removal.debug = debug;
        self
    }

    #[must_use]
    pub fn removal(mut self, removal: RemovalConfig) -> Self {
        self.config.removal = removal;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Any validation failure from [`StudioConfig::validate`]
    pub fn build(self) -> Result<StudioConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_upload_policy() {
        let config = StudioConfig::default();
        assert_eq!(config.max_file_size_bytes, 5_242_880);
        assert_eq!(config.accepted_kinds, vec![ImageKind::Png, ImageKind::Jpeg, ImageKind::WebP]);
        assert_eq!(config.min_visible_progress, 4);
        assert_eq!(config.removal.output_format, OutputFormat::Png);
        assert!((config.removal.quality - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.removal.model, ModelVariant::IsnetQuint8);
        assert!(!config.removal.debug);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_clamps_quality() {
        let config = StudioConfig::builder().quality(3.0).build().unwrap();
        assert!((config.removal.quality - 1.0).abs() < f32::EPSILON);

        let config = StudioConfig::builder().min_visible_progress(250).build().unwrap();
        assert_eq!(config.min_visible_progress, 100);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = StudioConfig::default();
        config.removal.quality = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quality"));
        assert!(err.to_string().contains("0.0-1.0"));

        let config = StudioConfig {
            max_file_size_bytes: 0,
            ..StudioConfig::default()
        };
        assert!(config.validate().is_err());

        let config = StudioConfig {
            accepted_kinds: vec![],
            ..StudioConfig::default()
        };
        assert!(config.validate().is_err());

        assert!(StudioConfig::builder().quality(f32::NAN).build().is_err());
    }

    #[test]
    fn test_json_partial_config() {
        let config = StudioConfig::from_json_str(
            r#"{ "max_file_size_bytes": 1024, "removal": { "model": "isnet_fp16", "output_format": "webp" } }"#,
        )
        .unwrap();
        assert_eq!(config.max_file_size_bytes, 1024);
        assert_eq!(config.removal.model, ModelVariant::IsnetFp16);
        assert_eq!(config.removal.output_format, OutputFormat::WebP);
        assert!((config.removal.quality - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.min_visible_progress, 4);
    }

    #[test]
    fn test_json_rejects_garbage() {
        let err = StudioConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, StudioError::InvalidConfig(_)));
    }

    #[test]
    fn test_model_variant_parsing() {
        assert_eq!("isnet".parse::<ModelVariant>().unwrap(), ModelVariant::Isnet);
        assert_eq!("FP16".parse::<ModelVariant>().unwrap(), ModelVariant::IsnetFp16);
        assert_eq!("small".parse::<ModelVariant>().unwrap(), ModelVariant::IsnetQuint8);
        assert!("birefnet".parse::<ModelVariant>().is_err());
        assert_eq!(ModelVariant::IsnetQuint8.to_string(), "isnet_quint8");
    }

    #[test]
    fn test_output_format_naming() {
        assert_eq!(OutputFormat::Png.extension(), "png");
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::WebP.mime_type(), "image/webp");
        assert!(!OutputFormat::Jpeg.supports_transparency());
    }
}
