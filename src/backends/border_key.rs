//! Border-key backend
//!
//! A lightweight pure Rust stand-in for the segmentation model. The
//! background colour is estimated from the image border and every pixel's
//! alpha is derived from its colour distance to that estimate, with a soft
//! ramp between two tolerances. Works well for product shots and scans on
//! plain backdrops; photographs with busy backgrounds need a real model.

use crate::{
    config::{ModelVariant, OutputFormat, RemovalConfig},
    error::{Result, StudioError},
    inference::RemovalBackend,
    services::progress::ProgressCallback,
    types::{Blob, LoadedImage},
};
use async_trait::async_trait;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use std::io::Cursor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const DEFAULT_BAND_ROWS: u32 = 64;

/// Backend that keys out the dominant border colour
#[derive(Debug, Clone)]
pub struct BorderKeyBackend {
    band_rows: u32,
}

impl BorderKeyBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            band_rows: DEFAULT_BAND_ROWS,
        }
    }

    /// Rows processed between progress reports and cancellation checks
    #[must_use]
    pub fn with_band_rows(mut self, rows: u32) -> Self {
        self.band_rows = rows.max(1);
        self
    }

    /// Colour distance below which a pixel is background, and above which it is foreground
    #[must_use]
    pub fn tolerances(model: ModelVariant) -> (f32, f32) {
        match model {
            ModelVariant::Isnet => (24.0, 64.0),
            ModelVariant::IsnetFp16 => (28.0, 72.0),
            ModelVariant::IsnetQuint8 => (32.0, 80.0),
        }
    }
}

impl Default for BorderKeyBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemovalBackend for BorderKeyBackend {
    fn name(&self) -> &str {
        "border-key"
    }

    #[instrument(skip_all, fields(model = %config.model, bytes = image.len()))]
    async fn remove_background(
        &self,
        image: &LoadedImage,
        config: &RemovalConfig,
        progress: &dyn ProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<Blob> {
        progress.on_progress("compute:decode", 0, 1);
        let decoded = image::load_from_memory(image.bytes())
            .map_err(|e| StudioError::processing(format!("Failed to decode image: {}", e)))?;
        let mut rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(StudioError::processing("Image has no pixels"));
        }
        progress.on_progress("compute:decode", 1, 1);

        let background = estimate_background(&rgba);
        let (low, high) = Self::tolerances(config.model);
        if config.debug {
            debug!(?background, low, high, width, height, "Estimated background colour");
        }

        let mut row = 0;
        while row < height {
            if cancel.is_cancelled() {
                return Err(StudioError::Cancelled);
            }
            let end = row.saturating_add(self.band_rows).min(height);
            key_rows(&mut rgba, background, low, high, row, end);
            progress.on_progress("compute:mask", u64::from(end), u64::from(height));
            row = end;
            tokio::task::yield_now().await;
        }

        if cancel.is_cancelled() {
            return Err(StudioError::Cancelled);
        }

        progress.on_progress("compute:encode", 0, 1);
        let bytes = encode(&rgba, config.output_format, config.quality)?;
        progress.on_progress("compute:encode", 1, 1);

        Ok(Blob::new(config.output_format.mime_type(), bytes))
    }
}

/// Per-channel median of the outermost pixel ring
fn estimate_background(image: &RgbaImage) -> [f32; 3] {
    let (width, height) = image.dimensions();
    let mut channels: [Vec<u8>; 3] = [Vec::new(), Vec::new(), Vec::new()];

    let mut push = |x: u32, y: u32| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        for (channel, value) in channels.iter_mut().zip([r, g, b]) {
            channel.push(value);
        }
    };

    for x in 0..width {
        push(x, 0);
        push(x, height - 1);
    }
    for y in 1..height.saturating_sub(1) {
        push(0, y);
        push(width - 1, y);
    }

    channels.map(|mut values| {
        values.sort_unstable();
        values.get(values.len() / 2).copied().map_or(0.0, f32::from)
    })
}

fn key_rows(image: &mut RgbaImage, background: [f32; 3], low: f32, high: f32, start: u32, end: u32) {
    let width = image.width();
    for y in start..end {
        for x in 0..width {
            let pixel = image.get_pixel_mut(x, y);
            let [r, g, b, a] = pixel.0;
            let mask = mask_value(distance([r, g, b], background), low, high);
            let alpha = (u16::from(a) * u16::from(mask) / 255) as u8;
            pixel.0 = if alpha == 0 { [0, 0, 0, 0] } else { [r, g, b, alpha] };
        }
    }
}

fn distance(rgb: [u8; 3], background: [f32; 3]) -> f32 {
    rgb.iter()
        .zip(background)
        .map(|(&c, bg)| {
            let d = f32::from(c) - bg;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Smoothstep ramp from 0 at `low` to 255 at `high`
fn mask_value(distance: f32, low: f32, high: f32) -> u8 {
    if distance <= low {
        0
    } else if distance >= high {
        255
    } else {
        let t = (distance - low) / (high - low);
        (t * t * (3.0 - 2.0 * t) * 255.0).round() as u8
    }
}

/// Composite keyed pixels over white for formats without an alpha channel
fn flatten_onto_white(image: &RgbaImage) -> RgbaImage {
    let mut flat = image.clone();
    for pixel in flat.pixels_mut() {
        let alpha = u32::from(pixel.0[3]);
        for channel in &mut pixel.0[..3] {
            *channel = ((u32::from(*channel) * alpha + 255 * (255 - alpha)) / 255) as u8;
        }
        pixel.0[3] = 255;
    }
    flat
}

fn encode(image: &RgbaImage, format: OutputFormat, quality: f32) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    let (width, height) = image.dimensions();

    let flattened;
    let image = if format.supports_transparency() {
        image
    } else {
        flattened = flatten_onto_white(image);
        &flattened
    };

    let result = match format {
        OutputFormat::Png => image::codecs::png::PngEncoder::new(&mut cursor).write_image(
            image.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        OutputFormat::Jpeg => {
            let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality)
                .encode_image(&rgb)
        },
        #[cfg(feature = "webp-support")]
        OutputFormat::WebP => image::codecs::webp::WebPEncoder::new_lossless(&mut cursor)
            .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8),
        #[cfg(not(feature = "webp-support"))]
        OutputFormat::WebP => {
            return Err(StudioError::processing(
                "WebP output requires the webp-support feature",
            ));
        },
    };

    result.map_err(|e| {
        StudioError::processing(format!(
            "Failed to encode {} output: {}",
            format.extension(),
            e
        ))
    })?;
    Ok(buffer)
}
