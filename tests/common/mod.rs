//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bgremove_studio::{
    Blob, FileDescriptor, FileSource, LoadedImage, ProgressCallback, ProgressReporter,
    ProgressUpdate, RemovalBackend, RemovalConfig, Result, StudioError,
};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;

/// What one scripted backend call does
#[derive(Clone, Default)]
pub struct Script {
    pub ticks: Vec<(u64, u64)>,
    pub gate: Option<Arc<Notify>>,
    pub late_ticks: Vec<(u64, u64)>,
    pub failure: Option<String>,
    pub output: Option<Vec<u8>>,
}

impl Script {
    pub fn output(bytes: &[u8]) -> Self {
        Self {
            output: Some(bytes.to_vec()),
            ..Self::default()
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn ticks(mut self, ticks: &[(u64, u64)]) -> Self {
        self.ticks = ticks.to_vec();
        self
    }

    pub fn late_ticks(mut self, ticks: &[(u64, u64)]) -> Self {
        self.late_ticks = ticks.to_vec();
        self
    }

    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }
}

/// Backend that ignores cancellation and plays back scripts in call order.
/// It echoes the input bytes when a script has no explicit output.
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    started: watch::Sender<usize>,
}

impl ScriptedBackend {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            started: watch::Sender::new(0),
        })
    }

    pub fn started(&self) -> usize {
        *self.started.borrow()
    }

    pub async fn wait_started(&self, count: usize) {
        let mut rx = self.started.subscribe();
        rx.wait_for(|started| *started >= count).await.unwrap();
    }
}

#[async_trait]
impl RemovalBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn remove_background(
        &self,
        image: &LoadedImage,
        config: &RemovalConfig,
        progress: &dyn ProgressCallback,
        _cancel: &CancellationToken,
    ) -> Result<Blob> {
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();

        for (current, total) in &script.ticks {
            progress.on_progress("compute:inference", *current, *total);
        }
        self.started.send_modify(|started| *started += 1);
        if let Some(gate) = &script.gate {
            gate.notified().await;
        }
        for (current, total) in &script.late_ticks {
            progress.on_progress("compute:inference", *current, *total);
        }

        match script.failure {
            Some(message) => Err(StudioError::processing(message)),
            None => Ok(Blob::new(
                config.output_format.mime_type(),
                script.output.unwrap_or_else(|| image.bytes().to_vec()),
            )),
        }
    }
}

/// Source whose read always fails
pub struct UnreadableSource {
    pub descriptor: FileDescriptor,
}

impl UnreadableSource {
    pub fn new(name: &str, mime: &str, size: u64) -> Self {
        Self {
            descriptor: FileDescriptor::new(name, mime, size),
        }
    }
}

#[async_trait]
impl FileSource for UnreadableSource {
    fn descriptor(&self) -> FileDescriptor {
        self.descriptor.clone()
    }

    async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "permission denied",
        ))
    }
}

/// Reporter that keeps every update
#[derive(Default)]
pub struct RecordingReporter {
    pub updates: Mutex<Vec<ProgressUpdate>>,
    pub completions: Mutex<usize>,
    pub errors: Mutex<Vec<String>>,
    pub cancellations: Mutex<usize>,
}

impl RecordingReporter {
    pub fn percents(&self) -> Vec<u8> {
        self.updates.lock().unwrap().iter().map(|u| u.progress).collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        self.updates.lock().unwrap().push(update);
    }

    fn report_completion(&self, _elapsed_ms: u64) {
        *self.completions.lock().unwrap() += 1;
    }

    fn report_error(&self, error: &str) {
        self.errors.lock().unwrap().push(error.to_string());
    }

    fn report_cancelled(&self) {
        *self.cancellations.lock().unwrap() += 1;
    }
}

/// A `width`x`height` PNG with a light backdrop and a dark square in the middle
pub fn product_png(width: u32, height: u32) -> Vec<u8> {
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([245, 245, 245, 255]));
    for y in height / 3..height * 2 / 3 {
        for x in width / 3..width * 2 / 3 {
            canvas.put_pixel(x, y, Rgba([30, 60, 120, 255]));
        }
    }
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(canvas.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    bytes
}
