//! Processor adapter
//!
//! Wraps a [`RemovalBackend`] call for one submission. The adapter owns the
//! progress meter for the job, drops ticks and results that arrive after the
//! submission's token fired, and folds every backend outcome into exactly one
//! [`AdapterOutcome`].

use crate::{
    config::RemovalConfig,
    error::StudioError,
    inference::RemovalBackend,
    services::progress::{
        NoOpProgressReporter, ProgressCallback, ProgressMeter, ProgressReporter, ProgressUpdate,
    },
    tracing_config::spans,
    types::{Blob, LoadedImage},
};
use instant::Instant;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn, Instrument};

/// The single result of one adapter run
#[derive(Debug)]
pub enum AdapterOutcome {
    /// The backend produced a blob and the submission is still live
    Produced(Blob),
    /// The backend failed; always a `ProcessingFailure`
    Failed(StudioError),
    /// The token fired before, during or after the backend call
    Cancelled,
}

/// Invokes the removal backend on behalf of the pipeline
pub struct ProcessorAdapter {
    backend: Arc<dyn RemovalBackend>,
    config: RemovalConfig,
    reporter: Arc<dyn ProgressReporter>,
    min_visible_progress: u8,
}

impl ProcessorAdapter {
    #[must_use]
    pub fn new(backend: Arc<dyn RemovalBackend>, config: RemovalConfig, min_visible_progress: u8) -> Self {
        Self {
            backend,
            config,
            reporter: Arc::new(NoOpProgressReporter),
            min_visible_progress,
        }
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.set_reporter(reporter);
        self
    }

    pub fn set_reporter(&mut self, reporter: Arc<dyn ProgressReporter>) {
        self.reporter = reporter;
    }

    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run the backend on `image`.
    ///
    /// `on_percent` receives the display percentage, starting at the minimum
    /// visible value, and is never called once `token` has fired.
    pub async fn run<F>(&self, image: &LoadedImage, token: &CancellationToken, on_percent: F) -> AdapterOutcome
    where
        F: Fn(u8) + Send + Sync,
    {
        if token.is_cancelled() {
            debug!("Token fired before processing started, backend not invoked");
            self.reporter.report_cancelled();
            return AdapterOutcome::Cancelled;
        }

        let started = Instant::now();
        let mut meter = ProgressMeter::new(self.min_visible_progress);
        on_percent(meter.start());

        let relay = Relay {
            meter: Mutex::new(meter),
            token,
            on_percent: &on_percent,
            reporter: self.reporter.as_ref(),
            started,
        };

        let span = spans::processing(self.backend.name(), self.config.model.as_str());
        let result = self
            .backend
            .remove_background(image, &self.config, &relay, token)
            .instrument(span)
            .await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if token.is_cancelled() {
            if result.is_ok() {
                debug!(elapsed_ms, "Discarding result of a cancelled submission");
            }
            self.reporter.report_cancelled();
            return AdapterOutcome::Cancelled;
        }

        match result {
            Ok(blob) => {
                info!(elapsed_ms, bytes = blob.len(), mime = %blob.mime_type, "Background removed");
                self.reporter.report_completion(elapsed_ms);
                AdapterOutcome::Produced(blob)
            },
            Err(StudioError::Cancelled) => {
                // Backend gave up on its own; treat it like any other cancel
                self.reporter.report_cancelled();
                AdapterOutcome::Cancelled
            },
            Err(e) => {
                let error = match e {
                    StudioError::ProcessingFailure(_) => e,
                    other => StudioError::processing(other.to_string()),
                };
                warn!(elapsed_ms, error = %error, "Background removal failed");
                self.reporter.report_error(&error.to_string());
                AdapterOutcome::Failed(error)
            },
        }
    }
}

/// Progress callback handed to the backend for one run
struct Relay<'a, F> {
    meter: Mutex<ProgressMeter>,
    token: &'a CancellationToken,
    on_percent: &'a F,
    reporter: &'a dyn ProgressReporter,
    started: Instant,
}

impl<F> ProgressCallback for Relay<'_, F>
where
    F: Fn(u8) + Send + Sync,
{
    fn on_progress(&self, stage: &str, current: u64, total: u64) {
        if self.token.is_cancelled() {
            trace!(stage, current, total, "Dropping progress tick after cancellation");
            return;
        }
        let percent = self
            .meter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(current, total);
        (self.on_percent)(percent);
        self.reporter
            .report_progress(ProgressUpdate::new(stage, percent, self.started));
    }
}
